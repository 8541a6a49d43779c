//! AgentTracker - 按 agent 组成变化重建 SpatialIndex
//!
//! 每类 agent 一个 tracker。组成 (id + 坐标) 不变时复用上一个索引；
//! 变化时构建新的 `Arc<SpatialIndex>` 并整体替换，已持有旧快照的查询不受影响。

use std::sync::Arc;

use contracts::{Agent, AgentId, AgentKind};
use tracing::debug;

use crate::SpatialIndex;

/// Composition of one kind's agent set, in report order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Fingerprint(Vec<(AgentId, [u64; 3])>);

impl Fingerprint {
    fn of<'a>(agents: impl Iterator<Item = &'a Agent>) -> Self {
        Self(
            agents
                .map(|a| {
                    let l = a.location;
                    (a.id, [l.x.to_bits(), l.y.to_bits(), l.z.to_bits()])
                })
                .collect(),
        )
    }
}

/// Rebuild-on-change owner of one kind's [`SpatialIndex`]
#[derive(Debug)]
pub struct AgentTracker {
    kind: AgentKind,
    fingerprint: Option<Fingerprint>,
    index: Option<Arc<SpatialIndex>>,
    rebuilds: u64,
}

impl AgentTracker {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            fingerprint: None,
            index: None,
            rebuilds: 0,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Feed this tick's agents (all kinds; others are ignored)
    ///
    /// Returns `true` when the index was rebuilt.
    pub fn observe(&mut self, agents: &[Agent]) -> bool {
        let of_kind = || agents.iter().filter(|a| a.kind() == self.kind);
        let fingerprint = Fingerprint::of(of_kind());

        if self.fingerprint.as_ref() == Some(&fingerprint) {
            return false;
        }

        let index = SpatialIndex::build(of_kind().map(|a| (a.id, a.location)));
        debug!(
            kind = self.kind.as_str(),
            agents = index.len(),
            "Rebuilding spatial index"
        );
        observability::record_index_rebuild(self.kind, index.len());

        self.index = Some(Arc::new(index));
        self.fingerprint = Some(fingerprint);
        self.rebuilds += 1;
        true
    }

    /// Current index snapshot; `None` before the first observation
    pub fn snapshot(&self) -> Option<Arc<SpatialIndex>> {
        self.index.clone()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Forget the current index (next `observe` always rebuilds)
    pub fn clear(&mut self) {
        self.fingerprint = None;
        self.index = None;
    }
}
