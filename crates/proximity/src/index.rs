//! SpatialIndex - 单类 agent 的 3D 最近邻索引
//!
//! 构建后只读；agent 组成变化时整体重建 (见 [`crate::AgentTracker`])。

use std::fmt;

use contracts::{AgentId, Location};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::ProximityError;

/// R-tree 条目：3D 点 + 在 id 列表中的槽位
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    point: [f64; 3],
    slot: usize,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexEntry {
    /// Squared Euclidean distance
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        let dz = self.point[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Read-only nearest-neighbour index over one agent kind
pub struct SpatialIndex {
    inner: Inner,
}

/// `Populated` keeps the R-tree and a parallel id list; every tree entry
/// stores its slot in `ids`, so both always have the same length.
enum Inner {
    /// Built from an empty point set
    Empty,
    Populated {
        tree: RTree<IndexEntry>,
        ids: Vec<AgentId>,
    },
}

impl SpatialIndex {
    /// Build an index from `(id, location)` pairs
    ///
    /// Empty input yields the empty variant, not an error.
    pub fn build(points: impl IntoIterator<Item = (AgentId, Location)>) -> Self {
        let mut ids = Vec::new();
        let mut entries = Vec::new();
        for (slot, (id, location)) in points.into_iter().enumerate() {
            ids.push(id);
            entries.push(IndexEntry {
                point: location.to_array(),
                slot,
            });
        }

        let inner = if ids.is_empty() {
            Inner::Empty
        } else {
            Inner::Populated {
                tree: RTree::bulk_load(entries),
                ids,
            }
        };
        Self { inner }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.inner, Inner::Empty)
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        match &self.inner {
            Inner::Empty => 0,
            Inner::Populated { ids, .. } => ids.len(),
        }
    }

    /// Ids of every point with `distance <= radius`, in tree order
    pub fn query_radius(&self, point: &Location, radius: f64) -> Vec<AgentId> {
        match &self.inner {
            Inner::Empty => Vec::new(),
            Inner::Populated { tree, ids } => tree
                .locate_within_distance(point.to_array(), radius * radius)
                .map(|entry| ids[entry.slot])
                .collect(),
        }
    }

    /// Nearest point and its distance
    ///
    /// # Errors
    /// [`ProximityError::EmptyIndex`] on the empty variant; check
    /// [`SpatialIndex::is_empty`] first.
    pub fn query_nearest(&self, point: &Location) -> Result<(AgentId, f64), ProximityError> {
        match &self.inner {
            Inner::Empty => Err(ProximityError::EmptyIndex),
            Inner::Populated { tree, ids } => {
                let query = point.to_array();
                tree.nearest_neighbor(&query)
                    .map(|entry| (ids[entry.slot], entry.distance_2(&query).sqrt()))
                    .ok_or(ProximityError::EmptyIndex)
            }
        }
    }
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("SpatialIndex::Empty"),
            Inner::Populated { ids, .. } => f
                .debug_struct("SpatialIndex::Populated")
                .field("len", &ids.len())
                .finish(),
        }
    }
}
