//! # Proximity
//!
//! 交通控制 agent 邻近解析引擎。
//!
//! 负责：
//! - 单类 agent 的 3D 空间索引 (rstar R-tree)
//! - agent 组成变化时重建索引并整体替换快照
//! - 半径过滤、朝向门控与滞回，选出当前生效的红绿灯 / 限速牌
//!
//! ## 使用示例
//!
//! ```ignore
//! use proximity::{ProximityResolver, ResolverMemory};
//!
//! let mut resolver = ProximityResolver::new(blueprint.proximity.clone());
//! let mut memory = ResolverMemory::default();
//!
//! // once per tick and kind
//! let light = resolver.resolve(AgentKind::TrafficLight, &agents, &pose, &mut memory);
//! ```

mod error;
mod index;
mod resolver;
mod tracker;

pub use error::ProximityError;
pub use index::SpatialIndex;
pub use resolver::{
    clear_reading, is_valid_orientation, unobserved_reading, ProximityResolver, ResolverMemory,
};
pub use tracker::AgentTracker;
