//! # Controller
//!
//! 每个仿真 tick 调用一次 [`FrameLoop::tick`]：
//! - 处理录制命令与自动开始
//! - 推进 [`EpisodeClock`]，按需开启新 episode
//! - 解析当前生效的红绿灯与限速
//! - 可选的驾驶模型混合
//! - `Recording` 状态下缓存帧，达到帧上限时异步写盘
//!
//! [`MockWorld`] 提供无需仿真器的脚本化道路，供 CLI 与测试使用。
//!
//! # Example
//!
//! ```no_run
//! use controller::{FrameLoop, MockWorld, MockWorldConfig};
//! use contracts::RecorderBlueprint;
//!
//! # async fn run() -> Result<(), controller::ControllerError> {
//! let blueprint = RecorderBlueprint::default();
//! let mut world = MockWorld::new(MockWorldConfig::default());
//! let mut frame_loop = FrameLoop::new(&blueprint)?;
//!
//! let out = frame_loop.tick(world.frame_context())?;
//! world.apply(&out.control);
//! frame_loop.finish().await?;
//! # Ok(())
//! # }
//! ```

mod clock;
mod context;
mod error;
mod frame_loop;
mod mock;
mod policy;

pub use clock::{EpisodeClock, EPISODE_TIMESTAMP_FORMAT};
pub use context::{FrameContext, TickOutput};
pub use error::ControllerError;
pub use frame_loop::FrameLoop;
pub use mock::{MockWorld, MockWorldConfig};
pub use policy::{blend_control, RuleBasedPolicy};
