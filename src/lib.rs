// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 命令行参数
pub mod counting; // 出入口计数引擎
pub mod detection; // 检测适配器与跟踪
pub mod error; // 错误类型
pub mod input; // 视频输入系统
pub mod pipeline; // 双线程流水线
pub mod region; // 门线配置
pub mod renderer; // 渲染与输出
pub mod utils; // 工具函数

pub use crate::counting::{CounterSettings, CountingState, Direction, EntranceCounter};
pub use crate::detection::{Detector, TrackedObject};
pub use crate::error::{AdapterError, CaptureError, ConfigError, PipelineError, SinkError};
pub use crate::input::{Frame, FrameSlot, FrameSource, SourceSpec};
pub use crate::pipeline::{ExitReason, Pipeline, PipelineParts, PipelineState, RunSummary};
pub use crate::region::{RegionConfig, RegionStore, RegionType};
pub use crate::utils::gen_time_string;
