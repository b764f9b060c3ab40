/// 检测系统 (Detection System)
///
/// 计数引擎只需要每帧的跟踪结果 (track_id + 框)
/// - Detector:  检测适配器接口 (帧 → 跟踪对象)
/// - BoxSource: 原始检测框来源 (无ID), 配合 ByteTrack 使用
/// - MotReplay: 回放 MOT 格式的离线跟踪结果
/// - ByteTrackDetector: 检测框 + ByteTrack 跟踪
pub mod bytetrack;
pub mod mot;
pub mod tracker;
pub mod types;

pub use bytetrack::{ByteTrackConfig, ByteTrackDetector, ByteTracker};
pub use mot::{MotReplay, MotWriter};
pub use types::{BBox, Tlwh, TrackedObject};

use crate::error::AdapterError;
use crate::input::Frame;
use crate::region::RegionConfig;

/// 检测适配器
///
/// 不得持有帧; 出错时必须返回错误, 不能用空结果代替
pub trait Detector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        region: &RegionConfig,
    ) -> Result<Vec<TrackedObject>, AdapterError>;

    fn name(&self) -> String;
}

/// 原始检测框来源 (外部检测器)
pub trait BoxSource: Send {
    fn boxes(&mut self, frame: &Frame) -> Result<Vec<BBox>, AdapterError>;

    fn name(&self) -> String;
}
