/// 检测/跟踪数据结构定义
/// Data structures shared by detectors, trackers and the counter

/// 检测框 (Detection bounding box), 左上/右下角坐标
#[derive(Clone, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    pub fn from_tlwh(tlwh: Tlwh, confidence: f32, class_id: u32) -> Self {
        Self {
            x1: tlwh.left,
            y1: tlwh.top,
            x2: tlwh.left + tlwh.width,
            y2: tlwh.top + tlwh.height,
            confidence,
            class_id,
        }
    }

    pub fn tlwh(&self) -> Tlwh {
        Tlwh {
            left: self.x1,
            top: self.y1,
            width: self.x2 - self.x1,
            height: self.y2 - self.y1,
        }
    }
}

/// 左上角 + 宽高
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tlwh {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Tlwh {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// 跟踪对象 (一帧中的一个目标)
///
/// `track_id < 0` 表示未跟踪, 计数时忽略
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedObject {
    pub track_id: i64,
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: Tlwh,
}

impl TrackedObject {
    pub fn new(track_id: i64, bbox: Tlwh, confidence: f32) -> Self {
        Self {
            track_id,
            class_id: 0,
            confidence,
            bbox,
        }
    }

    /// 中心点 (left + w/2, top + h/2)
    pub fn center(&self) -> (f32, f32) {
        (
            self.bbox.left + self.bbox.width / 2.0,
            self.bbox.top + self.bbox.height / 2.0,
        )
    }

    pub fn is_tracked(&self) -> bool {
        self.track_id >= 0
    }
}
