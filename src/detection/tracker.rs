//! 多目标跟踪公共组件
//! Common components for multi-object tracking

use super::types::BBox;

// ========== 卡尔曼滤波器 ==========

/// 简化卡尔曼滤波器 (用于单个边界框的位置和尺寸平滑)
/// 状态向量: [x_center, y_center, width, height, vx, vy, vw, vh]
#[derive(Clone, Debug)]
pub struct KalmanBoxFilter {
    /// 状态估计: [cx, cy, w, h, vx, vy, vw, vh]
    state: [f32; 8],

    /// 估计误差协方差 (简化为对角阵)
    p: [f32; 8],

    /// 过程噪声 (运动不确定性)
    q: f32,

    /// 观测噪声 (测量不确定性)
    r: f32,

    /// 速度衰减因子
    velocity_decay: f32,

    /// 静止阈值 (像素/帧)
    stationary_threshold: f32,

    /// 连续静止帧数计数器
    stationary_count: u32,
}

impl KalmanBoxFilter {
    /// 创建新的卡尔曼滤波器
    ///
    /// # 参数
    /// - `bbox`: 初始边界框
    /// - `q`: 过程噪声 (0.1-1.0, 越小越平滑)
    /// - `r`: 观测噪声 (越大越平滑)
    pub fn new(bbox: &BBox, q: f32, r: f32) -> Self {
        let cx = (bbox.x1 + bbox.x2) / 2.0;
        let cy = (bbox.y1 + bbox.y2) / 2.0;
        let w = bbox.x2 - bbox.x1;
        let h = bbox.y2 - bbox.y1;

        Self {
            state: [cx, cy, w, h, 0.0, 0.0, 0.0, 0.0],
            p: [10.0; 8],
            q,
            r,
            velocity_decay: 0.95,
            stationary_threshold: 2.0,
            stationary_count: 0,
        }
    }

    /// 预测下一帧状态 (匀速运动模型 + 速度衰减)
    pub fn predict(&mut self) {
        let speed = (self.state[4] * self.state[4] + self.state[5] * self.state[5]).sqrt();
        let is_stationary = speed < self.stationary_threshold;

        let (decay, size_decay) = if is_stationary {
            self.stationary_count += 1;
            // 连续静止3帧后大幅衰减速度
            let decay = if self.stationary_count > 3 {
                0.7
            } else {
                self.velocity_decay
            };
            (decay, decay)
        } else {
            self.stationary_count = 0;
            (self.velocity_decay, 0.98)
        };
        self.state[4] *= decay;
        self.state[5] *= decay;
        self.state[6] *= size_decay;
        self.state[7] *= size_decay;

        for i in 0..4 {
            self.state[i] += self.state[i + 4];
        }

        // P = P + Q (静止时减小过程噪声)
        let q = if is_stationary { self.q * 0.5 } else { self.q };
        self.p.iter_mut().for_each(|p| *p += q);
    }

    /// 融合观测值 (按残差自适应观测噪声)
    pub fn update(&mut self, bbox: &BBox) {
        let residual = [
            (bbox.x1 + bbox.x2) / 2.0 - self.state[0],
            (bbox.y1 + bbox.y2) / 2.0 - self.state[1],
            (bbox.x2 - bbox.x1) - self.state[2],
            (bbox.y2 - bbox.y1) - self.state[3],
        ];

        let residual_norm = (residual[0] * residual[0] + residual[1] * residual[1]).sqrt();
        let r = if residual_norm < self.stationary_threshold {
            self.r * 0.3
        } else if residual_norm < 10.0 {
            self.r
        } else {
            // 大幅跳变: 更信任预测值
            self.r * 3.0
        };
        let velocity_gain = if residual_norm < self.stationary_threshold {
            0.3
        } else {
            1.0
        };

        // K = P / (P + R)
        let mut k = [0.0f32; 8];
        for i in 0..8 {
            let noise = if i < 4 { r } else { r * 10.0 };
            k[i] = self.p[i] / (self.p[i] + noise);
        }

        for i in 0..4 {
            self.state[i] += k[i] * residual[i];
            self.state[i + 4] += k[i + 4] * residual[i] * velocity_gain;
        }

        // P = (I - K) * P
        for i in 0..8 {
            self.p[i] *= 1.0 - k[i];
        }

        if residual_norm >= self.stationary_threshold {
            self.stationary_count = 0;
        }
    }

    /// 当前状态的边界框
    pub fn state_bbox(&self) -> BBox {
        Self::to_bbox(self.state[0], self.state[1], self.state[2], self.state[3])
    }

    /// 预测的边界框 (用于匹配)
    pub fn predicted_bbox(&self) -> BBox {
        Self::to_bbox(
            self.state[0] + self.state[4],
            self.state[1] + self.state[5],
            self.state[2] + self.state[6],
            self.state[3] + self.state[7],
        )
    }

    fn to_bbox(cx: f32, cy: f32, w: f32, h: f32) -> BBox {
        let w = w.max(1.0);
        let h = h.max(1.0);
        BBox {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence: 1.0,
            class_id: 0,
        }
    }
}

// ========== 工具函数 ==========

/// 计算两个边界框的IOU (Intersection over Union)
pub fn compute_iou(bbox1: &BBox, bbox2: &BBox) -> f32 {
    let x1 = bbox1.x1.max(bbox2.x1);
    let y1 = bbox1.y1.max(bbox2.y1);
    let x2 = bbox1.x2.min(bbox2.x2);
    let y2 = bbox1.y2.min(bbox2.y2);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let area1 = (bbox1.x2 - bbox1.x1) * (bbox1.y2 - bbox1.y1);
    let area2 = (bbox2.x2 - bbox2.x1) * (bbox2.y2 - bbox2.y1);
    let union = area1 + area2 - intersection;

    if union <= 0.0 {
        return 0.0;
    }

    intersection / union
}

/// 根据ID生成不同颜色
pub fn id_to_color(id: i64) -> (u8, u8, u8) {
    let hue = (id.unsigned_abs() as f32 * 137.508) % 360.0; // 黄金角度采样
    hsv_to_rgb(hue, 0.8, 0.9)
}

/// HSV转RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
