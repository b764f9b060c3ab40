//! ByteTrack 算法实现
//! ByteTrack: Simple and effective multi-object tracking
//!
//! 核心思想:
//! 1. 高低分检测框分开处理
//! 2. 高分框优先匹配 (IOU)
//! 3. 低分框救援丢失的轨迹
//! 4. 纯运动模型,无需外观特征

use super::tracker::{compute_iou, KalmanBoxFilter};
use super::types::{BBox, TrackedObject};
use super::{BoxSource, Detector};
use crate::error::AdapterError;
use crate::input::Frame;
use crate::region::RegionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// 跟踪参数 (可从 JSON 文件加载, 缺省字段取默认值)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteTrackConfig {
    /// 最大允许丢失帧数
    pub max_lost_frames: u32,
    /// 高分检测阈值
    pub high_score_threshold: f32,
    /// 低分检测阈值 (用于救援)
    pub low_score_threshold: f32,
    /// 高分匹配 IOU 阈值
    pub high_iou_threshold: f32,
    /// 低分匹配 IOU 阈值
    pub low_iou_threshold: f32,
    /// 卡尔曼过程噪声
    pub process_noise: f32,
    /// 卡尔曼观测噪声
    pub measurement_noise: f32,
}

impl Default for ByteTrackConfig {
    fn default() -> Self {
        Self {
            max_lost_frames: 30,
            high_score_threshold: 0.5,
            low_score_threshold: 0.1,
            high_iou_threshold: 0.3,
            low_iou_threshold: 0.2,
            process_noise: 0.1,
            measurement_noise: 0.5,
        }
    }
}

impl ByteTrackConfig {
    pub fn load(path: &Path) -> Result<Self, AdapterError> {
        let json = std::fs::read_to_string(path).map_err(|source| AdapterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| AdapterError::TrackerConfig {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if config.low_score_threshold > config.high_score_threshold {
            return Err(AdapterError::TrackerConfig {
                path: path.to_path_buf(),
                reason: "low_score_threshold > high_score_threshold".to_string(),
            });
        }
        info!("✅ 跟踪参数已加载: {:?}", config);
        Ok(config)
    }
}

/// ByteTrack 轨迹
#[derive(Clone, Debug)]
pub struct Track {
    /// 唯一跟踪ID
    pub id: i64,

    /// 当前边界框 (卡尔曼滤波平滑后)
    pub bbox: BBox,

    kalman: KalmanBoxFilter,

    /// 连续丢失帧数
    pub frames_lost: u32,

    /// 总共被跟踪的帧数
    pub total_frames: u32,

    /// 最近一次匹配的检测置信度
    pub score: f32,

    pub class_id: u32,
}

impl Track {
    fn new(id: i64, detection: &BBox, config: &ByteTrackConfig) -> Self {
        let kalman = KalmanBoxFilter::new(
            detection,
            config.process_noise,
            config.measurement_noise,
        );
        Self {
            id,
            bbox: kalman.state_bbox(),
            kalman,
            frames_lost: 0,
            total_frames: 1,
            score: detection.confidence,
            class_id: detection.class_id,
        }
    }

    fn predict(&mut self) {
        self.kalman.predict();
        self.bbox = self.kalman.state_bbox();
    }

    fn update(&mut self, detection: &BBox) {
        self.kalman.update(detection);
        self.bbox = self.kalman.state_bbox();
        self.frames_lost = 0;
        self.total_frames += 1;
        self.score = detection.confidence;
        self.class_id = detection.class_id;
    }

    /// 本帧是否匹配到检测
    pub fn is_matched(&self) -> bool {
        self.frames_lost == 0
    }

    pub fn to_object(&self) -> TrackedObject {
        TrackedObject {
            track_id: self.id,
            class_id: self.class_id,
            confidence: self.score,
            bbox: self.bbox.tlwh(),
        }
    }
}

/// ByteTrack 追踪器
pub struct ByteTracker {
    tracks: Vec<Track>,
    next_id: i64,
    config: ByteTrackConfig,
}

impl ByteTracker {
    pub fn new(config: ByteTrackConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    /// 更新跟踪 (ByteTrack 三步匹配), 返回所有存活轨迹
    pub fn update(&mut self, detections: &[BBox]) -> &[Track] {
        // 1. 所有轨迹先预测
        for track in &mut self.tracks {
            track.predict();
        }

        // 2. 分离高低分检测框
        let mut high_dets = Vec::new();
        let mut low_dets = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if det.confidence >= self.config.high_score_threshold {
                high_dets.push(idx);
            } else if det.confidence >= self.config.low_score_threshold {
                low_dets.push(idx);
            }
        }

        let mut matched_det = vec![false; detections.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        // 3. 第一轮匹配: 高分检测 + 所有轨迹
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        let assignments = self.match_detections(
            detections,
            &high_dets,
            &all_tracks,
            self.config.high_iou_threshold,
        );
        for (det_idx, track_idx) in assignments {
            matched_det[det_idx] = true;
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx]);
        }

        // 4. 第二轮匹配: 低分检测 + 未匹配的轨迹 (救援)
        let unmatched_tracks: Vec<usize> = (0..self.tracks.len())
            .filter(|&idx| !matched_track[idx])
            .collect();
        let low_assignments = self.match_detections(
            detections,
            &low_dets,
            &unmatched_tracks,
            self.config.low_iou_threshold,
        );
        for (det_idx, track_idx) in low_assignments {
            matched_det[det_idx] = true;
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx]);
        }

        // 5. 未匹配的轨迹 → 标记丢失
        for (track_idx, &matched) in matched_track.iter().enumerate() {
            if !matched {
                self.tracks[track_idx].frames_lost += 1;
            }
        }

        // 6. 未匹配的高分检测 → 新建轨迹
        for &det_idx in &high_dets {
            if !matched_det[det_idx] {
                let track = Track::new(self.next_id, &detections[det_idx], &self.config);
                debug!("新轨迹 #{}", self.next_id);
                self.tracks.push(track);
                self.next_id += 1;
            }
        }

        // 7. 删除丢失太久的轨迹
        let max_lost = self.config.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        &self.tracks
    }

    /// IOU 贪心匹配, 返回 (检测索引, 轨迹索引)
    fn match_detections(
        &self,
        detections: &[BBox],
        det_indices: &[usize],
        track_indices: &[usize],
        iou_threshold: f32,
    ) -> Vec<(usize, usize)> {
        if det_indices.is_empty() || track_indices.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for &det_idx in det_indices {
            for &track_idx in track_indices {
                let predicted = self.tracks[track_idx].kalman.predicted_bbox();
                let iou = compute_iou(&detections[det_idx], &predicted);
                if iou >= iou_threshold {
                    candidates.push((1.0 - iou, det_idx, track_idx));
                }
            }
        }

        // 按代价排序
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut assignments = Vec::new();
        let mut used_det = vec![false; detections.len()];
        let mut used_track = vec![false; self.tracks.len()];
        for (_, det_idx, track_idx) in candidates {
            if !used_det[det_idx] && !used_track[track_idx] {
                assignments.push((det_idx, track_idx));
                used_det[det_idx] = true;
                used_track[track_idx] = true;
            }
        }

        assignments
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// 跟踪统计信息
    pub fn stats(&self) -> String {
        format!("跟踪: {} | 总ID: {}", self.tracks.len(), self.next_id - 1)
    }
}

/// 检测框来源 + ByteTrack = 检测适配器
pub struct ByteTrackDetector<S: BoxSource> {
    source: S,
    tracker: ByteTracker,
}

impl<S: BoxSource> ByteTrackDetector<S> {
    pub fn new(source: S, config: ByteTrackConfig) -> Self {
        Self {
            source,
            tracker: ByteTracker::new(config),
        }
    }

    pub fn tracker(&self) -> &ByteTracker {
        &self.tracker
    }
}

impl<S: BoxSource> Detector for ByteTrackDetector<S> {
    fn detect(
        &mut self,
        frame: &Frame,
        _region: &RegionConfig,
    ) -> Result<Vec<TrackedObject>, AdapterError> {
        let boxes = self.source.boxes(frame)?;
        let tracks = self.tracker.update(&boxes);
        // 只输出本帧匹配到的轨迹, 丢失中的轨迹只是预测位置
        Ok(tracks
            .iter()
            .filter(|t| t.is_matched())
            .map(Track::to_object)
            .collect())
    }

    fn name(&self) -> String {
        format!("{} + ByteTrack", self.source.name())
    }
}
