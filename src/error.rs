//! 错误类型 (Error taxonomy)
//!
//! - ConfigError:  区域配置错误 (未知类型为致命, 读取/解析失败为瞬时)
//! - CaptureError: 视频输入错误
//! - AdapterError: 检测/跟踪适配器错误 (致命, 不重试)
//! - SinkError:    输出错误
//! - PipelineError: 流水线终止错误, 汇总以上所有

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("region_type:{0} unsupported (expected both/upper/under/close)")]
    UnsupportedRegionType(String),

    #[error("failed to read region setting {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse region setting {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write region setting {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// 读取中途失败 (文件正被写入/被删除) 可以沿用上一次的有效配置
    pub fn is_transient(&self) -> bool {
        matches!(self, ConfigError::Io { .. } | ConfigError::Parse { .. })
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}: {reason}")]
    Open { uri: String, reason: String },

    #[error("failed to decode frame {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("source {0:?} needs the `ffmpeg` feature")]
    Unsupported(String),

    #[error("capture read failed: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("detector failed on frame {frame_index}: {reason}")]
    Failed { frame_index: u64, reason: String },

    #[error("malformed detection record at {path:?} line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to read detections {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tracker config {path:?}: {reason}")]
    TrackerConfig { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output io error at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode output frame {path:?}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write video {path:?}: {reason}")]
    Video { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("pipeline already stopped, create a new instance to run again")]
    NotRestartable,

    #[error("pipeline has not been started")]
    NotStarted,

    #[error("failed to spawn {stage} thread")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    StagePanicked(&'static str),
}

impl PipelineError {
    /// 进程退出码: 0 正常停止, 2 配置错误, 3 检测适配器错误, 1 其他
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Adapter(_) => 3,
            _ => 1,
        }
    }
}
