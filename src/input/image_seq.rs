//! 图片序列输入 - 按文件名顺序回放一个目录中的图片
//!
//! 用于离线回放 (抽帧工具导出的 jpg/png 目录)

use super::Capture;
use crate::error::CaptureError;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

pub struct ImageSequenceCapture {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
    /// 回放帧间隔, None 表示尽快读取
    interval: Option<Duration>,
    last_read: Option<Instant>,
}

impl ImageSequenceCapture {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let open_err = |reason: String| CaptureError::Open {
            uri: dir.display().to_string(),
            reason,
        };

        let entries = std::fs::read_dir(dir).map_err(|e| open_err(e.to_string()))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();

        if files.is_empty() {
            return Err(open_err("no jpg/png/bmp images found".to_string()));
        }
        files.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            next: 0,
            interval: None,
            last_read: None,
        })
    }

    /// 按固定帧率回放 (模拟实时源)
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.interval = (fps > 0.0).then(|| Duration::from_secs_f64(1.0 / fps));
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.interval, self.last_read) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_read = Some(Instant::now());
    }
}

impl Capture for ImageSequenceCapture {
    fn read(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let Some(path) = self.files.get(self.next).cloned() else {
            return Ok(None);
        };
        self.pace();
        self.next += 1;

        let image = image::open(&path)
            .map_err(|source| CaptureError::Decode { path, source })?
            .to_rgb8();
        Ok(Some(image))
    }

    fn describe(&self) -> String {
        format!("{} ({} 张图片)", self.dir.display(), self.files.len())
    }
}
