/// 标注视频输出 (FFmpeg)
///
/// 帧先以 JPEG 暂存在 `<视频名>.frames/`, finish() 时合成为视频文件,
/// 成功后删除暂存目录; 合成失败时保留暂存帧
use super::sink::{FrameWriter, ImageSequenceWriter};
use crate::error::SinkError;
use ez_ffmpeg::{FfmpegContext, Input};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct VideoFileWriter {
    path: PathBuf,
    fps: u64,
    staging_dir: PathBuf,
    staging: ImageSequenceWriter,
}

impl VideoFileWriter {
    pub fn create(path: &Path, fps: u64) -> Result<Self, SinkError> {
        let staging_dir = path.with_extension("frames");
        let staging = ImageSequenceWriter::create(&staging_dir, 95)?;
        Ok(Self {
            path: path.to_path_buf(),
            fps: fps.max(1),
            staging_dir,
            staging,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self) -> Result<(), SinkError> {
        let video_err = |reason: String| SinkError::Video {
            path: self.path.clone(),
            reason,
        };

        let pattern = self.staging_dir.join("%06d.jpg");
        let fps = self.fps.to_string();
        let input = Input::new(pattern.to_string_lossy().to_string())
            .set_format("image2")
            .set_input_opts([("framerate", fps.as_str())].into());

        FfmpegContext::builder()
            .input(input)
            .output(self.path.to_string_lossy().to_string())
            .build()
            .map_err(|e| video_err(format!("构建失败: {}", e)))?
            .start()
            .map_err(|e| video_err(format!("启动失败: {}", e)))?
            .wait()
            .map_err(|e| video_err(format!("编码失败: {}", e)))
    }
}

impl FrameWriter for VideoFileWriter {
    fn write(&mut self, image: &RgbImage) -> Result<(), SinkError> {
        self.staging.write(image)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if self.staging.frames_written() > 0 {
            self.encode()?;
            info!(
                "📹 视频已保存: {} ({} 帧, {} fps)",
                self.path.display(),
                self.staging.frames_written(),
                self.fps
            );
        }
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            warn!("⚠️  无法删除暂存目录 {}: {}", self.staging_dir.display(), e);
        }
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.staging.frames_written()
    }
}
