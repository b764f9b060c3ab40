/// FFmpeg 拉流解码器 (摄像头 / 视频文件 / RTSP 等网络流)
/// FFmpeg decoder with software decoding only
use super::decode_filter::DecodeFilter;
use super::{Capture, SourceSpec};
use crate::error::CaptureError;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::core::scheduler::ffmpeg_scheduler::{FfmpegScheduler, Running};
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 等待解码帧的轮询间隔, 也是停止命令的最大响应延迟
const READ_POLL: Duration = Duration::from_millis(100);

pub struct FfmpegCapture {
    uri: String,
    rx: Option<Receiver<RgbImage>>,
    stop: Arc<AtomicBool>,
    interrupt: Option<Arc<AtomicBool>>,
    scheduler: Option<FfmpegScheduler<Running>>,
    stalled: bool,
}

impl FfmpegCapture {
    /// 打开视频源并启动解码
    pub fn open(source: &SourceSpec) -> Result<Self, CaptureError> {
        let uri = source.to_string();
        let open_err = |reason: String| CaptureError::Open {
            uri: uri.clone(),
            reason,
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let filter = DecodeFilter::new(tx, Arc::clone(&stop), source.is_live());

        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("decode", Box::new(filter));
        let out = create_null_output().add_frame_pipeline(pipe);

        let ctx = FfmpegContext::builder()
            .input(Self::input(source))
            .filter_descs(["format=rgb24"].into())
            .output(out)
            .build()
            .map_err(|e| open_err(format!("构建失败: {}", e)))?;

        let sch = ctx
            .start()
            .map_err(|e| open_err(format!("启动失败: {}", e)))?;
        info!("✅ FFmpeg解码启动成功: {}", uri);

        Ok(Self {
            uri,
            rx: Some(rx),
            stop,
            interrupt: None,
            scheduler: Some(sch),
            stalled: false,
        })
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::Relaxed))
    }

    fn input(source: &SourceSpec) -> Input {
        match source {
            SourceSpec::Camera(index) => {
                #[cfg(target_os = "windows")]
                let (url, format) = (format!("video={}", camera_name(*index)), "dshow");
                #[cfg(target_os = "macos")]
                let (url, format) = (index.to_string(), "avfoundation");
                #[cfg(target_os = "linux")]
                let (url, format) = (format!("/dev/video{}", index), "v4l2");
                #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
                let (url, format) = (index.to_string(), "video4linux2");

                info!("🔍 使用格式: {}, 输入: {}", format, url);
                Input::new(url).set_format(format)
            }
            SourceSpec::Stream(url) if url.starts_with("rtsp://") => Input::new(url.as_str())
                .set_input_opts(
                    [
                        ("rtsp_transport", "tcp"),
                        ("buffer_size", "67108864"),
                        ("rtsp_flags", "prefer_tcp"),
                    ]
                    .into(),
                ),
            SourceSpec::Stream(url) => Input::new(url.as_str()),
            SourceSpec::File(path) | SourceSpec::Images(path) => {
                Input::new(path.to_string_lossy().to_string())
            }
        }
    }
}

/// dshow 需要设备名而不是索引
#[cfg(target_os = "windows")]
fn camera_name(index: usize) -> String {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => devices
            .into_iter()
            .nth(index)
            .unwrap_or_else(|| index.to_string()),
        Err(e) => {
            tracing::warn!("⚠️ 获取摄像头列表失败: {}", e);
            index.to_string()
        }
    }
}

impl Capture for FfmpegCapture {
    fn read(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let Some(rx) = &self.rx else {
            return Ok(None);
        };
        loop {
            match rx.recv_timeout(READ_POLL) {
                Ok(image) => {
                    self.stalled = false;
                    return Ok(Some(image));
                }
                // 解码结束后发送端被释放
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupted() {
                        return Ok(None);
                    }
                    if self.scheduler.as_ref().is_some_and(|sch| sch.is_ended()) {
                        return Ok(None);
                    }
                    if !self.stalled {
                        self.stalled = true;
                        warn!("⚠️  {} 暂无新帧, 等待中...", self.uri);
                    }
                }
            }
        }
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        self.stop.store(true, Ordering::Relaxed);
        self.rx = None;
        if let Some(sch) = self.scheduler.take() {
            // 卡住的网络流不会自己结束, 直接中止
            sch.abort();
            info!("🛑 FFmpeg解码已停止: {}", self.uri);
        }
        Ok(())
    }

    fn set_interrupt(&mut self, stop: Arc<AtomicBool>) {
        self.interrupt = Some(stop);
    }

    fn describe(&self) -> String {
        format!("ffmpeg {}", self.uri)
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
