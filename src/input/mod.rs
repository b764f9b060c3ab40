/// 视频输入系统 (Video Input System)
///
/// 独立采集线程, 按采集速率覆盖写入单槽帧缓存
/// - Capture:     采集设备抽象 (read / release)
/// - FrameSlot:   单槽, 后写覆盖 (last-write-wins), 无队列无背压
/// - FrameSource: 采集线程 + 停止标志
/// - SourceSpec:  --source 参数解析 (摄像头 / 视频文件 / 流地址 / 图片目录)
pub mod image_seq;

#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;

pub use image_seq::ImageSequenceCapture;

#[cfg(feature = "ffmpeg")]
pub use decoder::FfmpegCapture;

use crate::error::{CaptureError, PipelineError};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 一帧图像 (RGB)
#[derive(Debug, Clone)]
pub struct Frame {
    /// 采集序号, 从 0 开始, 与处理端是否跳帧无关
    pub index: u64,
    pub image: RgbImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            image,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// 采集设备
pub trait Capture: Send {
    /// 读取下一帧; `Ok(None)` 表示流结束
    fn read(&mut self) -> Result<Option<RgbImage>, CaptureError>;

    /// 释放设备
    fn release(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// 采集线程的停止标志; 可能长时间阻塞的设备应在 read 中轮询它
    fn set_interrupt(&mut self, _stop: Arc<AtomicBool>) {}

    fn describe(&self) -> String;
}

/// 槽读取结果
#[derive(Debug, Clone)]
pub enum SlotRead {
    /// 还没有采集到任何帧
    Pending,
    Frame(Arc<Frame>),
    /// 流已结束
    Ended,
}

#[derive(Default)]
struct SlotState {
    frame: Option<Arc<Frame>>,
    ended: bool,
}

/// 单槽帧缓存, 采集端覆盖写, 处理端取最新
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // 持锁期间只做指针替换, 不会在中途 panic
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 发布新帧 (覆盖旧帧, 不等待读者)
    pub fn publish(&self, frame: Frame) {
        let mut state = self.lock();
        if !state.ended {
            state.frame = Some(Arc::new(frame));
        }
    }

    /// 标记流结束, 之后的读取都返回 Ended
    pub fn close(&self) {
        let mut state = self.lock();
        state.ended = true;
        state.frame = None;
    }

    pub fn read(&self) -> SlotRead {
        let state = self.lock();
        if state.ended {
            SlotRead::Ended
        } else {
            match &state.frame {
                Some(frame) => SlotRead::Frame(Arc::clone(frame)),
                None => SlotRead::Pending,
            }
        }
    }

    /// 最新帧; 流结束 (或尚未采集) 时为 None
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        match self.read() {
            SlotRead::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().ended
    }
}

/// 采集线程
pub struct FrameSource {
    slot: FrameSlot,
    stop: Arc<AtomicBool>,
    captured: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl FrameSource {
    /// 启动采集线程
    pub fn start(capture: Box<dyn Capture>, slot: FrameSlot) -> Result<Self, PipelineError> {
        Self::with_stop(capture, slot, Arc::new(AtomicBool::new(false)))
    }

    /// 使用外部停止标志启动 (标志置位后采集线程在一次读取内退出)
    pub fn with_stop(
        mut capture: Box<dyn Capture>,
        slot: FrameSlot,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, PipelineError> {
        let captured = Arc::new(AtomicU64::new(0));
        capture.set_interrupt(Arc::clone(&stop));

        let handle = {
            let slot = slot.clone();
            let stop = Arc::clone(&stop);
            let captured = Arc::clone(&captured);
            std::thread::Builder::new()
                .name("capture".to_string())
                .spawn(move || capture_loop(capture, slot, stop, captured))
                .map_err(|source| PipelineError::Spawn {
                    stage: "capture",
                    source,
                })?
        };

        Ok(Self {
            slot,
            stop,
            captured,
            handle: Some(handle),
        })
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.slot.latest_frame()
    }

    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// 已采集帧数
    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    /// 停止采集并等待线程退出 (设备在线程内释放)
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("❌ 采集线程 panic");
                self.slot.close();
            }
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    mut capture: Box<dyn Capture>,
    slot: FrameSlot,
    stop: Arc<AtomicBool>,
    captured: Arc<AtomicU64>,
) {
    info!("📹 采集线程启动: {}", capture.describe());
    let mut index = 0u64;

    while !stop.load(Ordering::Relaxed) {
        match capture.read() {
            Ok(Some(image)) => {
                slot.publish(Frame::new(index, image));
                index += 1;
                captured.store(index, Ordering::Relaxed);
            }
            Ok(None) if stop.load(Ordering::Relaxed) => break,
            Ok(None) => {
                info!("🏁 视频流结束 (共 {} 帧)", index);
                break;
            }
            Err(e) => {
                warn!("⚠️  采集失败, 结束视频流: {}", e);
                break;
            }
        }
    }

    // 无论何种退出方式都要通知处理端
    slot.close();

    if let Err(e) = capture.release() {
        error!("❌ 释放采集设备失败: {}", e);
    } else {
        debug!("采集设备已释放");
    }
    info!("✅ 采集线程退出");
}

/// 视频源选择
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// 本地摄像头索引
    Camera(usize),
    /// 视频文件
    File(PathBuf),
    /// rtsp / rtmp / http(s) 流
    Stream(String),
    /// 图片目录 (按文件名排序回放)
    Images(PathBuf),
}

impl SourceSpec {
    pub fn parse(source: &str) -> Self {
        let lower = source.to_lowercase();
        if !source.is_empty() && source.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(index) = source.parse() {
                return SourceSpec::Camera(index);
            }
        }
        if ["rtsp://", "rtmp://", "http://", "https://"]
            .iter()
            .any(|p| lower.starts_with(p))
        {
            return SourceSpec::Stream(source.to_string());
        }
        let path = PathBuf::from(source);
        if path.is_dir() {
            SourceSpec::Images(path)
        } else {
            SourceSpec::File(path)
        }
    }

    /// 是否实时源 (实时源允许丢帧)
    pub fn is_live(&self) -> bool {
        matches!(self, SourceSpec::Camera(_) | SourceSpec::Stream(_))
    }

    /// 打开对应的采集设备
    pub fn open_capture(&self, replay_fps: Option<f64>) -> Result<Box<dyn Capture>, CaptureError> {
        match self {
            SourceSpec::Images(dir) => {
                let capture = ImageSequenceCapture::open(dir)?;
                Ok(Box::new(match replay_fps {
                    Some(fps) => capture.with_fps(fps),
                    None => capture,
                }))
            }
            #[cfg(feature = "ffmpeg")]
            other => Ok(Box::new(FfmpegCapture::open(other)?)),
            #[cfg(not(feature = "ffmpeg"))]
            other => Err(CaptureError::Unsupported(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceSpec::Camera(index) => write!(f, "camera:{}", index),
            SourceSpec::File(path) => write!(f, "{}", path.display()),
            SourceSpec::Stream(url) => f.write_str(url),
            SourceSpec::Images(dir) => write!(f, "{}/", dir.display()),
        }
    }
}
