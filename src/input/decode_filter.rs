/// FFmpeg解码过滤器模块
/// FFmpeg decode filter module
///
/// 解码后的 rgb24 帧 → image::RgbImage, 通过 1 槽通道交给采集线程
use crossbeam_channel::{Sender, TrySendError};
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// FFmpeg解码过滤器: 视频流 → RGB帧
pub struct DecodeFilter {
    tx: Sender<RgbImage>,
    stop: Arc<AtomicBool>,
    /// 实时源: 通道满时丢帧; 文件: 阻塞等待, 不丢帧
    drop_when_full: bool,
    count: usize,
    last: Instant,
    dropped_frames: usize,
    total_frames: usize,
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbImage>, stop: Arc<AtomicBool>, drop_when_full: bool) -> Self {
        Self {
            tx,
            stop,
            drop_when_full,
            count: 0,
            last: Instant::now(),
            dropped_frames: 0,
            total_frames: 0,
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.stop.load(Ordering::Relaxed) {
            return Err("capture released".to_string());
        }

        self.total_frames += 1;

        let image = unsafe {
            // 基本检查：空帧或损坏帧
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                self.dropped_frames += 1;
                return Ok(None);
            }

            let w = (*frame.as_ptr()).width as usize;
            let h = (*frame.as_ptr()).height as usize;
            let data = (*frame.as_ptr()).data[0];
            let stride = (*frame.as_ptr()).linesize[0] as usize;

            if w == 0 || h == 0 || data.is_null() || stride < w * 3 {
                self.dropped_frames += 1;
                if self.total_frames <= 10 {
                    warn!("⚠️ 丢弃帧 #{}: {}x{} stride={}", self.total_frames, w, h, stride);
                }
                return Ok(None);
            }

            // rgb24 按行拷贝 (去掉行尾对齐填充)
            let row = w * 3;
            let mut buffer = Vec::with_capacity(row * h);
            for y in 0..h {
                let src = std::slice::from_raw_parts(data.add(y * stride), row);
                buffer.extend_from_slice(src);
            }
            RgbImage::from_raw(w as u32, h as u32, buffer)
        };

        let Some(image) = image else {
            self.dropped_frames += 1;
            return Ok(None);
        };

        if self.drop_when_full {
            match self.tx.try_send(image) {
                Ok(()) => self.count += 1,
                Err(TrySendError::Full(_)) => self.dropped_frames += 1,
                Err(TrySendError::Disconnected(_)) => return Err("capture released".to_string()),
            }
        } else if self.tx.send(image).is_err() {
            return Err("capture released".to_string());
        } else {
            self.count += 1;
        }

        // 每秒打印一次解码统计
        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            debug!(
                "📺 解码统计: 解码{}帧 | 实际{:.1}fps | 总帧{} | 丢弃{}",
                self.count,
                self.count as f64 / elapsed,
                self.total_frames,
                self.dropped_frames
            );
            self.last = Instant::now();
            self.count = 0;
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!(
            "✅ 解码线程退出 (总帧{}, 丢弃{})",
            self.total_frames, self.dropped_frames
        );
    }
}
