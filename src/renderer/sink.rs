//! 输出端 - 保存标注帧 / 退出信号 / 计数记录
//!
//! - FrameWriter: 标注帧持久化 (编号 JPEG 序列; 视频见 video.rs)
//! - QuitSignal:  外部退出触发 (终端输入 q)
//! - OutputSink:  present() 每帧调用, close() 在停止时写 records.txt 并 flush

use crate::error::SinkError;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// 标注帧输出
pub trait FrameWriter: Send {
    fn write(&mut self, image: &RgbImage) -> Result<(), SinkError>;

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn frames_written(&self) -> u64;
}

/// 编号 JPEG 序列 (000001.jpg, 000002.jpg, ...)
pub struct ImageSequenceWriter {
    dir: PathBuf,
    quality: u8,
    written: u64,
}

impl ImageSequenceWriter {
    pub fn create(dir: &Path, quality: u8) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir).map_err(|source| SinkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            quality: quality.clamp(1, 100),
            written: 0,
        })
    }
}

impl FrameWriter for ImageSequenceWriter {
    fn write(&mut self, image: &RgbImage) -> Result<(), SinkError> {
        let path = self.dir.join(format!("{:06}.jpg", self.written + 1));
        let file = File::create(&path).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(image)
            .map_err(|source| SinkError::Encode {
                path: path.clone(),
                source,
            })?;
        writer
            .flush()
            .map_err(|source| SinkError::Io { path, source })?;
        self.written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

/// 外部退出信号
#[derive(Clone)]
pub struct QuitSignal {
    rx: Option<Receiver<()>>,
}

impl QuitSignal {
    pub fn channel() -> (Sender<()>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self { rx: Some(rx) })
    }

    /// 永不触发
    pub fn none() -> Self {
        Self { rx: None }
    }

    /// 是否收到退出请求 (不阻塞)
    pub fn requested(&self) -> bool {
        match &self.rx {
            Some(rx) => match rx.try_recv() {
                Ok(()) => true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
            },
            None => false,
        }
    }
}

/// 输出端
pub struct OutputSink {
    run_dir: Option<PathBuf>,
    writer: Option<Box<dyn FrameWriter>>,
    quit: QuitSignal,
    presented: u64,
}

impl OutputSink {
    pub fn new(run_dir: Option<PathBuf>, writer: Option<Box<dyn FrameWriter>>, quit: QuitSignal) -> Self {
        Self {
            run_dir,
            writer,
            quit,
            presented: 0,
        }
    }

    /// 不保存任何输出
    pub fn discard(quit: QuitSignal) -> Self {
        Self::new(None, None, quit)
    }

    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// 输出一帧, 返回是否请求退出
    pub fn present(&mut self, image: &RgbImage) -> Result<bool, SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write(image)?;
        }
        self.presented += 1;
        Ok(self.quit.requested())
    }

    /// 停止时调用: 写计数记录, flush 输出; 失败只记录日志
    pub fn close(&mut self, records: &[String]) {
        if let Some(mut writer) = self.writer.take() {
            match writer.finish() {
                Ok(()) => info!("💾 已保存 {} 帧标注图像", writer.frames_written()),
                Err(e) => error!("❌ 关闭输出失败: {}", e),
            }
        }

        if let Some(dir) = &self.run_dir {
            let path = dir.join("records.txt");
            match write_records(&path, records) {
                Ok(()) => info!("💾 计数记录已保存: {} ({} 条)", path.display(), records.len()),
                Err(e) => error!("❌ 保存计数记录失败: {}", e),
            }
        }
    }
}

/// 每条记录一行
pub fn write_records(path: &Path, records: &[String]) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for record in records {
        writeln!(writer, "{}", record).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}
