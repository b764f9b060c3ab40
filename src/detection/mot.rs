//! MOT 格式跟踪结果 - 读取回放 / 写出
//!
//! 每行: `frame id left top width height [conf [class ...]]`
//! 逗号或空白分隔, frame 从 1 开始, 对应采集序号 + 1。
//! conf/class 为负数 (-1) 时视为缺省。

use super::types::{BBox, Tlwh, TrackedObject};
use super::{BoxSource, Detector};
use crate::error::{AdapterError, SinkError};
use crate::input::Frame;
use crate::region::RegionConfig;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// 离线跟踪结果回放
pub struct MotReplay {
    path: PathBuf,
    frames: BTreeMap<u64, Vec<TrackedObject>>,
}

impl MotReplay {
    pub fn load(path: &Path) -> Result<Self, AdapterError> {
        let text = std::fs::read_to_string(path).map_err(|source| AdapterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let replay = Self::parse(path, &text)?;
        info!(
            "✅ 已加载跟踪结果 {} ({} 帧, {} 条记录)",
            path.display(),
            replay.frames.len(),
            replay.len()
        );
        Ok(replay)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, AdapterError> {
        let mut frames: BTreeMap<u64, Vec<TrackedObject>> = BTreeMap::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |reason: String| AdapterError::Malformed {
                path: path.to_path_buf(),
                line: line_no + 1,
                reason,
            };

            let fields = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .map(|f| {
                    f.parse::<f64>()
                        .map_err(|_| malformed(format!("not a number: {:?}", f)))
                })
                .collect::<Result<Vec<f64>, _>>()?;

            if fields.len() < 6 {
                return Err(malformed(format!(
                    "expected at least 6 fields, got {}",
                    fields.len()
                )));
            }
            if fields[0] < 1.0 || fields[0].fract() != 0.0 {
                return Err(malformed(format!("invalid frame number {}", fields[0])));
            }
            if fields[1].fract() != 0.0 {
                return Err(malformed(format!("invalid track id {}", fields[1])));
            }

            let confidence = fields.get(6).copied().filter(|c| *c >= 0.0).unwrap_or(1.0);
            let class_id = fields.get(7).copied().filter(|c| *c >= 0.0).unwrap_or(0.0);
            let object = TrackedObject {
                track_id: fields[1] as i64,
                class_id: class_id as u32,
                confidence: confidence as f32,
                bbox: Tlwh::new(
                    fields[2] as f32,
                    fields[3] as f32,
                    fields[4] as f32,
                    fields[5] as f32,
                ),
            };

            frames
                .entry(fields[0] as u64 - 1)
                .or_default()
                .push(object);
        }

        Ok(Self {
            path: path.to_path_buf(),
            frames,
        })
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 某采集帧的跟踪结果
    pub fn objects(&self, index: u64) -> &[TrackedObject] {
        self.frames.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Detector for MotReplay {
    fn detect(
        &mut self,
        frame: &Frame,
        _region: &RegionConfig,
    ) -> Result<Vec<TrackedObject>, AdapterError> {
        Ok(self.objects(frame.index).to_vec())
    }

    fn name(&self) -> String {
        format!("mot:{}", self.path.display())
    }
}

/// 只取检测框, 忽略文件中的ID
impl BoxSource for MotReplay {
    fn boxes(&mut self, frame: &Frame) -> Result<Vec<BBox>, AdapterError> {
        Ok(self
            .objects(frame.index)
            .iter()
            .map(|o| BBox::from_tlwh(o.bbox, o.confidence, o.class_id))
            .collect())
    }

    fn name(&self) -> String {
        format!("mot:{}", self.path.display())
    }
}

/// MOT 格式写出 (--save-txt)
pub struct MotWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl MotWriter {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let io_err = |source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn write_frame(&mut self, frame_index: u64, objects: &[TrackedObject]) -> Result<(), SinkError> {
        for o in objects.iter().filter(|o| o.is_tracked()) {
            writeln!(
                self.writer,
                "{} {} {} {} {} {} {} {} -1 -1",
                frame_index + 1,
                o.track_id,
                o.bbox.left,
                o.bbox.top,
                o.bbox.width,
                o.bbox.height,
                o.confidence,
                o.class_id
            )
            .map_err(|source| SinkError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
