/// 结果渲染 (Annotated frame rendering)
///
/// 纯函数: 输入帧 + 跟踪结果 + 穿越事件 + 门线 → 标注后的新图像
/// - 目标框 / "ID 置信度" 标签 / 中心点
/// - 本帧穿越的目标画圆环 (IN 绿色, OUT 红色)
/// - DOOR1 红色, DOOR2 蓝色
/// - 右上角 FPS, 左上角最新计数记录
pub mod sink;
#[cfg(feature = "ffmpeg")]
pub mod video;

pub use sink::{FrameWriter, ImageSequenceWriter, OutputSink, QuitSignal};
#[cfg(feature = "ffmpeg")]
pub use video::VideoFileWriter;

use crate::counting::{CrossingEvent, Direction};
use crate::detection::tracker::id_to_color;
use crate::detection::TrackedObject;
use crate::input::Frame;
use crate::region::{Door, EntranceGeometry};
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut,
    draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{info, warn};

const DOOR1_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const DOOR2_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const IN_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const OUT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_BG: Rgb<u8> = Rgb([0, 0, 0]);

pub struct Renderer {
    font: Option<FontArc>,
    line_thickness: u32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(None, 2)
    }
}

impl Renderer {
    pub fn new(font: Option<FontArc>, line_thickness: u32) -> Self {
        Self {
            font,
            line_thickness: line_thickness.max(1),
        }
    }

    /// 加载 TrueType 字体, 失败时只画几何图形
    pub fn load_font(path: &Path) -> Option<FontArc> {
        match std::fs::read(path).map(FontArc::try_from_vec) {
            Ok(Ok(font)) => {
                info!("✅ 字体加载成功: {}", path.display());
                Some(font)
            }
            Ok(Err(e)) => {
                warn!("⚠️ 字体无效 {}: {}", path.display(), e);
                None
            }
            Err(e) => {
                warn!("⚠️ 未找到字体文件 {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 渲染一帧 (不修改输入帧)
    pub fn render(
        &self,
        frame: &Frame,
        objects: &[TrackedObject],
        events: &[CrossingEvent],
        fps: f64,
        geometry: &EntranceGeometry,
        summary: Option<&str>,
    ) -> RgbImage {
        let mut canvas = frame.image.clone();

        // 门线
        for (door, line) in geometry.doors() {
            let color = match door {
                Door::Door1 => DOOR1_COLOR,
                Door::Door2 => DOOR2_COLOR,
            };
            self.draw_hline(&mut canvas, line.x1, line.x2, line.y, color);
            self.draw_label(&mut canvas, door.label(), line.x1 + 4, line.y - 22, color);
        }

        // 目标
        for object in objects {
            let (r, g, b) = id_to_color(object.track_id);
            let color = Rgb([r, g, b]);
            let bbox = object.bbox;
            let x = bbox.left.round() as i32;
            let y = bbox.top.round() as i32;
            let w = (bbox.width.round() as i64).max(1) as u32;
            let h = (bbox.height.round() as i64).max(1) as u32;

            for t in 0..self.line_thickness {
                let t = t as i32;
                let (tw, th) = (w.saturating_sub(2 * t as u32), h.saturating_sub(2 * t as u32));
                if tw == 0 || th == 0 {
                    break;
                }
                draw_hollow_rect_mut(&mut canvas, Rect::at(x + t, y + t).of_size(tw, th), color);
            }

            let label = format!("{} {:.2}", object.track_id, object.confidence);
            self.draw_label(&mut canvas, &label, x, y - 20, color);

            let (cx, cy) = object.center();
            let center = (cx.round() as i32, cy.round() as i32);
            draw_filled_circle_mut(&mut canvas, center, 4, color);

            for event in events.iter().filter(|e| e.track_id == object.track_id) {
                let ring = match event.direction {
                    Direction::In => IN_COLOR,
                    Direction::Out => OUT_COLOR,
                };
                draw_hollow_circle_mut(&mut canvas, center, 12, ring);
                draw_hollow_circle_mut(&mut canvas, center, 13, ring);
            }
        }

        // 叠加信息
        if let Some(font) = &self.font {
            let fps_text = format!("FPS: {:.2}", fps);
            let x = canvas.width() as i32 - 180;
            draw_text_mut(&mut canvas, TEXT_COLOR, x, 10, PxScale::from(24.0), font, &fps_text);
            if let Some(summary) = summary {
                draw_text_mut(&mut canvas, TEXT_COLOR, 10, 10, PxScale::from(18.0), font, summary);
            }
        }

        canvas
    }

    fn draw_hline(&self, canvas: &mut RgbImage, x1: i32, x2: i32, y: i32, color: Rgb<u8>) {
        let half = (self.line_thickness / 2) as i32;
        for dy in 0..self.line_thickness as i32 {
            let y = (y - half + dy) as f32;
            draw_line_segment_mut(canvas, (x1 as f32, y), (x2 as f32, y), color);
        }
    }

    /// 带底色的文字标签 (没有字体时跳过)
    fn draw_label(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        let Some(font) = &self.font else {
            return;
        };
        let y = y.max(0);
        let width = (text.chars().count() as u32 * 10).max(1);
        draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(width, 20), LABEL_BG);
        draw_text_mut(canvas, color, x + 2, y + 2, PxScale::from(18.0), font, text);
    }
}
