//! 命令行参数 (CLI)
//!
//! - `run`:    启动计数流水线
//! - `region`: 查看 / 设置 / 微调门线 (设置窗口和物理按键的命令行版本)

use crate::counting::CounterSettings;
use crate::region::{Door, RegionConfig, RegionType};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 出入口人数统计
#[derive(Parser, Debug)]
#[command(author, version, about = "出入口人数统计 (Door counter)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 启动计数
    Run(RunArgs),
    /// 门线配置
    Region(RegionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// 视频源: 摄像头索引 / 视频文件 / rtsp 地址 / 图片目录
    #[arg(short, long, default_value = "0")]
    pub source: String,

    /// 离线跟踪结果 (MOT 格式: frame id left top w h [conf class])
    #[arg(short, long)]
    pub detections: PathBuf,

    /// 忽略文件中的ID, 用 ByteTrack 重新跟踪
    #[arg(long)]
    pub track: bool,

    /// ByteTrack 参数文件 (JSON)
    #[arg(long)]
    pub tracker_config: Option<PathBuf>,

    /// 门线配置文件
    #[arg(long, default_value = "region_setting.json")]
    pub region_file: PathBuf,

    /// 配置文件不存在时使用的区域类型
    #[arg(long, value_enum, default_value_t = RegionType::Both)]
    pub region_type: RegionType,

    /// 配置文件不存在时使用的 DOOR1 位置
    #[arg(long, default_value_t = 125, allow_negative_numbers = true)]
    pub line1: i32,

    /// 配置文件不存在时使用的 DOOR2 位置
    #[arg(long, default_value_t = 250, allow_negative_numbers = true)]
    pub line2: i32,

    /// 名义帧率 (用于区间统计)
    #[arg(long, default_value_t = 30)]
    pub video_fps: u64,

    /// 区间长度 (秒)
    #[arg(long, default_value_t = 2)]
    pub interval_secs: u64,

    /// 图片目录回放帧率 (不指定则尽快读取)
    #[arg(long)]
    pub replay_fps: Option<f64>,

    /// 输出根目录
    #[arg(long, default_value = "runs/track")]
    pub project: PathBuf,

    /// 输出目录名 (默认使用时间字符串)
    #[arg(long)]
    pub name: Option<String>,

    /// 输出目录已存在时直接复用
    #[arg(long)]
    pub exist_ok: bool,

    /// 不保存标注图像
    #[arg(long)]
    pub nosave: bool,

    /// 保存跟踪结果 (MOT 格式)
    #[arg(long)]
    pub save_txt: bool,

    /// 标注结果保存为视频 (<输出目录>/<名称>.mp4, 需要 ffmpeg 功能), 否则保存 JPEG 序列
    #[arg(long)]
    pub save_vid: bool,

    /// 标注文字使用的 TrueType 字体
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 框线粗细
    #[arg(long, default_value_t = 2)]
    pub line_thickness: u32,

    /// N 帧未出现的目标忘记上一位置
    #[arg(long)]
    pub evict_after: Option<u64>,

    /// 门线死区 (像素)
    #[arg(long, default_value_t = 0.0)]
    pub dead_band: f32,

    /// 不监听终端输入 (q + 回车退出)
    #[arg(long)]
    pub no_stdin: bool,
}

impl RunArgs {
    pub fn initial_region(&self) -> RegionConfig {
        RegionConfig::new(self.region_type, self.line1, self.line2)
    }

    pub fn counter_settings(&self) -> CounterSettings {
        CounterSettings::new(self.video_fps, self.interval_secs)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RegionArgs {
    /// 门线配置文件
    #[arg(long, default_value = "region_setting.json")]
    pub file: PathBuf,

    #[command(subcommand)]
    pub action: RegionAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RegionAction {
    /// 显示当前配置
    Show,
    /// 覆盖配置
    Set {
        #[arg(long, value_enum)]
        region_type: RegionType,
        #[arg(long, allow_negative_numbers = true)]
        line1: i32,
        #[arg(long, allow_negative_numbers = true)]
        line2: i32,
    },
    /// 微调某扇门的位置 (物理按键: 每次 ±1)
    Adjust {
        /// 1 = DOOR1 (line1), 2 = DOOR2 (line2)
        #[arg(long, value_parser = parse_door)]
        door: Door,
        #[arg(long, allow_negative_numbers = true)]
        delta: i32,
    },
}

fn parse_door(s: &str) -> Result<Door, String> {
    match s {
        "1" | "door1" | "DOOR1" => Ok(Door::Door1),
        "2" | "door2" | "DOOR2" => Ok(Door::Door2),
        other => Err(format!("unknown door {:?} (expected 1 or 2)", other)),
    }
}
