/// 出入口区域配置 (Region configuration)
///
/// - RegionType:   区域类型 both / upper / under / close
/// - RegionConfig: 类型 + 两条水平线位置 (像素)
/// - EntranceGeometry: 按帧宽展开后的实际门线
/// - RegionStore:  JSON 持久化, 可被外部随时修改
pub mod store;

pub use store::RegionStore;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 区域类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    /// 两扇门: line1 在上, line2 在下, 方向相反
    Both,
    /// 仅上方门 (line1)
    Upper,
    /// 仅下方门 (line2)
    Under,
    /// 关闭计数
    Close,
}

impl RegionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::Both => "both",
            RegionType::Upper => "upper",
            RegionType::Under => "under",
            RegionType::Close => "close",
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(RegionType::Both),
            "upper" => Ok(RegionType::Upper),
            "under" => Ok(RegionType::Under),
            "close" => Ok(RegionType::Close),
            other => Err(ConfigError::UnsupportedRegionType(other.to_string())),
        }
    }
}

/// 区域配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    pub region_type: RegionType,
    pub line1: i32,
    pub line2: i32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            region_type: RegionType::Both,
            line1: 125,
            line2: 250,
        }
    }
}

impl RegionConfig {
    pub fn new(region_type: RegionType, line1: i32, line2: i32) -> Self {
        Self {
            region_type,
            line1,
            line2,
        }
    }

    /// 按帧宽展开门线
    pub fn geometry(&self, frame_width: u32) -> EntranceGeometry {
        let w = frame_width as i32;
        let door = |y: i32| DoorLine { x1: 0, y, x2: w };
        let (door1, door2) = match self.region_type {
            RegionType::Both => (Some(door(self.line1)), Some(door(self.line2))),
            RegionType::Upper => (Some(door(self.line1)), None),
            RegionType::Under => (None, Some(door(self.line2))),
            RegionType::Close => (None, None),
        };
        EntranceGeometry {
            region_type: self.region_type,
            door1,
            door2,
        }
    }
}

impl fmt::Display for RegionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={} line1={} line2={}",
            self.region_type, self.line1, self.line2
        )
    }
}

/// 水平门线 (x1,y)-(x2,y)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorLine {
    pub x1: i32,
    pub y: i32,
    pub x2: i32,
}

/// 门编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Door {
    Door1,
    Door2,
}

impl Door {
    pub fn label(&self) -> &'static str {
        match self {
            Door::Door1 => "DOOR1",
            Door::Door2 => "DOOR2",
        }
    }
}

/// 当前帧生效的门线; close 时两条都为空, 不会产生任何穿越
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntranceGeometry {
    pub region_type: RegionType,
    pub door1: Option<DoorLine>,
    pub door2: Option<DoorLine>,
}

impl EntranceGeometry {
    /// 所有生效门线
    pub fn doors(&self) -> impl Iterator<Item = (Door, DoorLine)> + '_ {
        self.door1
            .map(|l| (Door::Door1, l))
            .into_iter()
            .chain(self.door2.map(|l| (Door::Door2, l)))
    }

    pub fn is_closed(&self) -> bool {
        self.door1.is_none() && self.door2.is_none()
    }
}
