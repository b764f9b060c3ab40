//! 区域配置文件 - 通过JSON文件调整门线
//!
//! 文件可被外部随时改写 (设置工具 / 物理按键), 计数线程每帧重新读取。
//! 读取失败视为瞬时错误, 沿用上一次的有效配置; 未知区域类型为致命错误。

use super::{Door, RegionConfig, RegionType};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 文件中的原始记录 (type 为字符串, 兼容 number1/number2 旧字段名)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegionRecord {
    #[serde(rename = "type")]
    region_type: String,
    #[serde(alias = "number1")]
    line1: i32,
    #[serde(alias = "number2")]
    line2: i32,
}

impl RegionRecord {
    fn into_config(self) -> Result<RegionConfig, ConfigError> {
        Ok(RegionConfig {
            region_type: self.region_type.parse::<RegionType>()?,
            line1: self.line1,
            line2: self.line2,
        })
    }
}

impl From<&RegionConfig> for RegionRecord {
    fn from(config: &RegionConfig) -> Self {
        Self {
            region_type: config.region_type.as_str().to_string(),
            line1: config.line1,
            line2: config.line2,
        }
    }
}

/// 区域配置存储
pub struct RegionStore {
    path: PathBuf,
    last_good: RegionConfig,
    failing: bool,
}

impl RegionStore {
    /// 打开配置文件, 不存在时用 `initial` 创建
    pub fn open(path: impl Into<PathBuf>, initial: RegionConfig) -> Result<Self, ConfigError> {
        let path = path.into();
        let last_good = if path.exists() {
            match Self::read(&path) {
                Ok(config) => {
                    info!("✅ 区域配置已从 {} 加载: {}", path.display(), config);
                    config
                }
                Err(e) if e.is_transient() => {
                    warn!("⚠️  区域配置暂不可读: {}, 使用默认值 {}", e, initial);
                    initial
                }
                Err(e) => return Err(e),
            }
        } else {
            info!("📝 区域配置不存在, 创建默认配置 {}", path.display());
            Self::write(&path, &initial)?;
            initial
        };

        Ok(Self {
            path,
            last_good,
            failing: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_good(&self) -> RegionConfig {
        self.last_good
    }

    /// 每帧读取一次
    ///
    /// 瞬时失败返回上一次的有效配置 (每段连续失败只告警一次),
    /// 未知区域类型直接返回错误。
    pub fn refresh(&mut self) -> Result<RegionConfig, ConfigError> {
        match Self::read(&self.path) {
            Ok(config) => {
                if config != self.last_good {
                    info!("🔄 区域配置更新: {} → {}", self.last_good, config);
                }
                self.last_good = config;
                self.failing = false;
                Ok(config)
            }
            Err(e) if e.is_transient() => {
                if !self.failing {
                    warn!("⚠️  区域配置读取失败, 沿用 {}: {}", self.last_good, e);
                    self.failing = true;
                }
                Ok(self.last_good)
            }
            Err(e) => Err(e),
        }
    }

    /// 读取并校验配置文件
    pub fn read(path: &Path) -> Result<RegionConfig, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let record: RegionRecord =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        record.into_config()
    }

    /// 写入配置: 先写临时文件再 rename, 读者只会看到完整的内容
    pub fn write(path: &Path, config: &RegionConfig) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let json = serde_json::to_string_pretty(&RegionRecord::from(config))
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)
    }

    /// 调整某扇门的位置 (物理按键: 每按一次 ±1)
    pub fn adjust(path: &Path, door: Door, delta: i32) -> Result<RegionConfig, ConfigError> {
        let mut config = Self::read(path)?;
        match door {
            Door::Door1 => config.line1 += delta,
            Door::Door2 => config.line2 += delta,
        }
        Self::write(path, &config)?;
        info!("💾 {} 调整 {:+} → {}", door.label(), delta, config);
        Ok(config)
    }
}
