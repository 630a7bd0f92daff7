//! # Config 模块
//!
//! 宿主配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (debut.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use debut_runtime::{Millis, Stage, StageConfig, StepDefaults};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "debut.json";

/// 宿主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// 舞台配置
    #[serde(default)]
    pub stage: StageConfig,

    /// 容器尺寸
    #[serde(default)]
    pub container: ContainerConfig,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `wait` 命令不带参数时推进的毫秒数
    #[serde(default = "default_wait_ms")]
    pub wait_ms: Millis,

    /// 步骤的全局默认选项
    #[serde(default)]
    pub defaults: StepDefaults,
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// 容器宽度（像素）
    #[serde(default = "default_container_width")]
    pub width: f32,

    /// 容器高度（像素）
    #[serde(default = "default_container_height")]
    pub height: f32,
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}

fn default_wait_ms() -> Millis {
    100
}

fn default_container_width() -> f32 {
    1280.0
}

fn default_container_height() -> f32 {
    720.0
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            stage: StageConfig::default(),
            container: ContainerConfig::default(),
            log_level: default_log_level(),
            wait_ms: default_wait_ms(),
            defaults: StepDefaults::default(),
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            width: default_container_width(),
            height: default_container_height(),
        }
    }
}

impl HostConfig {
    /// 读取并解析配置文件，不做任何回退
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::or_default(Self::read(path), path)
    }

    /// 把 [`HostConfig::read`] 的结果落实为配置，失败时回退到默认值
    pub fn or_default(result: Result<Self, ConfigError>, path: &Path) -> Self {
        match result {
            Ok(config) => {
                info!(path = %path.display(), "配置文件加载成功");
                config
            }
            Err(ConfigError::NotFound(_)) => {
                warn!(path = %path.display(), "配置文件不存在，使用默认配置");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "配置文件加载失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.stage.aspect) {
            return Err(ConfigError::ValidationFailed(format!(
                "舞台宽高比必须为正数，实际为 {}",
                self.stage.aspect
            )));
        }

        if !is_positive(self.stage.base_width) {
            return Err(ConfigError::ValidationFailed(format!(
                "舞台基准宽度必须为正数，实际为 {}",
                self.stage.base_width
            )));
        }

        if !is_positive(self.container.width) || !is_positive(self.container.height) {
            return Err(ConfigError::ValidationFailed(format!(
                "容器尺寸必须为正数，实际为 {}x{}",
                self.container.width, self.container.height
            )));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "无效的日志级别 '{}'",
                self.log_level
            )));
        }

        Ok(())
    }

    /// 按配置创建舞台
    pub fn stage(&self) -> Stage {
        Stage::new(
            self.stage.clone(),
            self.container.width,
            self.container.height,
        )
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件不存在
    #[error("配置文件不存在: {0}")]
    NotFound(PathBuf),

    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化 / 反序列化失败
    #[error("配置序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
