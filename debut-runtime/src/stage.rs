//! # Stage 模块
//!
//! 度量服务：演示舞台的尺寸、缩放与元素坐标换算。
//!
//! 调度器本身从不调用度量服务，只有效果定义的 `prepare` 钩子会用到它
//! （例如 slide 需要知道元素离舞台边缘有多远）。

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::element::{ElementHandle, Vec2};

/// 舞台配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// 宽高比
    #[serde(default = "default_aspect")]
    pub aspect: f32,

    /// 演示坐标系的基准宽度
    #[serde(default = "default_base_width")]
    pub base_width: f32,

    /// 是否只把舞台区域视为可见（信箱模式）
    #[serde(default = "default_letterbox")]
    pub letterbox: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            aspect: default_aspect(),
            base_width: default_base_width(),
            letterbox: default_letterbox(),
        }
    }
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

fn default_base_width() -> f32 {
    1000.0
}

fn default_letterbox() -> bool {
    true
}

impl StageConfig {
    /// 演示坐标系的基准高度
    pub fn base_height(&self) -> f32 {
        self.base_width / self.aspect
    }
}

/// 舞台边界
///
/// `visible_*` 以演示坐标系为单位，其余字段以容器像素为单位。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageBounds {
    pub width: f32,
    pub height: f32,
    pub outer_width: f32,
    pub outer_height: f32,
    pub visible_width: f32,
    pub visible_height: f32,
    pub scale: f32,
    pub top: f32,
    pub left: f32,
}

impl StageBounds {
    /// 根据容器尺寸计算舞台边界
    pub fn compute(config: &StageConfig, outer_width: f32, outer_height: f32) -> Self {
        let width = config.base_width;
        let height = config.base_height();
        let outer_aspect = outer_width / outer_height;

        let (scale, top, left) = if outer_aspect > config.aspect {
            let scale = outer_height / height;
            (scale, 0.0, (outer_width - width * scale) / 2.0)
        } else {
            let scale = outer_width / width;
            (scale, (outer_height - height * scale) / 2.0, 0.0)
        };

        let (visible_width, visible_height) = if config.letterbox {
            (width, height)
        } else {
            (outer_width / scale, outer_height / scale)
        };

        Self {
            width,
            height,
            outer_width,
            outer_height,
            visible_width,
            visible_height,
            scale,
            top,
            left,
        }
    }
}

/// 度量服务接口
pub trait Measure {
    /// 当前舞台边界
    fn bounds(&self) -> StageBounds;

    /// 元素在 `now` 时刻的位置（演示坐标系，包含位移）
    fn offset(&self, element: &ElementHandle, now: Millis) -> Vec2;
}

/// 默认的度量服务实现
#[derive(Debug, Clone)]
pub struct Stage {
    config: StageConfig,
    bounds: StageBounds,
}

impl Stage {
    /// 按容器尺寸创建舞台
    pub fn new(config: StageConfig, outer_width: f32, outer_height: f32) -> Self {
        let bounds = StageBounds::compute(&config, outer_width, outer_height);
        Self { config, bounds }
    }

    /// 容器尺寸恰好等于基准尺寸的舞台
    pub fn unscaled(config: StageConfig) -> Self {
        let (width, height) = (config.base_width, config.base_height());
        Self::new(config, width, height)
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// 容器像素坐标 → 演示坐标
    pub fn to_stage(&self, page: Vec2) -> Vec2 {
        Vec2::new(
            (page.x - self.bounds.left) / self.bounds.scale,
            (page.y - self.bounds.top) / self.bounds.scale,
        )
    }

    /// 演示坐标 → 容器像素坐标
    pub fn to_page(&self, stage: Vec2) -> Vec2 {
        Vec2::new(
            stage.x * self.bounds.scale + self.bounds.left,
            stage.y * self.bounds.scale + self.bounds.top,
        )
    }
}

impl Measure for Stage {
    fn bounds(&self) -> StageBounds {
        self.bounds
    }

    fn offset(&self, element: &ElementHandle, now: Millis) -> Vec2 {
        element.rect().origin() + element.translate_at(now)
    }
}
