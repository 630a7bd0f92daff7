//! # Deck 模块
//!
//! 演示文稿描述文件（JSON）的加载与构建。
//!
//! ## 格式
//!
//! ```json
//! {
//!   "elements": [
//!     { "id": "title", "x": 100, "y": 80, "width": 400, "height": 60 }
//!   ],
//!   "steps": [
//!     { "targets": ["title"], "effect": "slide", "options": { "from": "top" } },
//!     { "start": "with", "targets": ["subtitle"], "effect": "appear" }
//!   ]
//! }
//! ```
//!
//! `start` 缺省为 `step`；`options` 中未识别的键会原样交给效果定义。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use debut_runtime::{
    Clock, DebutError, EffectRegistry, ElementHandle, Rect, Relation, StepOptions, Timeline,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::HostConfig;

/// 元素描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    /// 是否在画面上（`false` 表示纯数据目标，永远不会被隐藏）
    #[serde(default = "default_rendered")]
    pub rendered: bool,
}

fn default_rendered() -> bool {
    true
}

impl ElementSpec {
    fn to_handle(&self) -> ElementHandle {
        if self.rendered {
            ElementHandle::new(
                self.id.clone(),
                Rect::new(self.x, self.y, self.width, self.height),
            )
        } else {
            ElementHandle::detached(self.id.clone())
        }
    }
}

/// 步骤描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(default)]
    pub start: Relation,
    pub targets: Vec<String>,
    pub effect: String,
    #[serde(default)]
    pub options: StepOptions,
}

/// 演示文稿描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// 构建完成的演示文稿
#[derive(Debug)]
pub struct Presentation {
    pub timeline: Timeline,
    /// 按描述文件中的顺序排列
    pub elements: Vec<ElementHandle>,
}

impl Presentation {
    pub fn clock(&self) -> &Clock {
        self.timeline.clock()
    }
}

impl Deck {
    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let deck = Self::parse(&content)?;
        info!(
            path = %path.display(),
            elements = deck.elements.len(),
            steps = deck.steps.len(),
            "演示文稿加载成功"
        );
        Ok(deck)
    }

    /// 从 JSON 文本解析
    pub fn parse(content: &str) -> Result<Self, DeckError> {
        Ok(serde_json::from_str(content)?)
    }

    /// 使用内置效果构建
    pub fn build(&self, config: &HostConfig) -> Result<Presentation, DeckError> {
        self.build_with(EffectRegistry::with_builtins(), config)
    }

    /// 使用给定的效果注册表构建
    ///
    /// 所有配置错误都在这里暴露，带上出错步骤的下标。
    pub fn build_with(
        &self,
        registry: EffectRegistry,
        config: &HostConfig,
    ) -> Result<Presentation, DeckError> {
        let mut by_id: HashMap<&str, ElementHandle> = HashMap::new();
        let mut elements = Vec::with_capacity(self.elements.len());
        for spec in &self.elements {
            let handle = spec.to_handle();
            if by_id.insert(spec.id.as_str(), handle.clone()).is_some() {
                return Err(DeckError::DuplicateElement {
                    id: spec.id.clone(),
                });
            }
            elements.push(handle);
        }

        let mut timeline = Timeline::new(registry, Rc::new(config.stage()), Clock::new())
            .with_defaults(config.defaults.clone());

        for (index, spec) in self.steps.iter().enumerate() {
            let targets = spec
                .targets
                .iter()
                .map(|id| {
                    by_id
                        .get(id.as_str())
                        .cloned()
                        .ok_or_else(|| DeckError::UnknownElement {
                            step: index,
                            id: id.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            timeline
                .append(spec.start, targets, &spec.effect, spec.options.clone())
                .map_err(|source| DeckError::Step {
                    index,
                    effect: spec.effect.clone(),
                    source,
                })?;
        }

        debug!(
            steps = timeline.len(),
            clusters = timeline.cluster_starts().len(),
            "时间轴构建完成"
        );
        Ok(Presentation { timeline, elements })
    }
}

/// 演示文稿错误
#[derive(Error, Debug)]
pub enum DeckError {
    /// 读取文件失败
    #[error("无法读取演示文稿 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("演示文稿解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 元素 id 重复
    #[error("元素 id '{id}' 重复")]
    DuplicateElement { id: String },

    /// 步骤引用了不存在的元素
    #[error("第 {step} 个步骤引用了不存在的元素 '{id}'")]
    UnknownElement { step: usize, id: String },

    /// 步骤配置错误
    #[error("第 {index} 个步骤（{effect}）配置错误: {source}")]
    Step {
        index: usize,
        effect: String,
        #[source]
        source: DebutError,
    },
}
