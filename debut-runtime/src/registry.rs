//! # Effect Registry
//!
//! 效果名 → 效果定义的映射。构造步骤时按名称查找，未知名称是配置错误。

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::effect::EffectDefinition;
use crate::effects::{Appear, Slide};
use crate::error::StepError;

/// 效果注册表
#[derive(Clone, Default)]
pub struct EffectRegistry {
    definitions: HashMap<String, Rc<dyn EffectDefinition>>,
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl EffectRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置 `appear` 与 `slide` 的注册表
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Appear);
        registry.register(Slide);
        registry
    }

    /// 注册效果定义；同名定义会被替换
    pub fn register(&mut self, definition: impl EffectDefinition + 'static) {
        let name = definition.name().to_string();
        if self.definitions.contains_key(&name) {
            warn!(name = %name, "效果定义被替换");
        }
        self.definitions.insert(name, Rc::new(definition));
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Result<Rc<dyn EffectDefinition>, StepError> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| StepError::UnknownEffect {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// 已注册的名称（按字典序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }
}
