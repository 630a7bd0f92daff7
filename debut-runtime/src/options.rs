//! # Options 模块
//!
//! 步骤选项：同步关系、方向、时序参数及其分层解析。
//!
//! ## 默认值分层
//!
//! 1. 全局默认值 [`StepDefaults`]（最低）
//! 2. 效果定义自带的默认值
//! 3. 编排时传入的 [`StepOptions`]（最高）

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::easing::Easing;

/// 同步关系：描述一个步骤与**前一个**步骤的关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// 开启一个新的独立簇
    #[default]
    Step,
    /// 与前一个步骤同时开始
    With,
    /// 等前一个步骤完成后再开始
    After,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Step => "step",
            Relation::With => "with",
            Relation::After => "after",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 播放方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Direction {
    /// +1
    #[default]
    Forward,
    /// -1
    Backward,
}

impl Direction {
    /// 符号（+1 / -1）
    pub fn sign(&self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    /// 反向
    pub fn flip(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// 方向相乘：同号为正，异号为负
    pub fn combine(self, other: Direction) -> Self {
        if self == other {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    pub fn is_forward(&self) -> bool {
        *self == Direction::Forward
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Forward),
            -1 => Ok(Direction::Backward),
            other => Err(format!("方向只能是 1 或 -1，实际为 {other}")),
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        direction.sign()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("+1"),
            Direction::Backward => f.write_str("-1"),
        }
    }
}

/// 编排时传入的选项（每一项都可以缺省）
///
/// 未识别的键保存在 `params` 中，由效果定义自行解释和校验。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separate_elements: Option<bool>,
    /// 效果专属参数
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl StepOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn duration(mut self, duration: Millis) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn delay(mut self, delay: Millis) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn entrance(mut self, entrance: bool) -> Self {
        self.entrance = Some(entrance);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn separate_elements(mut self, separate: bool) -> Self {
        self.separate_elements = Some(separate);
        self
    }

    /// 设置效果专属参数
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// 用 `over` 中显式给出的值覆盖自身
    pub fn overlay(mut self, over: &StepOptions) -> Self {
        self.easing = over.easing.or(self.easing);
        self.duration = over.duration.or(self.duration);
        self.delay = over.delay.or(self.delay);
        self.entrance = over.entrance.or(self.entrance);
        self.reverse = over.reverse.or(self.reverse);
        self.direction = over.direction.or(self.direction);
        self.separate_elements = over.separate_elements.or(self.separate_elements);
        for (key, value) in &over.params {
            self.params.insert(key.clone(), value.clone());
        }
        self
    }
}

/// 全局默认选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefaults {
    #[serde(default)]
    pub easing: Easing,
    #[serde(default = "default_duration")]
    pub duration: Millis,
    #[serde(default)]
    pub delay: Millis,
    #[serde(default)]
    pub entrance: bool,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_separate_elements")]
    pub separate_elements: bool,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            easing: Easing::default(),
            duration: default_duration(),
            delay: 0,
            entrance: false,
            reverse: false,
            direction: Direction::Forward,
            separate_elements: default_separate_elements(),
        }
    }
}

fn default_duration() -> Millis {
    500
}

fn default_separate_elements() -> bool {
    true
}

impl StepDefaults {
    /// 依次叠加效果默认值与编排选项，得到最终选项
    pub fn resolve(&self, effect: &StepOptions, author: &StepOptions) -> ResolvedOptions {
        let merged = effect.clone().overlay(author);
        let reverse = merged.reverse.unwrap_or(self.reverse);
        let direction = merged.direction.unwrap_or(self.direction);

        ResolvedOptions {
            easing: merged.easing.unwrap_or(self.easing),
            duration: merged.duration.unwrap_or(self.duration),
            delay: merged.delay.unwrap_or(self.delay),
            entrance: merged.entrance.unwrap_or(self.entrance),
            direction: if reverse { direction.flip() } else { direction },
            separate_elements: merged.separate_elements.unwrap_or(self.separate_elements),
            params: merged.params,
        }
    }
}

/// 解析完成的步骤选项
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub easing: Easing,
    pub duration: Millis,
    pub delay: Millis,
    pub entrance: bool,
    /// 已经合并了 `reverse` 的方向
    pub direction: Direction,
    pub separate_elements: bool,
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ResolvedOptions {
    /// 读取字符串参数
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|value| value.as_str())
    }

    /// 读取数值参数
    pub fn param_f32(&self, key: &str) -> Option<f32> {
        self.params
            .get(key)
            .and_then(|value| value.as_f64())
            .map(|v| v as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_combine() {
        use Direction::*;
        assert_eq!(Forward.combine(Forward), Forward);
        assert_eq!(Forward.combine(Backward), Backward);
        assert_eq!(Backward.combine(Forward), Backward);
        assert_eq!(Backward.combine(Backward), Forward);
    }

    #[test]
    fn test_direction_serde_uses_sign() {
        assert_eq!(serde_json::to_string(&Direction::Backward).unwrap(), "-1");
        let parsed: Direction = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Direction::Forward);
        assert!(serde_json::from_str::<Direction>("2").is_err());
    }

    #[test]
    fn test_resolution_layers() {
        let defaults = StepDefaults::default();
        let effect = StepOptions::new().entrance(true).duration(0);
        let author = StepOptions::new().duration(300).param("from", "right");

        let resolved = defaults.resolve(&effect, &author);

        assert_eq!(resolved.duration, 300);
        assert!(resolved.entrance);
        assert_eq!(resolved.delay, 0);
        assert_eq!(resolved.easing, Easing::EaseInOutCubic);
        assert_eq!(resolved.direction, Direction::Forward);
        assert!(resolved.separate_elements);
        assert_eq!(resolved.param_str("from"), Some("right"));
    }

    #[test]
    fn test_reverse_flips_direction() {
        let defaults = StepDefaults::default();
        let resolved = defaults.resolve(&StepOptions::new(), &StepOptions::new().reverse(true));
        assert_eq!(resolved.direction, Direction::Backward);

        let resolved = defaults.resolve(
            &StepOptions::new(),
            &StepOptions::new().reverse(true).direction(Direction::Backward),
        );
        assert_eq!(resolved.direction, Direction::Forward);
    }

    #[test]
    fn test_options_deserialize_with_effect_params() {
        let json = r#"{ "duration": 250, "delay": 100, "easing": "linear", "from": "top" }"#;
        let options: StepOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.duration, Some(250));
        assert_eq!(options.delay, Some(100));
        assert_eq!(options.easing, Some(Easing::Linear));
        assert_eq!(
            options.params.get("from"),
            Some(&serde_json::Value::from("top"))
        );
    }
}
