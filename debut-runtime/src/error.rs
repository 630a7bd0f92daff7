//! # Error 模块
//!
//! 定义 debut-runtime 中使用的错误类型。
//!
//! 只有配置错误会在编排阶段（播放之前）暴露给调用方；
//! 效果体不回调完成所造成的停滞属于效果定义的契约违反，不在此建模。

use thiserror::Error;

use crate::options::Relation;

/// 步骤构造错误（配置错误）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// 效果名未注册
    #[error("未知效果 '{name}'")]
    UnknownEffect { name: String },

    /// 目标元素集合为空
    #[error("效果 '{effect}' 没有目标元素")]
    EmptyTargets { effect: String },

    /// 选项值无效
    #[error("效果 '{effect}' 的选项 '{option}' 无效 - {message}")]
    InvalidOption {
        effect: String,
        option: String,
        message: String,
    },

    /// `with` / `after` 步骤之前没有任何步骤
    #[error("关系 '{relation}' 需要一个前置步骤")]
    NoPreviousStep { relation: Relation },
}

/// 时间轴错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// 播放开始后时间轴不可再追加步骤
    #[error("时间轴已开始播放，不能再追加步骤")]
    Sealed,
}

/// debut-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DebutError {
    /// 步骤配置错误
    #[error("步骤配置错误: {0}")]
    Step(#[from] StepError),

    /// 时间轴错误
    #[error("时间轴错误: {0}")]
    Timeline(#[from] TimelineError),
}

/// Result 类型别名
pub type DebutResult<T> = Result<T, DebutError>;
