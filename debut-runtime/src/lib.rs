//! # Debut Runtime
//!
//! 演示步骤序列器的核心运行时库。
//!
//! ## 架构概述
//!
//! `debut-runtime` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 时间由虚拟 [`Clock`] 驱动，元素状态保存在 [`ElementHandle`] 里，
//! 宿主负责推进时钟并把元素状态画出来：
//!
//! ```text
//! Host                              Runtime
//!   │                                  │
//!   │──── advance() / rewind() ──────►│ Timeline → Scheduler → Step → Effect
//!   │◄─── Transport ──────────────────│
//!   │                                  │
//!   │──── clock.advance(ms) ─────────►│ 触发到期的延迟与完成回调
//!   │◄─── drain_events() ─────────────│
//! ```
//!
//! ## 核心类型
//!
//! - [`EffectDefinition`]：可复用的效果（`before_state` / `prepare` / `run`）
//! - [`Step`]：效果绑定到目标元素后的实例
//! - [`Timeline`]：有序步骤加游标，支持双向遍历
//! - [`PlaybackEvent`]：遍历过程中产生的事件
//!
//! ## 模块结构
//!
//! - [`clock`]：虚拟时钟
//! - [`element`]：元素句柄与位移动画
//! - [`stage`]：舞台缩放与度量服务
//! - [`easing`]：缓动函数
//! - [`options`]：步骤选项与默认值合并
//! - [`effect`]：效果定义接口
//! - [`effects`]：内置效果
//! - [`registry`]：效果注册表
//! - [`step`]：步骤与汇合屏障
//! - [`scheduler`]：遍历调度
//! - [`timeline`]：时间轴
//! - [`error`]：错误类型定义

pub mod clock;
pub mod easing;
pub mod effect;
pub mod effects;
pub mod element;
pub mod error;
pub mod options;
pub mod registry;
pub mod scheduler;
pub mod stage;
pub mod step;
pub mod timeline;

// 重导出核心类型
pub use clock::{Clock, Millis};
pub use easing::{Easing, UnknownEasing};
pub use effect::{Completion, EffectContext, EffectDefinition, FnEffect, Store};
pub use effects::{Appear, Slide, SlideFrom};
pub use element::{ElementHandle, Motion, Rect, Vec2, Visibility};
pub use error::{DebutError, DebutResult, StepError, TimelineError};
pub use options::{Direction, Relation, ResolvedOptions, StepDefaults, StepOptions};
pub use registry::EffectRegistry;
pub use scheduler::{DEFAULT_MAX_EVENTS, PlaybackEvent};
pub use stage::{Measure, Stage, StageBounds, StageConfig};
pub use step::{JoinBarrier, RunContext, Step, TargetBinding};
pub use timeline::{Timeline, Transport};
