//! # Effect 模块
//!
//! 效果定义接口。
//!
//! ## 核心概念
//!
//! - [`EffectDefinition`]：无状态的效果描述，提供 `before_state` / `prepare` / `run` 三个钩子
//! - [`EffectContext`]：单个目标绑定在一次播放中看到的上下文
//! - [`Completion`]：一次性的完成回调，按值消费，不可能触发两次
//! - [`Store`]：每个目标绑定独立的暂存区，跨多次播放保留
//!
//! 效果定义只登记一次，调度器只读取它，从不修改。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::clock::{Clock, Millis};
use crate::easing::Easing;
use crate::element::{ElementHandle, Vec2};
use crate::error::StepError;
use crate::options::{Direction, ResolvedOptions, StepOptions};
use crate::stage::Measure;

/// 一次性完成回调
pub struct Completion {
    callback: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("armed", &self.callback.is_some())
            .finish()
    }
}

impl Completion {
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// 什么也不做的回调
    pub fn noop() -> Self {
        Self { callback: None }
    }

    /// 触发回调
    pub fn complete(mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }

    /// 先执行 `before`，再触发原回调
    pub fn after(self, before: impl FnOnce() + 'static) -> Self {
        Completion::new(move || {
            before();
            self.complete();
        })
    }
}

/// 目标绑定的暂存区
///
/// 克隆得到的句柄共享同一份数据。
#[derive(Clone, Default)]
pub struct Store {
    inner: Rc<RefCell<HashMap<String, f32>>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.borrow().iter()).finish()
    }
}

impl Store {
    pub fn get(&self, key: &str) -> Option<f32> {
        self.inner.borrow().get(key).copied()
    }

    pub fn get_or(&self, key: &str, default: f32) -> f32 {
        self.get(key).unwrap_or(default)
    }

    pub fn set(&self, key: impl Into<String>, value: f32) {
        self.inner.borrow_mut().insert(key.into(), value);
    }

    /// 以 `{prefix}.x` / `{prefix}.y` 两个键读取向量
    pub fn get_vec2(&self, prefix: &str) -> Option<Vec2> {
        let x = self.get(&format!("{prefix}.x"))?;
        let y = self.get(&format!("{prefix}.y"))?;
        Some(Vec2::new(x, y))
    }

    pub fn set_vec2(&self, prefix: &str, value: Vec2) {
        self.set(format!("{prefix}.x"), value.x);
        self.set(format!("{prefix}.y"), value.y);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

/// 单个目标绑定的执行上下文
#[derive(Clone)]
pub struct EffectContext {
    /// 目标元素（独立绑定时只有一个）
    pub elements: Vec<ElementHandle>,
    /// 该绑定的暂存区
    pub store: Store,
    /// 本次执行的有效方向（已与步骤方向合并）
    pub direction: Direction,
    /// 时间轴是否正在倒退
    pub reversed: bool,
    /// 快速模式：忽略所有延迟与时长
    pub fast: bool,
    /// 有效时长（快速模式下为 0）
    pub duration: Millis,
    pub easing: Easing,
    pub options: Rc<ResolvedOptions>,
    pub clock: Clock,
    /// 度量服务
    pub stage: Rc<dyn Measure>,
}

impl fmt::Debug for EffectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectContext")
            .field("elements", &self.elements)
            .field("direction", &self.direction)
            .field("reversed", &self.reversed)
            .field("fast", &self.fast)
            .field("duration", &self.duration)
            .finish()
    }
}

impl EffectContext {
    /// 第一个目标元素
    ///
    /// 目标绑定在构造时保证非空。
    pub fn element(&self) -> &ElementHandle {
        &self.elements[0]
    }

    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    /// 在 `delay` 毫秒后触发完成回调
    pub fn complete_after(&self, delay: Millis, done: Completion) {
        self.clock.schedule(delay, move || done.complete());
    }
}

/// 效果定义
pub trait EffectDefinition {
    /// 注册名
    fn name(&self) -> &str;

    /// 效果自带的默认选项
    fn defaults(&self) -> StepOptions {
        StepOptions::default()
    }

    /// 构造步骤时校验选项
    fn validate(&self, _options: &ResolvedOptions) -> Result<(), StepError> {
        Ok(())
    }

    /// 首次正向播放前记录初始状态（每个步骤最多一次）
    fn before_state(&self, _ctx: &EffectContext) {}

    /// 每次播放前重新计算派生数据
    fn prepare(&self, _ctx: &EffectContext) {}

    /// 效果体；结束时必须调用 `done.complete()`
    fn run(&self, ctx: &EffectContext, done: Completion);
}

type RunFn = dyn Fn(&EffectContext, Completion);

/// 由闭包构成的效果定义
pub struct FnEffect {
    name: String,
    defaults: StepOptions,
    run: Box<RunFn>,
}

impl fmt::Debug for FnEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEffect").field("name", &self.name).finish()
    }
}

impl FnEffect {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&EffectContext, Completion) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            defaults: StepOptions::default(),
            run: Box::new(run),
        }
    }

    pub fn with_defaults(mut self, defaults: StepOptions) -> Self {
        self.defaults = defaults;
        self
    }
}

impl EffectDefinition for FnEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn defaults(&self) -> StepOptions {
        self.defaults.clone()
    }

    fn run(&self, ctx: &EffectContext, done: Completion) {
        (self.run)(ctx, done)
    }
}
