//! # Step 模块
//!
//! 步骤：效果定义绑定到一个或多个目标元素后的实例。
//!
//! ## 执行流程
//!
//! ```text
//! Step::run(ctx, on_complete)
//!   ├─ 为每个目标绑定克隆一份 EffectContext（同一时刻全部启动）
//!   ├─ 首次正向播放：before_state（整个步骤只触发一次）
//!   ├─ prepare（每次都执行）
//!   ├─ 入场元素：正向先显示；倒退时在完成回调之后再隐藏
//!   └─ 所有目标都完成后，JoinBarrier 触发一次 on_complete
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::clock::{Clock, Millis};
use crate::easing::Easing;
use crate::effect::{Completion, EffectContext, EffectDefinition, Store};
use crate::element::{ElementHandle, Visibility};
use crate::error::StepError;
use crate::options::{Direction, Relation, ResolvedOptions, StepDefaults, StepOptions};
use crate::stage::Measure;

/// 调度器传给步骤的共享上下文
#[derive(Clone)]
pub struct RunContext {
    /// 有效方向（已与步骤自身方向合并）
    pub direction: Direction,
    /// 时间轴是否正在倒退
    pub reversed: bool,
    /// 快速模式
    pub fast: bool,
    pub clock: Clock,
    pub stage: Rc<dyn Measure>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("direction", &self.direction)
            .field("reversed", &self.reversed)
            .field("fast", &self.fast)
            .finish()
    }
}

/// 目标绑定：一组元素加上它们专属的暂存区
#[derive(Debug, Clone)]
pub struct TargetBinding {
    elements: Vec<ElementHandle>,
    store: Store,
}

impl TargetBinding {
    fn new(elements: Vec<ElementHandle>) -> Self {
        Self {
            elements,
            store: Store::default(),
        }
    }

    pub fn elements(&self) -> &[ElementHandle] {
        &self.elements
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

struct BarrierState {
    finished: Vec<bool>,
    remaining: usize,
    callback: Option<Completion>,
}

/// 汇合屏障：N 个并发完成全部到达后，只触发一次回调
///
/// 计数在分发前一次性设定，所以同步完成的目标不会提前触发回调。
#[derive(Clone)]
pub struct JoinBarrier {
    state: Rc<RefCell<BarrierState>>,
}

impl JoinBarrier {
    pub fn new(count: usize, callback: Completion) -> Self {
        Self {
            state: Rc::new(RefCell::new(BarrierState {
                finished: vec![false; count],
                remaining: count,
                callback: Some(callback),
            })),
        }
    }

    /// 第 `index` 个参与者的完成回调
    pub fn arm(&self, index: usize) -> Completion {
        let state = self.state.clone();
        Completion::new(move || {
            let callback = {
                let mut state = state.borrow_mut();
                if state.finished[index] {
                    return;
                }
                state.finished[index] = true;
                state.remaining -= 1;
                if state.remaining > 0 {
                    return;
                }
                state.callback.take()
            };
            if let Some(callback) = callback {
                callback.complete();
            }
        })
    }

    /// 尚未完成的参与者数量
    pub fn remaining(&self) -> usize {
        self.state.borrow().remaining
    }
}

/// 步骤
pub struct Step {
    effect: Rc<dyn EffectDefinition>,
    options: Rc<ResolvedOptions>,
    relation: Relation,
    bindings: Vec<TargetBinding>,
    has_run_before_state: Cell<bool>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("effect", &self.effect.name())
            .field("relation", &self.relation)
            .field("options", &self.options)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

impl Step {
    /// 构造步骤
    ///
    /// 入场步骤在正向时会立刻把已渲染的目标隐藏起来，早于任何播放。
    pub fn new(
        effect: Rc<dyn EffectDefinition>,
        targets: Vec<ElementHandle>,
        relation: Relation,
        author: &StepOptions,
        defaults: &StepDefaults,
    ) -> Result<Self, StepError> {
        if targets.is_empty() {
            return Err(StepError::EmptyTargets {
                effect: effect.name().to_string(),
            });
        }

        let options = defaults.resolve(&effect.defaults(), author);
        effect.validate(&options)?;

        let bindings = if options.separate_elements {
            targets
                .into_iter()
                .map(|element| TargetBinding::new(vec![element]))
                .collect()
        } else {
            vec![TargetBinding::new(targets)]
        };

        let step = Self {
            effect,
            options: Rc::new(options),
            relation,
            bindings,
            has_run_before_state: Cell::new(false),
        };

        if step.direction().is_forward() {
            for element in step.hidden_capable_elements() {
                element.set_visibility(Visibility::Hidden);
            }
        }

        Ok(step)
    }

    pub fn effect_name(&self) -> &str {
        self.effect.name()
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn delay(&self) -> Millis {
        self.options.delay
    }

    pub fn duration(&self) -> Millis {
        self.options.duration
    }

    pub fn easing(&self) -> Easing {
        self.options.easing
    }

    /// 步骤自身的方向（已合并 `reverse`）
    pub fn direction(&self) -> Direction {
        self.options.direction
    }

    pub fn is_entrance(&self) -> bool {
        self.options.entrance
    }

    pub fn bindings(&self) -> &[TargetBinding] {
        &self.bindings
    }

    /// 所有目标元素
    pub fn elements(&self) -> impl Iterator<Item = &ElementHandle> {
        self.bindings.iter().flat_map(|binding| binding.elements.iter())
    }

    pub fn has_run_before_state(&self) -> bool {
        self.has_run_before_state.get()
    }

    /// 是否会切换可见性：入场步骤且至少有一个已渲染的目标
    pub fn is_hidden_capable(&self) -> bool {
        self.hidden_capable_elements().next().is_some()
    }

    fn hidden_capable_elements(&self) -> impl Iterator<Item = &ElementHandle> {
        let entrance = self.options.entrance;
        self.elements()
            .filter(move |element| entrance && element.is_rendered())
    }

    /// 运行步骤
    ///
    /// `on_complete` 在所有目标绑定都完成后恰好触发一次。
    pub fn run(&self, ctx: &RunContext, on_complete: Completion) {
        let duration = if ctx.fast { 0 } else { self.options.duration };

        let fire_before_state = !ctx.reversed && !self.has_run_before_state.get();
        if fire_before_state {
            self.has_run_before_state.set(true);
        }

        let barrier = JoinBarrier::new(self.bindings.len(), on_complete);

        for (index, binding) in self.bindings.iter().enumerate() {
            let target_ctx = EffectContext {
                elements: binding.elements.clone(),
                store: binding.store.clone(),
                direction: ctx.direction,
                reversed: ctx.reversed,
                fast: ctx.fast,
                duration,
                easing: self.options.easing,
                options: self.options.clone(),
                clock: ctx.clock.clone(),
                stage: ctx.stage.clone(),
            };
            self.run_target(&target_ctx, fire_before_state, barrier.arm(index));
        }
    }

    fn run_target(&self, ctx: &EffectContext, fire_before_state: bool, done: Completion) {
        if fire_before_state {
            self.effect.before_state(ctx);
        }

        self.effect.prepare(ctx);

        let mut done = done;
        if self.options.entrance {
            let toggled: Vec<ElementHandle> = ctx
                .elements
                .iter()
                .filter(|element| element.is_rendered())
                .cloned()
                .collect();

            if ctx.direction.is_forward() {
                for element in &toggled {
                    element.set_visibility(Visibility::Visible);
                }
            } else if !toggled.is_empty() {
                done = done.after(move || {
                    for element in &toggled {
                        element.set_visibility(Visibility::Hidden);
                    }
                });
            }
        }

        self.effect.run(ctx, done);
    }
}
