//! # Timeline 模块
//!
//! 时间轴：按插入顺序排列的步骤，加上一个总是落在簇边界上的游标。
//!
//! ## 生命周期
//!
//! - 编排阶段：`step` / `with_previous` / `after_previous` 追加步骤
//! - 播放阶段：第一次 `advance` / `rewind` / `goto` 之后时间轴被封存，不能再追加
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let mut timeline = Timeline::new(EffectRegistry::with_builtins(), stage, clock.clone());
//! timeline
//!     .step([title.clone()], "slide", StepOptions::new())?
//!     .with_previous([subtitle.clone()], "appear", StepOptions::new().delay(200))?
//!     .after_previous([logo.clone()], "slide", StepOptions::new().param("from", "right"))?;
//!
//! timeline.advance();
//! clock.advance(1000);
//! timeline.rewind();
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{DebutResult, StepError, TimelineError};
use crate::element::ElementHandle;
use crate::options::{Direction, Relation, StepDefaults, StepOptions};
use crate::registry::EffectRegistry;
use crate::scheduler::{self, EventLog, InFlight, PlaybackEvent, Traversal};
use crate::stage::Measure;
use crate::step::Step;

/// 一次播放请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// 游标已移动
    Moved { from: usize, to: usize },
    /// 已经在该方向的尽头，什么也没做
    AtBound,
    /// 上一次遍历仍在进行，请求被拒绝
    Busy,
}

impl Transport {
    pub fn is_moved(&self) -> bool {
        matches!(self, Transport::Moved { .. })
    }
}

/// 时间轴
pub struct Timeline {
    steps: Vec<Rc<Step>>,
    sealed: Option<Rc<[Rc<Step>]>>,
    cursor: usize,
    registry: EffectRegistry,
    defaults: StepDefaults,
    clock: Clock,
    stage: Rc<dyn Measure>,
    in_flight: InFlight,
    events: EventLog,
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("steps", &self.steps.len())
            .field("cursor", &self.cursor)
            .field("sealed", &self.sealed.is_some())
            .field("in_flight", &self.in_flight.count())
            .finish()
    }
}

impl Timeline {
    /// 创建空时间轴
    pub fn new(registry: EffectRegistry, stage: Rc<dyn Measure>, clock: Clock) -> Self {
        Self {
            steps: Vec::new(),
            sealed: None,
            cursor: 0,
            registry,
            defaults: StepDefaults::default(),
            clock,
            stage,
            in_flight: InFlight::default(),
            events: EventLog::default(),
        }
    }

    /// 替换全局默认选项（只影响之后追加的步骤）
    pub fn with_defaults(mut self, defaults: StepDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// 设置事件日志最多保留的条数
    pub fn with_max_events(self, max: usize) -> Self {
        self.events.set_max_events(max);
        self
    }

    // ========== 编排 ==========

    /// 追加一个开启新簇的步骤
    pub fn step(
        &mut self,
        targets: impl IntoIterator<Item = ElementHandle>,
        effect: &str,
        options: StepOptions,
    ) -> DebutResult<&mut Self> {
        self.append(Relation::Step, targets, effect, options)
    }

    /// 追加一个与前一步骤同时开始的步骤
    pub fn with_previous(
        &mut self,
        targets: impl IntoIterator<Item = ElementHandle>,
        effect: &str,
        options: StepOptions,
    ) -> DebutResult<&mut Self> {
        self.append(Relation::With, targets, effect, options)
    }

    /// 追加一个在前一步骤完成后开始的步骤
    pub fn after_previous(
        &mut self,
        targets: impl IntoIterator<Item = ElementHandle>,
        effect: &str,
        options: StepOptions,
    ) -> DebutResult<&mut Self> {
        self.append(Relation::After, targets, effect, options)
    }

    /// 按指定关系追加步骤
    pub fn append(
        &mut self,
        relation: Relation,
        targets: impl IntoIterator<Item = ElementHandle>,
        effect: &str,
        options: StepOptions,
    ) -> DebutResult<&mut Self> {
        if self.sealed.is_some() {
            return Err(TimelineError::Sealed.into());
        }
        if relation != Relation::Step && self.steps.is_empty() {
            return Err(StepError::NoPreviousStep { relation }.into());
        }

        let definition = self.registry.get(effect)?;
        let step = Step::new(
            definition,
            targets.into_iter().collect(),
            relation,
            &options,
            &self.defaults,
        )?;

        debug!(
            index = self.steps.len(),
            effect,
            relation = %relation,
            "追加步骤"
        );
        self.steps.push(Rc::new(step));
        Ok(self)
    }

    // ========== 查询 ==========

    /// 当前游标（簇起点下标，或 `len()`）
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Rc<Step>] {
        &self.steps
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// 是否已经开始播放
    pub fn is_sealed(&self) -> bool {
        self.sealed.is_some()
    }

    /// 是否还有未完成的步骤或未触发的延迟
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_idle()
    }

    /// 在途工作数量
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    /// 所有簇起点
    pub fn cluster_starts(&self) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.relation() == Relation::Step)
            .map(|(index, _)| index)
            .collect()
    }

    /// 取出累计的播放事件
    ///
    /// 日志只保留最近的 [`DEFAULT_MAX_EVENTS`](crate::DEFAULT_MAX_EVENTS) 条，
    /// 可用 [`Timeline::with_max_events`] 调整。
    pub fn drain_events(&self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    // ========== 播放 ==========

    /// 让时钟一直运行到没有待触发的定时器，返回触发数量
    pub fn settle(&self) -> usize {
        self.clock.run_until_idle()
    }

    /// 前进一个簇
    pub fn advance(&mut self) -> Transport {
        self.travel(Direction::Forward, false)
    }

    /// 后退一个簇
    pub fn rewind(&mut self) -> Transport {
        self.travel(Direction::Backward, false)
    }

    /// 不播放动画，直接跳到 `target` 所在簇的起点
    ///
    /// `target` 不在簇起点上时落到它之前最近的簇起点；超出长度时落到末尾。
    pub fn goto(&mut self, target: usize) -> Transport {
        if self.is_busy() {
            warn!(cursor = self.cursor, target, "上一次遍历尚未结束，忽略跳转");
            return Transport::Busy;
        }

        let target = self.cluster_start_at_or_before(target);
        let from = self.cursor;
        if target == from {
            return Transport::AtBound;
        }

        while self.cursor != target {
            let direction = if self.cursor < target {
                Direction::Forward
            } else {
                Direction::Backward
            };
            let result = self.travel(direction, true);
            self.clock.flush();
            if !result.is_moved() || self.is_busy() {
                warn!(cursor = self.cursor, target, "跳转被效果阻塞，停止在当前位置");
                break;
            }
        }

        Transport::Moved {
            from,
            to: self.cursor,
        }
    }

    fn cluster_start_at_or_before(&self, target: usize) -> usize {
        if target >= self.steps.len() {
            return self.steps.len();
        }
        (0..=target)
            .rev()
            .find(|&i| self.steps[i].relation() == Relation::Step)
            .unwrap_or(0)
    }

    fn seal(&mut self) -> Rc<[Rc<Step>]> {
        self.sealed
            .get_or_insert_with(|| self.steps.iter().cloned().collect())
            .clone()
    }

    fn travel(&mut self, direction: Direction, fast: bool) -> Transport {
        let at_bound = match direction {
            Direction::Forward => self.cursor >= self.steps.len(),
            Direction::Backward => self.cursor == 0,
        };
        if at_bound {
            debug!(cursor = self.cursor, direction = %direction, "已在尽头");
            return Transport::AtBound;
        }
        if self.is_busy() {
            warn!(cursor = self.cursor, direction = %direction, "上一次遍历尚未结束，忽略请求");
            return Transport::Busy;
        }

        let steps = self.seal();
        let traversal = Rc::new(Traversal {
            steps: steps.clone(),
            direction,
            fast,
            clock: self.clock.clone(),
            stage: self.stage.clone(),
            in_flight: self.in_flight.clone(),
            events: self.events.clone(),
        });

        let from = self.cursor;
        let post = scheduler::proceed(&traversal, from);
        let to = scheduler::boundary(&steps, post, direction);
        self.cursor = to;

        debug!(from, to, direction = %direction, fast, "游标移动");
        self.events.push(PlaybackEvent::CursorMoved { from, to });

        Transport::Moved { from, to }
    }
}
