//! # Scheduler 模块
//!
//! 遍历调度器：按方向运行一个完整的同步簇，并算出新的簇边界。
//!
//! ## 位置约定
//!
//! `position` 是步骤之间的边界：正向时运行 `steps[position]`，
//! 倒退时运行 `steps[position - 1]`。两种方向下，
//! 本次运行结束后的位置（`post`）同时也是后续递归的起点。
//!
//! ## 单次调用
//!
//! 1. 确定要运行的步骤与行进方向上的相邻步骤，以及决定二者关系的同步关系
//!    （正向看相邻步骤的关系，倒退看当前步骤的关系；数组两端为 `None`）
//! 2. `after`：把递归挂在当前步骤的完成回调上，必要时再延迟
//! 3. 运行当前步骤
//! 4. `with`：立刻（或按延迟对称规则延迟后）递归触发相邻步骤
//! 5. 正向且当前步骤开启新簇时，整个过程按它自己的延迟推迟
//!
//! 簇边界只由最外层调用计算，见 [`boundary`]。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::clock::{Clock, Millis};
use crate::effect::Completion;
use crate::options::{Direction, Relation};
use crate::stage::Measure;
use crate::step::{RunContext, Step};

/// 播放事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// 步骤开始运行
    StepStarted {
        index: usize,
        effect: String,
        direction: Direction,
        at: Millis,
    },
    /// 步骤的所有目标都已完成
    StepCompleted {
        index: usize,
        direction: Direction,
        at: Millis,
    },
    /// 簇一直延续到了时间轴的一端并已完成
    EndReached { direction: Direction, at: Millis },
    /// 公开游标移动
    CursorMoved { from: usize, to: usize },
}

/// 事件日志默认保留的条数
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// 事件日志
///
/// 超过 `max_events` 时丢弃最早的事件。
#[derive(Debug, Clone)]
pub(crate) struct EventLog {
    events: Rc<RefCell<VecDeque<PlaybackEvent>>>,
    max_events: Rc<Cell<usize>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            events: Rc::default(),
            max_events: Rc::new(Cell::new(DEFAULT_MAX_EVENTS)),
        }
    }
}

impl EventLog {
    pub(crate) fn set_max_events(&self, max: usize) {
        self.max_events.set(max);
        self.trim();
    }

    pub(crate) fn push(&self, event: PlaybackEvent) {
        self.events.borrow_mut().push_back(event);
        self.trim();
    }

    pub(crate) fn drain(&self) -> Vec<PlaybackEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn trim(&self) {
        let mut events = self.events.borrow_mut();
        while events.len() > self.max_events.get() {
            events.pop_front();
        }
    }
}

/// 在途工作计数
///
/// 每个未完成的步骤和未触发的延迟都持有一张 [`Ticket`]，票据释放时计数减一。
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    count: Rc<Cell<usize>>,
}

impl InFlight {
    pub(crate) fn begin(&self) -> Ticket {
        self.count.set(self.count.get() + 1);
        Ticket {
            count: self.count.clone(),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count.get()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.count.get() == 0
    }
}

#[derive(Debug)]
pub(crate) struct Ticket {
    count: Rc<Cell<usize>>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.count.set(self.count.get().saturating_sub(1));
    }
}

/// 一次遍历的全部参数
pub(crate) struct Traversal {
    pub(crate) steps: Rc<[Rc<Step>]>,
    pub(crate) direction: Direction,
    pub(crate) fast: bool,
    pub(crate) clock: Clock,
    pub(crate) stage: Rc<dyn Measure>,
    pub(crate) in_flight: InFlight,
    pub(crate) events: EventLog,
}

impl Traversal {
    fn emit(&self, event: PlaybackEvent) {
        self.events.push(event);
    }

    fn delay_of(&self, delay: Millis) -> Millis {
        if self.fast { 0 } else { delay }
    }

    /// 延迟执行，期间计入在途工作
    fn defer(&self, delay: Millis, task: impl FnOnce() + 'static) {
        let ticket = self.in_flight.begin();
        self.clock.schedule(delay, move || {
            task();
            drop(ticket);
        });
    }
}

/// 从 `position` 开始运行一个簇（或簇的剩余部分）
///
/// 返回本次运行之后的位置。
pub(crate) fn proceed(traversal: &Rc<Traversal>, position: usize) -> usize {
    let steps = &traversal.steps;
    let forward = traversal.direction.is_forward();

    let index = if forward { position } else { position - 1 };
    let post = if forward { index + 1 } else { index };

    let (neighbor, relation) = if forward {
        match steps.get(index + 1) {
            Some(next) => (Some(index + 1), Some(next.relation())),
            None => (None, None),
        }
    } else if index > 0 {
        (Some(index - 1), Some(steps[index].relation()))
    } else {
        (None, None)
    };

    let step = steps[index].clone();

    let continuation = match (relation, neighbor) {
        (Some(Relation::After), Some(neighbor)) => {
            let delay_bearing = if forward { &steps[neighbor] } else { &step };
            let delay = traversal.delay_of(delay_bearing.delay());
            let next = traversal.clone();
            Completion::new(move || {
                if delay > 0 {
                    let deferred = next.clone();
                    next.defer(delay, move || {
                        proceed(&deferred, post);
                    });
                } else {
                    proceed(&next, post);
                }
            })
        }
        (None, _) => {
            let end = traversal.clone();
            Completion::new(move || {
                end.emit(PlaybackEvent::EndReached {
                    direction: end.direction,
                    at: end.clock.now(),
                });
            })
        }
        _ => Completion::noop(),
    };

    let ticket = traversal.in_flight.begin();
    let done_traversal = traversal.clone();
    let on_complete = Completion::new(move || {
        done_traversal.emit(PlaybackEvent::StepCompleted {
            index,
            direction: done_traversal.direction,
            at: done_traversal.clock.now(),
        });
        continuation.complete();
        drop(ticket);
    });

    let run_traversal = traversal.clone();
    let run = move || {
        let t = &run_traversal;
        let ctx = RunContext {
            direction: step.direction().combine(t.direction),
            reversed: !t.direction.is_forward(),
            fast: t.fast,
            clock: t.clock.clone(),
            stage: t.stage.clone(),
        };

        debug!(
            index,
            effect = step.effect_name(),
            direction = %ctx.direction,
            fast = t.fast,
            "运行步骤"
        );
        t.emit(PlaybackEvent::StepStarted {
            index,
            effect: step.effect_name().to_string(),
            direction: t.direction,
            at: t.clock.now(),
        });

        step.run(&ctx, on_complete);

        if let (Some(Relation::With), Some(neighbor)) = (relation, neighbor) {
            let delay = if t.direction.is_forward() {
                t.delay_of(t.steps[neighbor].delay())
            } else {
                // 倒退时先启动正向时较晚结束的步骤，使两者在倒放中仍同时结束
                t.delay_of(
                    (step.delay() + step.duration()).saturating_sub(t.steps[neighbor].duration()),
                )
            };

            if delay > 0 {
                let deferred = t.clone();
                t.defer(delay, move || {
                    proceed(&deferred, post);
                });
            } else {
                proceed(t, post);
            }
        }
    };

    let opens_cluster = step_opens_cluster(traversal, index);
    let own_delay = traversal.delay_of(traversal.steps[index].delay());
    if forward && opens_cluster && own_delay > 0 {
        traversal.defer(own_delay, run);
    } else {
        run();
    }

    post
}

fn step_opens_cluster(traversal: &Traversal, index: usize) -> bool {
    traversal.steps[index].relation() == Relation::Step
}

/// 从 `post` 出发沿 `direction` 寻找下一个簇起点
///
/// 结果总是某个 `step` 关系步骤的下标，或者 `0` / `steps.len()`。
pub(crate) fn boundary(steps: &[Rc<Step>], post: usize, direction: Direction) -> usize {
    let len = steps.len();
    if direction.is_forward() {
        (post..len)
            .find(|&i| steps[i].relation() == Relation::Step)
            .unwrap_or(len)
    } else {
        (0..=post.min(len.saturating_sub(1)))
            .rev()
            .find(|&i| steps[i].relation() == Relation::Step)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Appear;
    use crate::element::{ElementHandle, Rect};
    use crate::options::{StepDefaults, StepOptions};

    const STEP: Relation = Relation::Step;
    const WITH: Relation = Relation::With;
    const AFTER: Relation = Relation::After;

    fn step(relation: Relation) -> Rc<Step> {
        Rc::new(
            Step::new(
                Rc::new(Appear),
                vec![ElementHandle::new("el", Rect::default())],
                relation,
                &StepOptions::new(),
                &StepDefaults::default(),
            )
            .unwrap(),
        )
    }

    fn steps(relations: &[Relation]) -> Vec<Rc<Step>> {
        relations.iter().map(|&r| step(r)).collect()
    }

    #[test]
    fn test_forward_boundary_skips_cluster_members() {
        let steps = steps(&[STEP, WITH, AFTER, STEP, WITH]);

        assert_eq!(boundary(&steps, 1, Direction::Forward), 3);
        assert_eq!(boundary(&steps, 3, Direction::Forward), 3);
        assert_eq!(boundary(&steps, 4, Direction::Forward), 5);
        assert_eq!(boundary(&steps, 5, Direction::Forward), 5);
    }

    #[test]
    fn test_backward_boundary_lands_on_cluster_start() {
        let steps = steps(&[STEP, WITH, AFTER, STEP, WITH]);

        assert_eq!(boundary(&steps, 4, Direction::Backward), 3);
        assert_eq!(boundary(&steps, 2, Direction::Backward), 0);
        assert_eq!(boundary(&steps, 0, Direction::Backward), 0);
    }

    #[test]
    fn test_tickets_track_in_flight_work() {
        let in_flight = InFlight::default();
        assert!(in_flight.is_idle());

        let a = in_flight.begin();
        let b = in_flight.begin();
        assert_eq!(in_flight.count(), 2);

        drop(a);
        assert_eq!(in_flight.count(), 1);
        drop(b);
        assert!(in_flight.is_idle());
    }
}
