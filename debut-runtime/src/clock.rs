//! # Clock 模块
//!
//! 单线程协作式的虚拟时钟，代替浏览器里的 `setTimeout`。
//!
//! ## 执行模型
//!
//! ```text
//! schedule(delay, task) ──► 定时器队列（按 due, seq 排序）
//! advance(ms) ──► 依次触发窗口内到期的定时器，时间推进到窗口末尾
//! ```
//!
//! - 零延迟定时器同样是异步的：要等下一次 `flush` / `advance` 才会触发
//! - 任务执行时不持有内部借用，任务内部可以继续 `schedule`

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;

/// 毫秒
pub type Millis = u64;

type Task = Box<dyn FnOnce()>;

struct Timer {
    due: Millis,
    seq: u64,
    task: Task,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

struct ClockState {
    now: Millis,
    next_seq: u64,
    timers: BinaryHeap<Reverse<Timer>>,
}

/// 虚拟时钟句柄
///
/// 克隆得到的句柄共享同一个定时器队列。
#[derive(Clone)]
pub struct Clock {
    inner: Rc<RefCell<ClockState>>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Clock")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

impl Clock {
    /// 创建时间为 0 的时钟
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ClockState {
                now: 0,
                next_seq: 0,
                timers: BinaryHeap::new(),
            })),
        }
    }

    /// 当前时间
    pub fn now(&self) -> Millis {
        self.inner.borrow().now
    }

    /// 尚未触发的定时器数量
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// 在 `delay` 毫秒后执行 `task`
    pub fn schedule(&self, delay: Millis, task: impl FnOnce() + 'static) {
        let mut state = self.inner.borrow_mut();
        let due = state.now.saturating_add(delay);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.push(Reverse(Timer {
            due,
            seq,
            task: Box::new(task),
        }));
    }

    /// 取出一个不晚于 `limit` 到期的定时器，并把时间推进到它的到期时刻
    fn pop_due(&self, limit: Millis) -> Option<Task> {
        let mut state = self.inner.borrow_mut();
        let due = state.timers.peek().map(|Reverse(timer)| timer.due)?;
        if due > limit {
            return None;
        }
        let Reverse(timer) = state.timers.pop()?;
        state.now = state.now.max(timer.due);
        Some(timer.task)
    }

    /// 推进 `ms` 毫秒，触发窗口内到期的所有定时器
    ///
    /// 返回触发的定时器数量。
    pub fn advance(&self, ms: Millis) -> usize {
        let limit = self.now().saturating_add(ms);
        let mut fired = 0;
        while let Some(task) = self.pop_due(limit) {
            task();
            fired += 1;
        }
        self.inner.borrow_mut().now = limit;
        fired
    }

    /// 触发当前时刻已到期的定时器（包括执行过程中新产生的零延迟定时器）
    pub fn flush(&self) -> usize {
        self.advance(0)
    }

    /// 持续触发定时器直到队列为空
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(task) = self.pop_due(Millis::MAX) {
            task();
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<(&'static str, Millis)>>>, Clock) {
        (Rc::new(RefCell::new(Vec::new())), Clock::new())
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let (log, clock) = recorder();

        for (name, delay) in [("late", 300), ("early", 100), ("mid", 200)] {
            let log = log.clone();
            let c = clock.clone();
            clock.schedule(delay, move || log.borrow_mut().push((name, c.now())));
        }

        assert_eq!(clock.advance(250), 2);
        assert_eq!(*log.borrow(), vec![("early", 100), ("mid", 200)]);
        assert_eq!(clock.now(), 250);

        assert_eq!(clock.run_until_idle(), 1);
        assert_eq!(log.borrow().last(), Some(&("late", 300)));
    }

    #[test]
    fn test_same_due_keeps_insertion_order() {
        let (log, clock) = recorder();
        for name in ["a", "b", "c"] {
            let log = log.clone();
            clock.schedule(0, move || log.borrow_mut().push((name, 0)));
        }

        // 零延迟也要等 flush
        assert!(log.borrow().is_empty());
        clock.flush();
        let names: Vec<_> = log.borrow().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tasks_can_schedule_more_tasks() {
        let (log, clock) = recorder();
        let inner_log = log.clone();
        let inner_clock = clock.clone();
        clock.schedule(0, move || {
            let log = inner_log.clone();
            let c = inner_clock.clone();
            inner_clock.schedule(0, move || log.borrow_mut().push(("nested", c.now())));
        });

        assert_eq!(clock.flush(), 2);
        assert_eq!(*log.borrow(), vec![("nested", 0)]);
        assert_eq!(clock.pending(), 0);
    }
}
