//! # Player 模块
//!
//! 无界面播放器：按命令脚本驱动时间轴，并在每条命令之后记录快照。
//!
//! ## 命令脚本
//!
//! 每行一条命令，`#` 之后为注释：
//!
//! ```text
//! next          # 前进一个簇
//! wait 250      # 推进时钟 250ms（省略参数时使用配置中的 wait_ms）
//! prev          # 后退一个簇
//! goto 3        # 不播放动画，跳到第 3 个步骤所在簇的起点
//! settle        # 运行到没有待触发的定时器
//! ```

use std::fmt;
use std::str::FromStr;

use debut_runtime::{ElementHandle, Millis, PlaybackEvent, Timeline, Transport};
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::deck::Presentation;

/// 播放命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Goto(usize),
    /// `None` 表示使用默认等待时长
    Wait(Option<Millis>),
    Settle,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Next => f.write_str("next"),
            Command::Prev => f.write_str("prev"),
            Command::Goto(target) => write!(f, "goto {target}"),
            Command::Wait(Some(ms)) => write!(f, "wait {ms}"),
            Command::Wait(None) => f.write_str("wait"),
            Command::Settle => f.write_str("settle"),
        }
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or_else(|| "空命令".to_string())?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("命令 '{name}' 参数过多"));
        }

        let number = |arg: Option<&str>| -> Result<Option<u64>, String> {
            arg.map(|a| {
                a.parse::<u64>()
                    .map_err(|_| format!("命令 '{name}' 的参数必须是非负整数，实际为 '{a}'"))
            })
            .transpose()
        };

        match name {
            "next" | "prev" | "settle" if arg.is_some() => {
                Err(format!("命令 '{name}' 不接受参数"))
            }
            "next" => Ok(Command::Next),
            "prev" => Ok(Command::Prev),
            "settle" => Ok(Command::Settle),
            "goto" => {
                let target =
                    number(arg)?.ok_or_else(|| "命令 'goto' 需要一个步骤下标".to_string())?;
                usize::try_from(target)
                    .map(Command::Goto)
                    .map_err(|_| format!("步骤下标 {target} 超出范围"))
            }
            "wait" => Ok(Command::Wait(number(arg)?)),
            other => Err(format!("未知命令 '{other}'")),
        }
    }
}

/// 解析命令脚本
pub fn parse_script(text: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let command = line.parse().map_err(|message| ScriptError {
            line: index + 1,
            message,
        })?;
        commands.push(command);
    }
    Ok(commands)
}

/// 默认脚本：逐簇前进，每次都等动画结束
pub fn default_script(timeline: &Timeline) -> Vec<Command> {
    timeline
        .cluster_starts()
        .iter()
        .flat_map(|_| [Command::Next, Command::Settle])
        .collect()
}

/// 命令脚本错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("脚本第 {line} 行: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

/// 播放请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Moved { from: usize, to: usize },
    AtBound,
    Busy,
}

impl From<Transport> for Outcome {
    fn from(transport: Transport) -> Self {
        match transport {
            Transport::Moved { from, to } => Outcome::Moved { from, to },
            Transport::AtBound => Outcome::AtBound,
            Transport::Busy => Outcome::Busy,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Moved { from, to } => write!(f, "{from} -> {to}"),
            Outcome::AtBound => f.write_str("at bound"),
            Outcome::Busy => f.write_str("busy"),
        }
    }
}

/// 元素状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementState {
    pub id: String,
    pub visible: bool,
    pub x: f32,
    pub y: f32,
}

impl ElementState {
    fn capture(element: &ElementHandle, now: Millis) -> Self {
        let translate = element.translate_at(now);
        Self {
            id: element.id(),
            visible: element.is_visible(),
            x: translate.x,
            y: translate.y,
        }
    }
}

/// 一条命令执行后的快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub time: Millis,
    pub cursor: usize,
    pub busy: bool,
    /// 本条命令期间是否有遍历到达时间轴一端
    pub ended: bool,
    pub elements: Vec<ElementState>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>6}ms] {}", self.time, self.command)?;
        if let Some(outcome) = &self.outcome {
            write!(f, " ({outcome})")?;
        }
        write!(f, " cursor={}", self.cursor)?;
        if self.busy {
            f.write_str(" busy")?;
        }
        if self.ended {
            f.write_str(" ended")?;
        }
        for element in &self.elements {
            let mark = if element.visible { '+' } else { '-' };
            write!(
                f,
                "\n    {mark} {} ({:.1}, {:.1})",
                element.id, element.x, element.y
            )?;
        }
        Ok(())
    }
}

/// 无界面播放器
#[derive(Debug)]
pub struct Player {
    presentation: Presentation,
    wait_ms: Millis,
}

impl Player {
    pub fn new(presentation: Presentation, wait_ms: Millis) -> Self {
        Self {
            presentation,
            wait_ms,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.presentation.timeline
    }

    /// 执行一条命令并返回快照
    pub fn execute(&mut self, command: Command) -> Snapshot {
        let timeline = &mut self.presentation.timeline;
        let outcome = match command {
            Command::Next => Some(timeline.advance().into()),
            Command::Prev => Some(timeline.rewind().into()),
            Command::Goto(target) => Some(timeline.goto(target).into()),
            Command::Wait(ms) => {
                timeline.clock().advance(ms.unwrap_or(self.wait_ms));
                None
            }
            Command::Settle => {
                timeline.settle();
                None
            }
        };

        let mut ended = false;
        for event in timeline.drain_events() {
            trace!(?event, "播放事件");
            ended |= matches!(event, PlaybackEvent::EndReached { .. });
        }

        self.snapshot(command.to_string(), outcome, ended)
    }

    /// 依次执行所有命令
    pub fn run(&mut self, commands: &[Command]) -> Vec<Snapshot> {
        commands.iter().map(|&command| self.execute(command)).collect()
    }

    fn snapshot(&self, command: String, outcome: Option<Outcome>, ended: bool) -> Snapshot {
        let timeline = &self.presentation.timeline;
        let now = timeline.clock().now();
        Snapshot {
            command,
            outcome,
            time: now,
            cursor: timeline.cursor(),
            busy: timeline.is_busy(),
            ended,
            elements: self
                .presentation
                .elements
                .iter()
                .map(|element| ElementState::capture(element, now))
                .collect(),
        }
    }
}
