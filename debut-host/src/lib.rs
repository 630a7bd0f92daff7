//! # Debut Host
//!
//! 无界面宿主层：读取配置与演示文稿描述文件，构建时间轴，
//! 并用命令脚本驱动播放、输出每一步的元素状态。
//!
//! ```text
//! debut.json ──► HostConfig ─┐
//!                            ├─► Deck::build ──► Presentation ──► Player ──► Vec<Snapshot>
//! deck.json ───► Deck ───────┘                                      ▲
//!                                                 script ──► Vec<Command>
//! ```

pub mod config;
pub mod deck;
pub mod player;

pub use config::{ConfigError, ContainerConfig, DEFAULT_CONFIG_PATH, HostConfig};
pub use deck::{Deck, DeckError, ElementSpec, Presentation, StepSpec};
pub use player::{
    Command, ElementState, Outcome, Player, ScriptError, Snapshot, default_script, parse_script,
};
