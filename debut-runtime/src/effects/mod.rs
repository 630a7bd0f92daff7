//! # Effects 模块
//!
//! 内置效果定义。
//!
//! - [`Appear`]：只负责出现/消失，逻辑全部由入场可见性规则完成
//! - [`Slide`]：从舞台某一侧滑入（倒退时滑出）

mod appear;
mod slide;

pub use appear::Appear;
pub use slide::{Slide, SlideFrom};
