//! appear 效果
//!
//! 效果体本身是空的：可见性的切换由步骤的入场规则负责，
//! 这里只在 `duration` 之后报告完成。

use crate::effect::{Completion, EffectContext, EffectDefinition};
use crate::options::StepOptions;

/// 出现效果
#[derive(Debug, Clone, Copy, Default)]
pub struct Appear;

impl EffectDefinition for Appear {
    fn name(&self) -> &str {
        "appear"
    }

    fn defaults(&self) -> StepOptions {
        StepOptions::new().entrance(true).duration(0)
    }

    fn run(&self, ctx: &EffectContext, done: Completion) {
        ctx.complete_after(ctx.duration, done);
    }
}
