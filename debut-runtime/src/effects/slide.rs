//! slide 效果
//!
//! 正向播放时先把元素挪到舞台外，再滑回原位；倒退时从原位滑出舞台。
//!
//! 暂存区键：
//! - `{i}.start`：首次正向播放前的位移
//! - `{i}.shift`：本次播放计算出的离场位移

use std::str::FromStr;

use crate::effect::{Completion, EffectContext, EffectDefinition};
use crate::element::Vec2;
use crate::error::StepError;
use crate::options::{ResolvedOptions, StepOptions};

/// 滑入方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideFrom {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

impl FromStr for SlideFrom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(SlideFrom::Left),
            "right" => Ok(SlideFrom::Right),
            "top" => Ok(SlideFrom::Top),
            "bottom" => Ok(SlideFrom::Bottom),
            other => Err(format!("应为 left/right/top/bottom，实际为 '{other}'")),
        }
    }
}

impl SlideFrom {
    fn from_options(options: &ResolvedOptions) -> Result<Self, String> {
        match options.params.get("from") {
            None => Ok(SlideFrom::default()),
            Some(value) => value
                .as_str()
                .ok_or_else(|| format!("应为字符串，实际为 {value}"))?
                .parse(),
        }
    }
}

/// 滑动效果
#[derive(Debug, Clone, Copy, Default)]
pub struct Slide;

fn start_key(index: usize) -> String {
    format!("{index}.start")
}

fn shift_key(index: usize) -> String {
    format!("{index}.shift")
}

impl EffectDefinition for Slide {
    fn name(&self) -> &str {
        "slide"
    }

    fn defaults(&self) -> StepOptions {
        StepOptions::new().entrance(true).param("from", "left")
    }

    fn validate(&self, options: &ResolvedOptions) -> Result<(), StepError> {
        SlideFrom::from_options(options)
            .map(|_| ())
            .map_err(|message| StepError::InvalidOption {
                effect: self.name().to_string(),
                option: "from".to_string(),
                message,
            })
    }

    fn before_state(&self, ctx: &EffectContext) {
        let now = ctx.now();
        for (i, element) in ctx.elements.iter().enumerate() {
            ctx.store.set_vec2(&start_key(i), element.translate_at(now));
        }
    }

    fn prepare(&self, ctx: &EffectContext) {
        // validate 已经保证了参数合法
        let from = SlideFrom::from_options(&ctx.options).unwrap_or_default();
        let bounds = ctx.stage.bounds();
        let now = ctx.now();
        let forward = ctx.direction.is_forward();

        for (i, element) in ctx.elements.iter().enumerate() {
            if forward {
                if let Some(start) = ctx.store.get_vec2(&start_key(i)) {
                    element.set_translate(start);
                }
            }

            let position = ctx.stage.offset(element, now);
            let rect = element.rect();
            let shift = match from {
                SlideFrom::Left => Vec2::new(-(rect.width + position.x), 0.0),
                SlideFrom::Right => Vec2::new(bounds.visible_width - position.x, 0.0),
                SlideFrom::Top => Vec2::new(0.0, -(rect.height + position.y)),
                SlideFrom::Bottom => Vec2::new(0.0, bounds.visible_height - position.y),
            };

            if forward {
                element.set_translate(element.translate_at(now) + shift);
            }

            ctx.store.set_vec2(&shift_key(i), shift);
        }
    }

    fn run(&self, ctx: &EffectContext, done: Completion) {
        let now = ctx.now();
        let sign = -f32::from(ctx.direction.sign());

        for (i, element) in ctx.elements.iter().enumerate() {
            let shift = ctx.store.get_vec2(&shift_key(i)).unwrap_or_default();
            let target = element.translate_at(now) + shift * sign;
            element.translate_to(target, now, ctx.duration, ctx.easing);
        }

        ctx.complete_after(ctx.duration, done);
    }
}
