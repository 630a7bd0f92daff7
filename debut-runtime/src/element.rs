//! # Element 模块
//!
//! 步骤作用的视觉元素模型。
//!
//! 运行时不负责渲染，只维护元素的可见性与位移状态，
//! 宿主层在绘制时按时钟时间采样即可。

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::easing::Easing;

/// 二维向量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// 创建新的向量
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 零向量
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// 线性插值
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Self) -> Self::Output {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Self::Output {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// 布局矩形（演示坐标系）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 左上角
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// 可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// 一段进行中的位移
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub from: Vec2,
    pub to: Vec2,
    /// 开始时刻
    pub start: Millis,
    /// 时长（毫秒）
    pub duration: Millis,
    pub easing: Easing,
}

impl Motion {
    /// 在 `now` 时刻的位移
    pub fn value_at(&self, now: Millis) -> Vec2 {
        if self.duration == 0 || self.is_finished(now) {
            return self.to;
        }
        let elapsed = now.saturating_sub(self.start) as f32;
        let progress = self.easing.apply(elapsed / self.duration as f32);
        self.from.lerp(self.to, progress)
    }

    /// 在 `now` 时刻是否已结束
    pub fn is_finished(&self, now: Millis) -> bool {
        now >= self.start.saturating_add(self.duration)
    }
}

#[derive(Debug)]
struct ElementData {
    id: String,
    rendered: bool,
    rect: Rect,
    visibility: Visibility,
    translate: Vec2,
    motion: Option<Motion>,
}

/// 元素句柄
///
/// 克隆得到的句柄指向同一个元素；时间轴、步骤与宿主层共享它。
#[derive(Clone)]
pub struct ElementHandle {
    inner: Rc<RefCell<ElementData>>,
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("ElementHandle")
            .field("id", &data.id)
            .field("rendered", &data.rendered)
            .field("visibility", &data.visibility)
            .finish()
    }
}

impl PartialEq for ElementHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ElementHandle {
    /// 创建一个已渲染的元素
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self::build(id.into(), true, rect)
    }

    /// 创建一个不在画面上的目标（例如纯数据对象）
    ///
    /// 这类目标永远不会被入场逻辑隐藏。
    pub fn detached(id: impl Into<String>) -> Self {
        Self::build(id.into(), false, Rect::default())
    }

    fn build(id: String, rendered: bool, rect: Rect) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ElementData {
                id,
                rendered,
                rect,
                visibility: Visibility::Visible,
                translate: Vec2::zero(),
                motion: None,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.inner.borrow().id.clone()
    }

    pub fn is_rendered(&self) -> bool {
        self.inner.borrow().rendered
    }

    pub fn rect(&self) -> Rect {
        self.inner.borrow().rect
    }

    pub fn visibility(&self) -> Visibility {
        self.inner.borrow().visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility() == Visibility::Visible
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.inner.borrow_mut().visibility = visibility;
    }

    /// `now` 时刻的位移
    pub fn translate_at(&self, now: Millis) -> Vec2 {
        let data = self.inner.borrow();
        match &data.motion {
            Some(motion) => motion.value_at(now),
            None => data.translate,
        }
    }

    /// 直接设置位移，取消进行中的位移动画
    pub fn set_translate(&self, value: Vec2) {
        let mut data = self.inner.borrow_mut();
        data.translate = value;
        data.motion = None;
    }

    /// 从 `now` 时刻的位移开始，在 `duration` 内移动到 `to`
    pub fn translate_to(&self, to: Vec2, now: Millis, duration: Millis, easing: Easing) {
        let from = self.translate_at(now);
        let mut data = self.inner.borrow_mut();
        data.translate = to;
        data.motion = (duration > 0).then_some(Motion {
            from,
            to,
            start: now,
            duration,
            easing,
        });
    }

    /// `now` 时刻是否仍在移动
    pub fn is_moving(&self, now: Millis) -> bool {
        self.inner
            .borrow()
            .motion
            .is_some_and(|motion| !motion.is_finished(now))
    }
}
