//! # 播放集成测试
//!
//! 测试 Timeline → Scheduler → Step → Effect 的完整遍历链路。
//! 时间全部由虚拟时钟推进，不依赖真实的计时器。

use std::rc::Rc;

use debut_runtime::{
    Clock, DebutError, Direction, EffectRegistry, ElementHandle, FnEffect, Millis, PlaybackEvent,
    Rect, Stage, StageConfig, StepError, StepOptions, Timeline, Transport,
};

/// 创建测试用的时间轴
///
/// 除内置效果外还注册了两个探针效果：
/// - `probe`：在 `duration` 之后完成
/// - `stagger`：在目标元素 x 坐标对应的毫秒数之后完成
fn test_timeline() -> (Timeline, Clock) {
    let mut registry = EffectRegistry::with_builtins();
    registry.register(FnEffect::new("probe", |ctx, done| {
        ctx.complete_after(ctx.duration, done);
    }));
    registry.register(FnEffect::new("stagger", |ctx, done| {
        ctx.complete_after(ctx.element().rect().x as Millis, done);
    }));

    let clock = Clock::new();
    let stage = Rc::new(Stage::unscaled(StageConfig::default()));
    (Timeline::new(registry, stage, clock.clone()), clock)
}

fn el(id: &str) -> ElementHandle {
    ElementHandle::new(id, Rect::new(100.0, 100.0, 50.0, 50.0))
}

fn probe(duration: Millis) -> StepOptions {
    StepOptions::new().duration(duration)
}

/// 提取 (步骤下标, 开始时刻)
fn started(events: &[PlaybackEvent]) -> Vec<(usize, Millis)> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::StepStarted { index, at, .. } => Some((*index, *at)),
            _ => None,
        })
        .collect()
}

/// 提取 (步骤下标, 完成时刻)
fn completed(events: &[PlaybackEvent]) -> Vec<(usize, Millis)> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::StepCompleted { index, at, .. } => Some((*index, *at)),
            _ => None,
        })
        .collect()
}

fn translate_x(element: &ElementHandle, clock: &Clock) -> f32 {
    element.translate_at(clock.now()).x
}

/// 测试 step → after(延迟 100) → with 组成的簇
#[test]
fn test_after_with_cluster_timing() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("a")], "probe", probe(500))
        .unwrap()
        .after_previous([el("b")], "probe", probe(300).delay(100))
        .unwrap()
        .with_previous([el("c")], "probe", probe(200))
        .unwrap();

    assert_eq!(tl.advance(), Transport::Moved { from: 0, to: 3 });
    // 游标立即落到簇边界，即使动画还在进行
    assert_eq!(tl.cursor(), 3);
    assert!(tl.is_busy());

    tl.settle();
    assert!(!tl.is_busy());

    let events = tl.drain_events();
    assert_eq!(started(&events), vec![(0, 0), (1, 600), (2, 600)]);
    assert_eq!(completed(&events), vec![(0, 500), (2, 800), (1, 900)]);
    assert!(events.contains(&PlaybackEvent::EndReached {
        direction: Direction::Forward,
        at: 800,
    }));
    assert!(events.contains(&PlaybackEvent::CursorMoved { from: 0, to: 3 }));

    // 倒退：c 与 b 同时开始，b 完成后等待自身的 100ms 延迟，再倒放 a
    let t0 = clock.now();
    assert_eq!(t0, 900);
    assert_eq!(tl.rewind(), Transport::Moved { from: 3, to: 0 });
    assert_eq!(tl.cursor(), 0);
    tl.settle();

    let events = tl.drain_events();
    assert_eq!(started(&events), vec![(2, t0), (1, t0), (0, t0 + 400)]);
    assert_eq!(
        completed(&events),
        vec![(2, t0 + 200), (1, t0 + 300), (0, t0 + 900)]
    );
    assert!(events.contains(&PlaybackEvent::EndReached {
        direction: Direction::Backward,
        at: t0 + 900,
    }));
    assert!(!tl.is_busy());
}

/// 测试倒退时 after 关系按当前步骤的延迟等待
#[test]
fn test_rewind_after_uses_own_delay() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("a")], "probe", probe(500))
        .unwrap()
        .after_previous([el("b")], "probe", probe(300).delay(100))
        .unwrap();

    tl.advance();
    tl.settle();
    tl.drain_events();

    let t0 = clock.now();
    assert_eq!(tl.rewind(), Transport::Moved { from: 2, to: 0 });
    tl.settle();

    let events = tl.drain_events();
    // b 先倒放 300ms，再等 100ms，然后 a 倒放
    assert_eq!(started(&events), vec![(1, t0), (0, t0 + 400)]);
    assert_eq!(clock.now(), t0 + 900);
}

/// 测试 with 步骤倒放时与正向时间线镜像对称
#[test]
fn test_with_pair_mirrors_in_reverse() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("a")], "probe", probe(200))
        .unwrap()
        .with_previous([el("b")], "probe", probe(200).delay(300))
        .unwrap();

    tl.advance();
    tl.settle();
    let forward = tl.drain_events();
    assert_eq!(started(&forward), vec![(0, 0), (1, 300)]);
    assert_eq!(completed(&forward), vec![(0, 200), (1, 500)]);

    let t0 = clock.now();
    tl.rewind();
    tl.settle();
    let backward = tl.drain_events();

    // 正向较晚结束的 b 倒放时先开始
    assert_eq!(started(&backward), vec![(1, t0), (0, t0 + 300)]);
    assert_eq!(completed(&backward), vec![(1, t0 + 200), (0, t0 + 500)]);
}

/// 测试带延迟的簇起点与 with 步骤倒放时同时结束
#[test]
fn test_with_pair_finishes_together_in_reverse() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("b")], "probe", probe(300).delay(200))
        .unwrap()
        .with_previous([el("a")], "probe", probe(500))
        .unwrap();

    tl.advance();
    tl.settle();
    let forward = tl.drain_events();
    assert_eq!(started(&forward), vec![(0, 200), (1, 200)]);

    let t0 = clock.now();
    tl.rewind();
    tl.settle();
    let backward = tl.drain_events();

    // a 先倒放，b 延迟 max(0 + 500 - 300, 0) = 200ms
    assert_eq!(started(&backward), vec![(1, t0), (0, t0 + 200)]);
    let finished: Vec<Millis> = completed(&backward).iter().map(|&(_, at)| at).collect();
    assert_eq!(finished, vec![t0 + 500, t0 + 500]);
}

/// 测试 with 步骤倒放时，延迟公式的结果不会小于 0
#[test]
fn test_with_reverse_delay_saturates_at_zero() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("a")], "probe", probe(500))
        .unwrap()
        .with_previous([el("b")], "probe", probe(200))
        .unwrap();

    tl.advance();
    tl.settle();
    tl.drain_events();

    let t0 = clock.now();
    tl.rewind();
    // 两个步骤同时开始倒放
    let events = tl.drain_events();
    assert_eq!(started(&events), vec![(1, t0), (0, t0)]);
    tl.settle();
}

/// 测试多个目标的步骤在最后一个目标完成时恰好完成一次
#[test]
fn test_fan_out_joins_all_targets() {
    for n in 1..=5usize {
        let (mut tl, clock) = test_timeline();
        let targets: Vec<ElementHandle> = (1..=n)
            .map(|i| {
                ElementHandle::new(format!("t{i}"), Rect::new(100.0 * i as f32, 0.0, 10.0, 10.0))
            })
            .collect();
        tl.step(targets, "stagger", StepOptions::new()).unwrap();

        tl.advance();
        clock.advance(100 * n as Millis - 1);
        assert!(completed(&tl.drain_events()).is_empty(), "n = {n}");
        assert!(tl.is_busy());

        clock.advance(1);
        let events = tl.drain_events();
        assert_eq!(completed(&events), vec![(0, 100 * n as Millis)], "n = {n}");
        assert!(!tl.is_busy());
    }
}

/// 测试不拆分目标时只有一个目标绑定
#[test]
fn test_grouped_targets_share_one_binding() {
    let (mut tl, _clock) = test_timeline();
    tl.step(
        [el("a"), el("b"), el("c")],
        "slide",
        StepOptions::new().separate_elements(false),
    )
    .unwrap();

    assert_eq!(tl.steps()[0].bindings().len(), 1);
    assert_eq!(tl.steps()[0].elements().count(), 3);
}

/// 测试入场元素的可见性生命周期
#[test]
fn test_entrance_visibility_lifecycle() {
    let (mut tl, clock) = test_timeline();
    let title = el("title");
    tl.step([title.clone()], "slide", StepOptions::new()).unwrap();

    // 构造时就被隐藏
    assert!(!title.is_visible());

    // 正向：立即显示，从左侧滑入
    tl.advance();
    assert!(title.is_visible());
    assert!((translate_x(&title, &clock) + 150.0).abs() < 1e-3);
    tl.settle();
    assert!(translate_x(&title, &clock).abs() < 1e-3);

    // 倒退：动画期间仍然可见，完成后隐藏
    tl.rewind();
    assert!(title.is_visible());
    tl.settle();
    assert!(!title.is_visible());
    assert!((translate_x(&title, &clock) + 150.0).abs() < 1e-3);

    // 再次正向：回到原位
    tl.advance();
    tl.settle();
    assert!(title.is_visible());
    assert!(translate_x(&title, &clock).abs() < 1e-3);
}

/// 测试未渲染的目标不参与可见性切换
#[test]
fn test_detached_target_is_never_hidden() {
    let (mut tl, _clock) = test_timeline();
    let data = ElementHandle::detached("counter");
    tl.step([data.clone()], "appear", StepOptions::new()).unwrap();
    assert!(data.is_visible());
    assert!(!tl.steps()[0].is_hidden_capable());

    tl.advance();
    tl.settle();
    tl.rewind();
    tl.settle();
    assert!(data.is_visible());
}

/// 测试 reverse 选项把入场步骤变成退场步骤
#[test]
fn test_reversed_step_plays_as_exit() {
    let (mut tl, clock) = test_timeline();
    let logo = el("logo");
    tl.step([logo.clone()], "slide", StepOptions::new().reverse(true))
        .unwrap();

    // 反向步骤构造时不会隐藏
    assert!(logo.is_visible());

    tl.advance();
    assert!(logo.is_visible());
    tl.settle();
    assert!(!logo.is_visible());
    assert!((translate_x(&logo, &clock) + 150.0).abs() < 1e-3);

    tl.rewind();
    assert!(logo.is_visible());
    tl.settle();
    assert!(translate_x(&logo, &clock).abs() < 1e-3);
}

/// 测试完整的前进/后退往返
#[test]
fn test_round_trip_lands_on_cluster_starts() {
    let (mut tl, _clock) = test_timeline();
    let elements: Vec<ElementHandle> = ["a", "b", "c", "d", "e"].into_iter().map(el).collect();
    tl.step([elements[0].clone()], "slide", StepOptions::new())
        .unwrap()
        .with_previous([elements[1].clone()], "appear", StepOptions::new())
        .unwrap()
        .step([elements[2].clone()], "slide", StepOptions::new().param("from", "top"))
        .unwrap()
        .after_previous([elements[3].clone()], "appear", StepOptions::new())
        .unwrap()
        .step([elements[4].clone()], "slide", StepOptions::new().param("from", "right"))
        .unwrap();

    assert_eq!(tl.cluster_starts(), vec![0, 2, 4]);

    let mut cursors = vec![tl.cursor()];
    while tl.advance().is_moved() {
        tl.settle();
        cursors.push(tl.cursor());
    }
    assert_eq!(cursors, vec![0, 2, 4, 5]);
    assert!(elements.iter().all(ElementHandle::is_visible));

    let mut cursors = vec![tl.cursor()];
    while tl.rewind().is_moved() {
        tl.settle();
        cursors.push(tl.cursor());
    }
    assert_eq!(cursors, vec![5, 4, 2, 0]);
    assert!(elements.iter().all(|e| !e.is_visible()));
}

/// 测试两端的请求是幂等的
#[test]
fn test_requests_at_bounds_are_noops() {
    let (mut tl, _clock) = test_timeline();
    tl.step([el("a")], "appear", StepOptions::new()).unwrap();

    assert_eq!(tl.rewind(), Transport::AtBound);
    assert!(tl.drain_events().is_empty());

    tl.advance();
    tl.settle();
    tl.drain_events();

    assert_eq!(tl.advance(), Transport::AtBound);
    assert_eq!(tl.advance(), Transport::AtBound);
    assert_eq!(tl.cursor(), 1);
    assert!(tl.drain_events().is_empty());
}

/// 测试遍历进行中的请求被拒绝
#[test]
fn test_request_while_busy_is_rejected() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("a")], "probe", probe(500))
        .unwrap()
        .step([el("b")], "probe", probe(500))
        .unwrap();

    assert_eq!(tl.advance(), Transport::Moved { from: 0, to: 1 });
    assert_eq!(tl.advance(), Transport::Busy);
    assert_eq!(tl.rewind(), Transport::Busy);
    assert_eq!(tl.goto(2), Transport::Busy);
    assert_eq!(tl.cursor(), 1);

    clock.advance(500);
    assert_eq!(tl.advance(), Transport::Moved { from: 1, to: 2 });
}

/// 测试簇起点步骤的延迟在正向时生效，倒退时忽略
#[test]
fn test_cluster_delay_only_applies_forward() {
    let (mut tl, clock) = test_timeline();
    tl.step([el("a")], "probe", probe(100).delay(250)).unwrap();

    tl.advance();
    // 延迟期间同样算作忙碌
    assert!(tl.is_busy());
    tl.settle();
    assert_eq!(started(&tl.drain_events()), vec![(0, 250)]);

    let t0 = clock.now();
    tl.rewind();
    assert_eq!(started(&tl.drain_events()), vec![(0, t0)]);
    tl.settle();
}

/// 测试 goto 不播放动画，直接落到簇起点
#[test]
fn test_goto_jumps_without_animation() {
    let (mut tl, clock) = test_timeline();
    let elements: Vec<ElementHandle> = ["a", "b", "c", "d"].into_iter().map(el).collect();
    tl.step([elements[0].clone()], "slide", StepOptions::new().delay(300))
        .unwrap()
        .step([elements[1].clone()], "slide", StepOptions::new())
        .unwrap()
        .after_previous([elements[2].clone()], "slide", StepOptions::new().delay(200))
        .unwrap()
        .step([elements[3].clone()], "slide", StepOptions::new())
        .unwrap();

    assert_eq!(tl.goto(3), Transport::Moved { from: 0, to: 3 });
    assert_eq!(clock.now(), 0);
    assert!(!tl.is_busy());
    for element in &elements[..3] {
        assert!(element.is_visible());
        assert!(translate_x(element, &clock).abs() < 1e-3);
    }
    assert!(!elements[3].is_visible());

    // 落在簇中间的目标退回到该簇的起点
    assert_eq!(tl.goto(2), Transport::Moved { from: 3, to: 1 });
    assert!(elements[0].is_visible());
    assert!(!elements[1].is_visible());
    assert!(!elements[2].is_visible());

    assert_eq!(tl.goto(1), Transport::AtBound);
    assert_eq!(tl.goto(99), Transport::Moved { from: 1, to: 4 });
    assert!(elements.iter().all(ElementHandle::is_visible));
    assert_eq!(tl.goto(0), Transport::Moved { from: 4, to: 0 });
    assert!(elements.iter().all(|e| !e.is_visible()));
}

/// 测试配置错误在编排阶段暴露
#[test]
fn test_configuration_errors_surface_at_authoring() {
    let (mut tl, _clock) = test_timeline();

    let err = tl.step([el("a")], "wobble", StepOptions::new()).err();
    assert!(matches!(
        err,
        Some(DebutError::Step(StepError::UnknownEffect { ref name })) if name == "wobble"
    ));

    let err = tl
        .step(Vec::<ElementHandle>::new(), "appear", StepOptions::new())
        .err();
    assert!(matches!(
        err,
        Some(DebutError::Step(StepError::EmptyTargets { .. }))
    ));

    let err = tl
        .step([el("a")], "slide", StepOptions::new().param("from", "nowhere"))
        .err();
    assert!(matches!(
        err,
        Some(DebutError::Step(StepError::InvalidOption { .. }))
    ));

    let err = tl.after_previous([el("a")], "appear", StepOptions::new()).err();
    assert!(matches!(
        err,
        Some(DebutError::Step(StepError::NoPreviousStep { .. }))
    ));

    assert!(tl.is_empty());
}

/// 测试延迟把时钟推到时间尽头时动画仍能正常结束
#[test]
fn test_huge_delay_saturates_at_end_of_time() {
    let (mut tl, clock) = test_timeline();
    let a = el("a");
    tl.step([a.clone()], "slide", StepOptions::new().delay(Millis::MAX)).unwrap();

    tl.advance();
    tl.settle();

    assert_eq!(clock.now(), Millis::MAX);
    assert!(a.is_visible());
    assert!(translate_x(&a, &clock).abs() < 1e-3);
    assert_eq!(completed(&tl.drain_events()), vec![(0, Millis::MAX)]);
    assert!(!tl.is_busy());
}
