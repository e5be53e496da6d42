use approx::assert_relative_eq;
use retroboy_sync::prelude::*;
use retroboy_sync::test_utils::{ManualSink, ManualTimers, ScriptedCore, SinkProbe};

type Controller = PlaybackController<ScriptedCore, ManualSink, ManualTimers>;

fn start(core: ScriptedCore, probe: &SinkProbe) -> Controller {
    let mut controller = PlaybackController::new(
        core,
        ManualTimers::new(),
        probe.factory(),
        SyncConfig::default(),
    )
    .unwrap();
    controller
        .load(&[0; 0x150], &EmulatorSettings::default())
        .unwrap();
    controller
}

/// Let the oldest timer run out on the probe clock, plus `jitter` seconds of
/// host lateness, then deliver it. Returns false once nothing is armed.
fn run_timer(controller: &mut Controller, probe: &SinkProbe, jitter: f64) -> bool {
    let Some((delay, timer)) = controller.timers_mut().pop() else {
        return false;
    };
    probe.advance(delay.as_secs_f64() + jitter);
    controller.on_timer(timer).unwrap();
    true
}

/// Small deterministic jitter in [0, 5) ms
struct Jitter(u64);

impl Jitter {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % 5000) as f64 / 1_000_000.0
    }
}

#[test]
fn three_buffers_from_ten_seconds() {
    let probe = SinkProbe::new(10.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(3, 4800), &probe);

    controller.play().unwrap();
    while run_timer(&mut controller, &probe, 0.0) {}

    let starts = probe.start_times();
    assert_eq!(starts.len(), 3);
    for (actual, expected) in starts.iter().zip([10.0, 10.1, 10.2]) {
        assert_relative_eq!(*actual, expected, epsilon = 1e-9);
    }
    assert_eq!(controller.core().steps, 4);
    assert_eq!(controller.stats().buffers_scheduled, 3);
    assert_eq!(controller.stats().late_buffers, 0);
    assert_eq!(controller.status(), PlaybackStatus::Playing);
}

#[test]
fn timers_fire_ahead_of_each_buffer() {
    let probe = SinkProbe::new(10.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(3, 4800), &probe);
    controller.play().unwrap();

    // The first buffer starts right away, so the next step is due at once
    let (first_delay, first) = controller.timers_mut().pop().unwrap();
    assert_eq!(first_delay, std::time::Duration::ZERO);
    controller.on_timer(first).unwrap();

    // 100 ms until the second buffer starts, minus the 15 ms gap
    let (second_delay, _) = controller.timers_mut().pop().unwrap();
    assert_relative_eq!(second_delay.as_secs_f64(), 0.085, epsilon = 1e-6);
}

#[test]
fn start_times_never_drift() {
    let frames = [4800, 2400, 960, 4800, 1200, 3600, 480, 4800, 2400, 1600];
    let mut core = ScriptedCore::new();
    for &count in &frames {
        core.push_buffers(1, count);
    }

    let probe = SinkProbe::new(3.25, 44_100);
    let mut controller = start(core, &probe);
    let mut jitter = Jitter(0x5eed);

    controller.play().unwrap();
    while run_timer(&mut controller, &probe, jitter.next()) {}

    let starts = probe.start_times();
    assert_eq!(starts.len(), frames.len());

    let mut expected = 3.25;
    for (start, &count) in starts.iter().zip(&frames) {
        assert_relative_eq!(*start, expected, epsilon = 1e-9);
        expected += count as f64 / 44_100.0;
    }
}

#[test]
fn jitter_beyond_buffer_length_keeps_the_timeline() {
    let probe = SinkProbe::new(0.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(4, 480), &probe);

    controller.play().unwrap();
    // Every timer is 50 ms late against 10 ms buffers
    while run_timer(&mut controller, &probe, 0.05) {}

    let starts = probe.start_times();
    for (i, start) in starts.iter().enumerate() {
        assert_relative_eq!(*start, i as f64 * 0.01, epsilon = 1e-9);
    }
    assert_eq!(controller.stats().late_buffers, 3);
}

#[test]
fn pause_then_resume_steps_once() {
    let probe = SinkProbe::new(1.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(10, 4800), &probe);
    controller.play().unwrap();
    run_timer(&mut controller, &probe, 0.0);

    let before = controller.core().steps;
    controller.pause().unwrap();
    controller.resume().unwrap();
    assert_eq!(controller.core().steps, before + 1);

    // Both the pre-pause timer and the resumed one are queued; only one steps
    run_timer(&mut controller, &probe, 0.0);
    run_timer(&mut controller, &probe, 0.0);
    assert_eq!(controller.core().steps, before + 2);
}

#[test]
fn double_reset_resets_core_once() {
    let probe = SinkProbe::new(0.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(10, 4800), &probe);
    controller.play().unwrap();

    assert_eq!(controller.reset().unwrap(), ResetOutcome::Deferred);
    assert_eq!(controller.reset().unwrap(), ResetOutcome::Deferred);
    assert_eq!(controller.core().resets, 0);

    while run_timer(&mut controller, &probe, 0.0) {}
    assert_eq!(controller.core().resets, 1);
    assert_eq!(controller.status(), PlaybackStatus::Idle);
    // Audio already handed to the sink is left alone
    assert_eq!(probe.scheduled().len(), 1);
}

#[test]
fn empty_buffer_leaves_cursor_alone() {
    let mut core = ScriptedCore::with_buffers(1, 4800);
    core.push_buffers(1, 0);
    let probe = SinkProbe::new(5.0, 48_000);
    let mut controller = start(core, &probe);

    controller.play().unwrap();
    let cursor = controller.cursor().next_start_time();
    run_timer(&mut controller, &probe, 0.0);

    assert_eq!(controller.cursor().next_start_time(), cursor);
    assert_eq!(probe.scheduled().len(), 1);
}

#[test]
fn stale_timer_cannot_touch_new_session() {
    let probe = SinkProbe::new(0.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(10, 4800), &probe);

    controller.play().unwrap();
    let (_, old_timer) = controller.timers_mut().pop().unwrap();
    controller.pause().unwrap();
    controller.reset().unwrap();

    controller
        .load(&[0; 0x150], &EmulatorSettings::default())
        .unwrap();
    probe.set_time(20.0);
    controller.play().unwrap();

    let steps = controller.core().steps;
    let cursor = controller.cursor().next_start_time();
    let scheduled = probe.scheduled().len();
    let armed = controller.timers().pending();
    let session = controller.session().cloned();

    controller.on_timer(old_timer).unwrap();

    assert_eq!(controller.core().steps, steps);
    assert_eq!(controller.cursor().next_start_time(), cursor);
    assert_eq!(probe.scheduled().len(), scheduled);
    assert_eq!(controller.timers().pending(), armed);
    assert_eq!(controller.session().cloned(), session);
    assert_eq!(controller.stats().stale_timers, 1);

    // The new session's own timer still works
    assert!(run_timer(&mut controller, &probe, 0.0));
    assert_eq!(controller.core().steps, steps + 1);
}

#[test]
fn halted_session_recovers_on_play() {
    let probe = SinkProbe::new(0.0, 48_000);
    let mut controller = start(ScriptedCore::with_buffers(10, 4800), &probe);
    controller.play().unwrap();

    probe.fail_next(SinkError::Device("stream invalidated".into()));
    let (_, timer) = controller.timers_mut().pop().unwrap();
    assert!(matches!(
        controller.on_timer(timer),
        Err(PlaybackError::Halted(_))
    ));
    assert_eq!(controller.status(), PlaybackStatus::Idle);

    probe.set_time(7.0);
    controller.play().unwrap();
    assert_eq!(probe.opens(), 2);
    assert_eq!(probe.start_times().last().copied(), Some(7.0));
}
