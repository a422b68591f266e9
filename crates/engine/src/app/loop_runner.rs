use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use super::audio::AudioSink;
use super::metrics::{LoopMetricsSummary, MetricsAccumulator};
use super::scene::{SceneCommand, SceneMachine, ScenePhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPacing {
    /// Wall-clock frame deltas, slept to `target_tps`.
    Realtime,
    /// Nominal `1 / target_tps` deltas, no sleeping.
    Simulated,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks: Option<u64>,
    pub metrics_log_interval: Duration,
    pub pacing: LoopPacing,
    pub stop_phases: Vec<ScenePhase>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks: None,
            metrics_log_interval: Duration::from_secs(1),
            pacing: LoopPacing::Simulated,
            stop_phases: vec![ScenePhase::EndScreen],
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no scene registered for the initial phase {0:?}")]
    MissingInitialScene(ScenePhase),
    #[error("tick budget must allow at least one tick")]
    ZeroTickBudget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopReport {
    pub ticks: u64,
    pub simulated_seconds: f64,
    pub final_phase: ScenePhase,
    pub metrics: LoopMetricsSummary,
}

/// Single-threaded cooperative loop: one scene update per iteration with a
/// variable elapsed-time parameter. Pending world changes are applied and
/// audio requests forwarded before any phase switch is honoured.
pub fn run_app(
    config: LoopConfig,
    mut scenes: SceneMachine,
    audio: &mut dyn AudioSink,
) -> Result<LoopReport, AppError> {
    if !scenes.has_scene(scenes.active_phase()) {
        return Err(AppError::MissingInitialScene(scenes.active_phase()));
    }
    if config.max_ticks == Some(0) {
        return Err(AppError::ZeroTickBudget);
    }

    let target_tps = config.target_tps.max(1);
    let nominal_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));

    scenes.load_active();
    scenes.apply_pending_active();
    for request in scenes.drain_audio_requests_active() {
        audio.handle(request);
    }
    info!(
        phase = ?scenes.active_phase(),
        entity_count = scenes.active_world().map_or(0, |world| world.entity_count()),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        pacing = ?config.pacing,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_frame_instant = Instant::now();
    let mut ticks = 0u64;
    let mut simulated_seconds = 0.0f64;

    loop {
        if config.stop_phases.contains(&scenes.active_phase()) {
            info!(phase = ?scenes.active_phase(), "stop_phase_reached");
            break;
        }
        if config.max_ticks.is_some_and(|limit| ticks >= limit) {
            info!(ticks, "tick_budget_exhausted");
            break;
        }

        let frame_dt = match config.pacing {
            LoopPacing::Simulated => nominal_dt,
            LoopPacing::Realtime => {
                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;
                clamp_frame_delta(raw_frame_dt, max_frame_delta)
            }
        };
        let dt_seconds = frame_dt.as_secs_f32();

        let tick_start = Instant::now();
        let command = scenes.update_active(dt_seconds);
        scenes.apply_pending_active();
        for request in scenes.drain_audio_requests_active() {
            audio.handle(request);
        }

        let switched = match command {
            SceneCommand::SwitchTo(next_phase) => scenes.switch_to(next_phase),
            SceneCommand::None => false,
        };
        if switched {
            scenes.apply_pending_active();
            for request in scenes.drain_audio_requests_active() {
                audio.handle(request);
            }
            info!(
                phase = ?scenes.active_phase(),
                entity_count = scenes.active_world().map_or(0, |world| world.entity_count()),
                "scene_switched"
            );
        }

        let tick_cost = tick_start.elapsed();
        ticks = ticks.saturating_add(1);
        simulated_seconds += f64::from(dt_seconds);
        metrics_accumulator.record_tick(tick_cost, dt_seconds);

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                simulated_seconds = snapshot.simulated_seconds,
                phase = ?scenes.active_phase(),
                "loop_metrics"
            );
        }

        if config.pacing == LoopPacing::Realtime {
            let pacing_sleep = compute_pacing_sleep(tick_cost, nominal_dt);
            if pacing_sleep > Duration::ZERO {
                thread::sleep(pacing_sleep);
            }
        }
    }

    let final_phase = scenes.active_phase();
    scenes.shutdown_all();
    let metrics = metrics_accumulator.summary();
    info!(
        ticks,
        simulated_seconds,
        mean_tick_time_ms = metrics.mean_tick_time_ms,
        peak_tick_time_ms = metrics.peak_tick_time_ms,
        "shutdown"
    );

    Ok(LoopReport {
        ticks,
        simulated_seconds,
        final_phase,
        metrics,
    })
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pacing_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::audio::{AudioRequest, BgmTrack, LoggingAudioSink};
    use crate::app::scene::Scene;
    use crate::app::world::SceneWorld;

    struct CountdownScene {
        remaining_ticks: u32,
    }

    impl Scene for CountdownScene {
        fn load(&mut self, world: &mut SceneWorld) {
            world.push_audio_request(AudioRequest::ChangeBgm(BgmTrack::GameScene));
        }

        fn update(&mut self, _dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
            self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
            if self.remaining_ticks == 0 {
                world.push_audio_request(AudioRequest::ResetAudio);
                world.push_audio_request(AudioRequest::ChangeBgm(BgmTrack::EndScene));
                return SceneCommand::SwitchTo(ScenePhase::EndScreen);
            }
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn pacing_sleep_never_underflows() {
        let target = Duration::from_millis(16);
        assert_eq!(
            compute_pacing_sleep(Duration::from_millis(20), target),
            Duration::ZERO
        );
        assert_eq!(
            compute_pacing_sleep(Duration::from_millis(6), target),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn run_stops_on_end_screen_and_forwards_audio() {
        let mut scenes = SceneMachine::new(ScenePhase::Game);
        scenes.register(
            ScenePhase::Game,
            Box::new(CountdownScene { remaining_ticks: 3 }),
        );
        let mut audio = LoggingAudioSink::default();

        let report = run_app(LoopConfig::default(), scenes, &mut audio).expect("run");

        assert_eq!(report.ticks, 3);
        assert_eq!(report.final_phase, ScenePhase::EndScreen);
        assert!((report.simulated_seconds - 3.0 / 60.0).abs() < 1e-6);
        assert_eq!(audio.current_bgm(), Some(BgmTrack::EndScene));
        assert_eq!(audio.reset_count(), 1);
    }

    #[test]
    fn run_respects_tick_budget() {
        let mut scenes = SceneMachine::new(ScenePhase::Game);
        scenes.register(
            ScenePhase::Game,
            Box::new(CountdownScene {
                remaining_ticks: 1_000,
            }),
        );
        let mut audio = LoggingAudioSink::default();
        let config = LoopConfig {
            max_ticks: Some(10),
            ..LoopConfig::default()
        };

        let report = run_app(config, scenes, &mut audio).expect("run");
        assert_eq!(report.ticks, 10);
        assert_eq!(report.final_phase, ScenePhase::Game);
        assert_eq!(audio.current_bgm(), Some(BgmTrack::GameScene));
    }

    #[test]
    fn report_carries_run_metrics() {
        let mut scenes = SceneMachine::new(ScenePhase::Game);
        scenes.register(
            ScenePhase::Game,
            Box::new(CountdownScene { remaining_ticks: 5 }),
        );
        let mut audio = LoggingAudioSink::default();
        let config = LoopConfig {
            metrics_log_interval: Duration::from_secs(3_600),
            ..LoopConfig::default()
        };

        let report = run_app(config, scenes, &mut audio).expect("run");
        assert_eq!(report.ticks, 5);
        assert_eq!(report.metrics.windows, 0);
        assert_eq!(report.metrics.last_window, None);
        assert!(report.metrics.mean_tick_time_ms >= 0.0);
        assert!(report.metrics.peak_tick_time_ms >= report.metrics.mean_tick_time_ms);
    }

    #[test]
    fn run_rejects_missing_initial_scene() {
        let scenes = SceneMachine::new(ScenePhase::Game);
        let mut audio = LoggingAudioSink::default();
        let error = run_app(LoopConfig::default(), scenes, &mut audio).expect_err("err");
        assert!(matches!(
            error,
            AppError::MissingInitialScene(ScenePhase::Game)
        ));
    }

    #[test]
    fn run_rejects_zero_tick_budget() {
        let mut scenes = SceneMachine::new(ScenePhase::Game);
        scenes.register(
            ScenePhase::Game,
            Box::new(CountdownScene { remaining_ticks: 1 }),
        );
        let mut audio = LoggingAudioSink::default();
        let config = LoopConfig {
            max_ticks: Some(0),
            ..LoopConfig::default()
        };
        let error = run_app(config, scenes, &mut audio).expect_err("err");
        assert!(matches!(error, AppError::ZeroTickBudget));
    }
}
