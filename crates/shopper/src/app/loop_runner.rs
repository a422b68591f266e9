use std::process::ExitCode;

use engine::{run_app, LoggingAudioSink};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub fn run(app: AppWiring) -> ExitCode {
    let mut audio = LoggingAudioSink::default();
    match run_app(app.config, app.scenes, &mut audio) {
        Ok(report) => {
            info!(
                seed = app.seed,
                ticks = report.ticks,
                simulated_seconds = report.simulated_seconds,
                final_phase = ?report.final_phase,
                bgm = ?audio.current_bgm(),
                mean_tick_time_ms = report.metrics.mean_tick_time_ms,
                peak_tick_time_ms = report.metrics.peak_tick_time_ms,
                metric_windows = report.metrics.windows,
                last_tps = ?report.metrics.last_window.map(|window| window.tps),
                "match_run_complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
