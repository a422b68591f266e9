use engine::{LoopConfig, LoopPacing, SceneMachine};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{ConfigError, LaunchSettings};
use super::gameplay;

pub struct AppWiring {
    pub config: LoopConfig,
    pub scenes: SceneMachine,
    pub seed: u64,
}

pub fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Shopper Startup ===");

    let launch = LaunchSettings::from_env()?;
    Ok(wire(launch))
}

/// Turns resolved launch settings into a loop configuration and the scene
/// set for one match.
pub fn wire(launch: LaunchSettings) -> AppWiring {
    info!(
        config_path = ?launch.config_path,
        seed = launch.seed,
        participants = launch.match_config.participants.len(),
        match_length_seconds = launch.match_config.match_length_seconds,
        "match_config_resolved"
    );

    let scenes = gameplay::build_scene_machine(&launch.match_config, launch.seed);
    let config = LoopConfig {
        max_ticks: launch.max_ticks,
        pacing: if launch.realtime {
            LoopPacing::Realtime
        } else {
            LoopPacing::Simulated
        },
        ..LoopConfig::default()
    };

    AppWiring {
        config,
        scenes,
        seed: launch.seed,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use engine::ScenePhase;

    use super::*;
    use crate::app::config::MatchConfig;

    fn launch(max_ticks: Option<u64>, realtime: bool) -> LaunchSettings {
        LaunchSettings {
            match_config: MatchConfig::default(),
            config_path: None,
            seed: 42,
            max_ticks,
            realtime,
        }
    }

    #[test]
    fn wiring_starts_in_game_with_end_screen_registered() {
        let app = wire(launch(Some(600), false));
        assert_eq!(app.scenes.active_phase(), ScenePhase::Game);
        assert!(app.scenes.has_scene(ScenePhase::Game));
        assert!(app.scenes.has_scene(ScenePhase::EndScreen));
        assert_eq!(app.config.max_ticks, Some(600));
        assert_eq!(app.config.pacing, LoopPacing::Simulated);
        assert_eq!(app.seed, 42);
    }

    #[test]
    fn realtime_flag_selects_wall_clock_pacing() {
        let app = wire(launch(None, true));
        assert_eq!(app.config.pacing, LoopPacing::Realtime);
        assert_eq!(app.config.max_ticks, None);
    }
}
