use engine::{
    AudioRequest, BgmTrack, EntityKind, Pose, Scene, SceneCommand, SceneMachine, ScenePhase,
    SceneWorld, Vec3,
};
use tracing::info;

use super::sandbox::Sandbox;
use super::shopper_match::{MatchEvent, ShopperMatch};
use super::spawn::SpawnScheduler;
use crate::app::config::MatchConfig;

/// The in-game phase: drives the sandbox stand-in, then the gameplay core,
/// and turns core events into audio requests and a scene switch.
pub struct MatchScene {
    scene_name: &'static str,
    core: ShopperMatch,
    sandbox: Sandbox,
    cart_spawns: Vec<Vec3>,
}

impl MatchScene {
    pub fn new(config: &MatchConfig, seed: u64) -> Self {
        let scheduler = SpawnScheduler::new(config.spawn_settings(), config.spawn_points(), seed);
        Self {
            scene_name: "match",
            core: ShopperMatch::new(
                scheduler,
                config.build_roster(),
                config.match_length_seconds,
            ),
            sandbox: Sandbox::new(config.sandbox.clone()),
            cart_spawns: config
                .participants
                .iter()
                .map(|participant| participant.spawn)
                .collect(),
        }
    }

    pub fn core(&self) -> &ShopperMatch {
        &self.core
    }

    fn log_standings(&self) {
        for (rank, standing) in self.core.standings().iter().enumerate() {
            info!(
                rank = rank + 1,
                name = %standing.name,
                control = ?standing.control,
                points = standing.points,
                "final_standing"
            );
        }
    }
}

impl Scene for MatchScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.core.reset();
        for (index, spawn) in self.cart_spawns.iter().enumerate() {
            let cart = world.spawn(EntityKind::ShoppingCart, Pose::at(*spawn), "shopping_cart");
            if let Some(participant) = self.core.roster_mut().get_mut(index) {
                participant.set_cart(Some(cart));
            }
        }
        world.apply_pending();
        world.push_audio_request(AudioRequest::ChangeBgm(BgmTrack::GameScene));
        info!(
            scene = self.scene_name,
            participants = self.core.roster().len(),
            match_length_seconds = self.core.clock().length_seconds(),
            "match_loaded"
        );
    }

    fn update(&mut self, dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
        self.sandbox
            .step(dt_seconds, world, self.core.roster_mut());
        let events = self.core.tick(world, dt_seconds);
        self.core.decrement_bonus_banner();

        let mut command = SceneCommand::None;
        for event in events {
            match event {
                MatchEvent::SceneTransition(phase) => command = SceneCommand::SwitchTo(phase),
                MatchEvent::ResetAudio => world.push_audio_request(AudioRequest::ResetAudio),
                MatchEvent::ChangeBgm(track) => {
                    world.push_audio_request(AudioRequest::ChangeBgm(track))
                }
            }
        }
        if command != SceneCommand::None {
            self.log_standings();
        }
        command
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        self.core.reset();
        info!(
            scene = self.scene_name,
            entity_count = world.entity_count(),
            "match_unloaded"
        );
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let mut title = format!("{} | {}", self.scene_name, self.core.remaining_pretty());
        if self.core.bonus_banner_frames() > 0 {
            title.push_str(" | BONUS!");
        }
        Some(title)
    }
}

/// Scene for the end screen: idles until the runner stops.
pub struct EndScreenScene;

impl Scene for EndScreenScene {
    fn load(&mut self, _world: &mut SceneWorld) {
        info!(scene = "end_screen", "scene_loaded");
    }

    fn update(&mut self, _dt_seconds: f32, _world: &mut SceneWorld) -> SceneCommand {
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {}
}

pub fn build_scene_machine(config: &MatchConfig, seed: u64) -> SceneMachine {
    let mut scenes = SceneMachine::new(ScenePhase::Game);
    scenes.register(ScenePhase::Game, Box::new(MatchScene::new(config, seed)));
    scenes.register(ScenePhase::EndScreen, Box::new(EndScreenScene));
    scenes
}
