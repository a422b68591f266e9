use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::audio::AudioRequest;
use super::world::SceneWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenePhase {
    MainMenu,
    Loading,
    Setup,
    Countdown,
    Game,
    Paused,
    EndScreen,
    Credits,
    Controls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(ScenePhase),
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(&mut self, dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand;
    /// Scene/level teardown. Everything the scene tracked for the match is
    /// dropped here.
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

/// Phase state machine. Phases without a registered scene are
/// presentation-only: they can be active, but nothing simulates while they
/// are.
pub struct SceneMachine {
    runtimes: HashMap<ScenePhase, SceneRuntime>,
    active_phase: ScenePhase,
}

impl SceneMachine {
    pub fn new(active_phase: ScenePhase) -> Self {
        Self {
            runtimes: HashMap::new(),
            active_phase,
        }
    }

    pub fn register(&mut self, phase: ScenePhase, scene: Box<dyn Scene>) {
        self.runtimes.insert(
            phase,
            SceneRuntime {
                scene,
                world: SceneWorld::default(),
                is_loaded: false,
            },
        );
    }

    pub fn has_scene(&self, phase: ScenePhase) -> bool {
        self.runtimes.contains_key(&phase)
    }

    pub fn active_phase(&self) -> ScenePhase {
        self.active_phase
    }

    pub fn load_active(&mut self) {
        self.load_phase_if_needed(self.active_phase);
    }

    pub fn update_active(&mut self, dt_seconds: f32) -> SceneCommand {
        let Some(runtime) = self.runtimes.get_mut(&self.active_phase) else {
            return SceneCommand::None;
        };
        let (scene, world) = (&mut runtime.scene, &mut runtime.world);
        scene.update(dt_seconds, world)
    }

    pub fn apply_pending_active(&mut self) {
        if let Some(runtime) = self.runtimes.get_mut(&self.active_phase) {
            runtime.world.apply_pending();
        }
    }

    pub fn drain_audio_requests_active(&mut self) -> Vec<AudioRequest> {
        self.runtimes
            .get_mut(&self.active_phase)
            .map(|runtime| runtime.world.drain_audio_requests())
            .unwrap_or_default()
    }

    pub fn active_world(&self) -> Option<&SceneWorld> {
        self.runtimes
            .get(&self.active_phase)
            .map(|runtime| &runtime.world)
    }

    pub fn world(&self, phase: ScenePhase) -> Option<&SceneWorld> {
        self.runtimes.get(&phase).map(|runtime| &runtime.world)
    }

    #[cfg(test)]
    pub(crate) fn active_world_mut(&mut self) -> Option<&mut SceneWorld> {
        self.runtimes
            .get_mut(&self.active_phase)
            .map(|runtime| &mut runtime.world)
    }

    pub fn debug_title_active(&self) -> Option<String> {
        let runtime = self.runtimes.get(&self.active_phase)?;
        runtime.scene.debug_title(&runtime.world)
    }

    pub fn switch_to(&mut self, next_phase: ScenePhase) -> bool {
        if self.active_phase == next_phase {
            return false;
        }

        self.load_phase_if_needed(next_phase);
        self.active_phase = next_phase;
        true
    }

    pub fn shutdown_all(&mut self) {
        for runtime in self.runtimes.values_mut() {
            if runtime.is_loaded {
                let (scene, world) = (&mut runtime.scene, &mut runtime.world);
                scene.unload(world);
                runtime.world.clear();
                runtime.is_loaded = false;
            }
        }
    }

    fn load_phase_if_needed(&mut self, phase: ScenePhase) {
        let Some(runtime) = self.runtimes.get_mut(&phase) else {
            return;
        };
        if runtime.is_loaded {
            return;
        }
        {
            let (scene, world) = (&mut runtime.scene, &mut runtime.world);
            scene.load(world);
        }
        runtime.is_loaded = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::world::{EntityKind, Pose, Vec3, WorldHost};

    struct TestScene {
        spawn_count: usize,
    }

    impl Scene for TestScene {
        fn load(&mut self, world: &mut SceneWorld) {
            for _ in 0..self.spawn_count {
                world.spawn(EntityKind::Prop, Pose::default(), "test");
            }
            world.apply_pending();
        }

        fn update(&mut self, _dt_seconds: f32, _world: &mut SceneWorld) -> SceneCommand {
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    struct SteppingScene {
        step_x: f32,
    }

    impl Scene for SteppingScene {
        fn load(&mut self, world: &mut SceneWorld) {
            world.spawn(EntityKind::ShoppingCart, Pose::default(), "cart");
            world.apply_pending();
        }

        fn update(&mut self, _dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
            if let Some(entity) = world.entities_mut().first_mut() {
                entity.pose.position.x += self.step_x;
            }
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    #[test]
    fn switch_away_and_back_preserves_entity_ids_and_positions() {
        let mut machine = SceneMachine::new(ScenePhase::Game);
        machine.register(ScenePhase::Game, Box::new(TestScene { spawn_count: 2 }));
        machine.register(ScenePhase::Setup, Box::new(TestScene { spawn_count: 1 }));
        machine.load_active();
        machine.apply_pending_active();

        {
            let world = machine.active_world_mut().expect("world");
            world.entities_mut()[0].pose.position = Vec3::new(2.5, 0.0, -1.0);
        }
        let before: Vec<(u64, Vec3)> = machine
            .active_world()
            .expect("world")
            .entities()
            .iter()
            .map(|entity| (entity.id.0, entity.pose.position))
            .collect();

        assert!(machine.switch_to(ScenePhase::Setup));
        machine.apply_pending_active();
        assert!(machine.switch_to(ScenePhase::Game));
        machine.apply_pending_active();

        let after: Vec<(u64, Vec3)> = machine
            .active_world()
            .expect("world")
            .entities()
            .iter()
            .map(|entity| (entity.id.0, entity.pose.position))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn inactive_scene_world_does_not_advance() {
        let mut machine = SceneMachine::new(ScenePhase::Game);
        machine.register(ScenePhase::Game, Box::new(SteppingScene { step_x: 1.0 }));
        machine.register(ScenePhase::Paused, Box::new(SteppingScene { step_x: 3.0 }));
        machine.load_active();

        let _ = machine.update_active(1.0 / 60.0);
        let before_switch = machine.active_world().expect("world").entities()[0]
            .pose
            .position
            .x;

        assert!(machine.switch_to(ScenePhase::Paused));
        for _ in 0..10 {
            let _ = machine.update_active(1.0 / 60.0);
        }

        assert!(machine.switch_to(ScenePhase::Game));
        let after_return = machine.active_world().expect("world").entities()[0]
            .pose
            .position
            .x;
        assert_eq!(before_switch, after_return);
    }

    #[test]
    fn presentation_only_phase_has_no_world_and_no_commands() {
        let mut machine = SceneMachine::new(ScenePhase::Game);
        machine.register(ScenePhase::Game, Box::new(TestScene { spawn_count: 1 }));
        machine.load_active();

        assert!(machine.switch_to(ScenePhase::EndScreen));
        assert!(machine.active_world().is_none());
        assert_eq!(machine.update_active(1.0), SceneCommand::None);
        assert!(machine.drain_audio_requests_active().is_empty());
        assert_eq!(
            machine
                .world(ScenePhase::Game)
                .expect("game world kept")
                .entity_count(),
            1
        );
    }

    #[test]
    fn switching_to_the_active_phase_is_a_no_op() {
        let mut machine = SceneMachine::new(ScenePhase::Game);
        machine.register(ScenePhase::Game, Box::new(TestScene { spawn_count: 0 }));
        assert!(!machine.switch_to(ScenePhase::Game));
    }

    #[test]
    fn shutdown_unloads_and_clears_every_loaded_world() {
        let mut machine = SceneMachine::new(ScenePhase::Game);
        machine.register(ScenePhase::Game, Box::new(TestScene { spawn_count: 3 }));
        machine.load_active();
        assert_eq!(machine.active_world().expect("world").live_entities().len(), 3);

        machine.shutdown_all();
        assert_eq!(machine.active_world().expect("world").entity_count(), 0);
    }
}
