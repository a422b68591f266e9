mod audio;
mod loop_runner;
mod metrics;
mod scene;
mod world;

pub use audio::{AudioRequest, AudioSink, BgmTrack, LoggingAudioSink};
pub use loop_runner::{run_app, AppError, LoopConfig, LoopPacing, LoopReport};
pub use metrics::{LoopMetricsSnapshot, LoopMetricsSummary};
pub use scene::{Scene, SceneCommand, SceneMachine, ScenePhase};
pub use world::{
    Entity, EntityId, EntityIdAllocator, EntityKind, Pose, SceneWorld, Vec3, WorldHost,
};
