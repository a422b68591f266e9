pub mod app;

pub use app::{
    run_app, AppError, AudioRequest, AudioSink, BgmTrack, Entity, EntityId, EntityIdAllocator,
    EntityKind, LoggingAudioSink, LoopConfig, LoopMetricsSnapshot, LoopMetricsSummary, LoopPacing,
    LoopReport, Pose, Scene, SceneCommand, SceneMachine, ScenePhase, SceneWorld, Vec3, WorldHost,
};
