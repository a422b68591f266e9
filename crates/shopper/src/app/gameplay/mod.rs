pub mod arbiter;
pub mod clock;
pub mod registry;
pub mod sandbox;
pub mod scene;
pub mod shopper_match;
pub mod spawn;
pub mod types;


pub use arbiter::{assign_targets, choose_target, ArbiterReport};
pub use clock::{clamp_elapsed, format_match_time, MatchClock};
pub use registry::{ItemRegistry, RegistryBuildStats};
pub use sandbox::{Sandbox, SandboxStepReport};
pub use scene::{build_scene_machine, EndScreenScene, MatchScene};
pub use shopper_match::{MatchEvent, ShopperMatch, Standing, TickReport};
pub use spawn::{
    CleanupReport, SpawnPoints, SpawnPool, SpawnReport, SpawnScheduler, SpawnSettings,
};
pub use types::{
    CategoryInfo, ControlKind, ItemCategory, ItemClass, ItemLocation, Participant,
    ParticipantRoster, PoolId, ShoppingListSlot, TargetKind, ITEM_CATALOGUE,
};

/// Entries on every participant's shopping list.
pub const SHOPPING_LIST_LEN: usize = 3;
