use engine::{EntityId, Pose, WorldHost};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::clock::clamp_elapsed;
use super::registry::ItemRegistry;
use super::types::{ItemCategory, ItemLocation, PoolId};

/// Respawn timer value for slots that have never been occupied: the first
/// tick spawns immediately.
const UNARMED_TIMER_SECONDS: f32 = -1.0;

/// Fixed spawn transforms for one pool plus parallel occupancy and cooldown
/// arrays. The length is set at construction and never changes.
#[derive(Debug, Clone)]
pub struct SpawnPool {
    id: PoolId,
    points: Box<[Pose]>,
    occupants: Box<[Option<EntityId>]>,
    respawn_timers: Box<[f32]>,
}

impl SpawnPool {
    pub fn new(id: PoolId, points: Vec<Pose>) -> Self {
        let len = points.len();
        Self {
            id,
            points: points.into_boxed_slice(),
            occupants: vec![None; len].into_boxed_slice(),
            respawn_timers: vec![UNARMED_TIMER_SECONDS; len].into_boxed_slice(),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn spawn_point(&self, slot: usize) -> Option<Pose> {
        self.points.get(slot).copied()
    }

    pub fn occupant(&self, slot: usize) -> Option<EntityId> {
        self.occupants.get(slot).copied().flatten()
    }

    pub fn respawn_timer(&self, slot: usize) -> Option<f32> {
        self.respawn_timers.get(slot).copied()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants.iter().filter(|slot| slot.is_some()).count()
    }

    /// Slots a capacity-chasing spawn may use: empty, or still holding a
    /// handle the world has since destroy-flagged. Scanned fresh on every
    /// call.
    pub fn open_slot_indices(&self, host: &dyn WorldHost) -> Vec<usize> {
        self.occupants
            .iter()
            .enumerate()
            .filter(|(_, occupant)| match occupant {
                None => true,
                Some(id) => host.is_destroy_flagged(*id),
            })
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Uniform choice among open slots. `None` means no spawn this tick.
    pub fn pick_open_slot(&self, host: &dyn WorldHost, rng: &mut impl Rng) -> Option<usize> {
        self.open_slot_indices(host).choose(rng).copied()
    }

    fn occupy(&mut self, slot: usize, id: EntityId) {
        self.occupants[slot] = Some(id);
    }

    /// Frees every slot whose occupant is destroy-flagged, arming the slot's
    /// cooldown when `respawn_seconds` is set. Returns the number freed.
    fn release_destroyed(&mut self, host: &dyn WorldHost, respawn_seconds: Option<f32>) -> usize {
        let mut freed = 0usize;
        for (slot, occupant) in self.occupants.iter_mut().enumerate() {
            let Some(id) = *occupant else {
                continue;
            };
            if !host.is_destroy_flagged(id) {
                continue;
            }
            *occupant = None;
            if let Some(seconds) = respawn_seconds {
                self.respawn_timers[slot] = seconds;
            }
            freed = freed.saturating_add(1);
            debug!(pool = ?self.id, slot, entity = id.0, "spawn_slot_freed");
        }
        freed
    }

    fn reset(&mut self) {
        self.occupants.fill(None);
        self.respawn_timers.fill(UNARMED_TIMER_SECONDS);
    }
}

#[derive(Debug, Clone)]
pub struct SpawnSettings {
    pub max_instances_per_grocery_item: usize,
    pub spare_change_respawn_seconds: f32,
    pub mystery_bag_first_spawn_seconds: f32,
    pub mystery_bag_respawn_range_seconds: (f32, f32),
    pub bonus_banner_frames: u32,
    pub starting_cookie_spawn: Pose,
    pub mystery_bag_spawn: Pose,
}

#[derive(Debug, Clone, Default)]
pub struct SpawnPoints {
    pub spare_change: Vec<Pose>,
    pub drinks: Vec<Pose>,
    pub fruit: Vec<Pose>,
    pub veggies: Vec<Pose>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub spawned: usize,
    pub deferred_categories: usize,
    pub cookie_spawned: bool,
    pub mystery_bag_spawned: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub freed_slots: usize,
    pub cookie_collected: bool,
    pub mystery_bag_collected: bool,
}

/// Owns the spawn pools and the single-instance pickups. Slot state persists
/// across ticks until `reset`.
#[derive(Debug)]
pub struct SpawnScheduler {
    settings: SpawnSettings,
    pools: [SpawnPool; 4],
    cookie_can_spawn: bool,
    starting_cookie: Option<EntityId>,
    mystery_bag_can_spawn: bool,
    mystery_bag: Option<EntityId>,
    mystery_bag_timer: f32,
    bonus_banner_frames: u32,
    seed: u64,
    rng: ChaCha8Rng,
}

impl SpawnScheduler {
    pub fn new(settings: SpawnSettings, points: SpawnPoints, seed: u64) -> Self {
        let mystery_bag_timer = settings.mystery_bag_first_spawn_seconds;
        Self {
            settings,
            pools: [
                SpawnPool::new(PoolId::SpareChange, points.spare_change),
                SpawnPool::new(PoolId::Drinks, points.drinks),
                SpawnPool::new(PoolId::Fruit, points.fruit),
                SpawnPool::new(PoolId::Veggies, points.veggies),
            ],
            cookie_can_spawn: true,
            starting_cookie: None,
            mystery_bag_can_spawn: false,
            mystery_bag: None,
            mystery_bag_timer,
            bonus_banner_frames: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &SpawnSettings {
        &self.settings
    }

    pub fn pool(&self, id: PoolId) -> &SpawnPool {
        &self.pools[id.index()]
    }

    pub fn starting_cookie(&self) -> Option<EntityId> {
        self.starting_cookie
    }

    pub fn cookie_can_spawn(&self) -> bool {
        self.cookie_can_spawn
    }

    pub fn mystery_bag(&self) -> Option<EntityId> {
        self.mystery_bag
    }

    pub fn mystery_bag_can_spawn(&self) -> bool {
        self.mystery_bag_can_spawn
    }

    pub fn mystery_bag_timer(&self) -> f32 {
        self.mystery_bag_timer
    }

    pub fn bonus_banner_frames(&self) -> u32 {
        self.bonus_banner_frames
    }

    /// Called by the presentation layer once per rendered frame.
    pub fn decrement_bonus_banner(&mut self) {
        self.bonus_banner_frames = self.bonus_banner_frames.saturating_sub(1);
    }

    /// Spawn half of the scheduler pass. Newly created instances are
    /// appended to `registry` so later stages of the same tick see them.
    pub fn run_spawns(
        &mut self,
        dt_seconds: f32,
        host: &mut dyn WorldHost,
        registry: &mut ItemRegistry,
    ) -> SpawnReport {
        let dt_seconds = clamp_elapsed(dt_seconds);
        let mut report = SpawnReport::default();

        if self.cookie_can_spawn && self.starting_cookie.is_none() {
            let pose = self.settings.starting_cookie_spawn;
            let id = spawn_into_registry(host, registry, ItemCategory::StartingCookie, pose, None);
            self.starting_cookie = Some(id);
            report.cookie_spawned = true;
            report.spawned = report.spawned.saturating_add(1);
        }

        if self.mystery_bag_can_spawn && self.mystery_bag.is_none() {
            self.mystery_bag_timer -= dt_seconds;
            if self.mystery_bag_timer <= 0.0 {
                let pose = self.settings.mystery_bag_spawn;
                let id = spawn_into_registry(host, registry, ItemCategory::MysteryBag, pose, None);
                self.mystery_bag = Some(id);
                self.bonus_banner_frames = self.settings.bonus_banner_frames;
                report.mystery_bag_spawned = true;
                report.spawned = report.spawned.saturating_add(1);
            }
        }

        let coins = &mut self.pools[PoolId::SpareChange.index()];
        for slot in 0..coins.len() {
            if coins.occupants[slot].is_some() {
                continue;
            }
            coins.respawn_timers[slot] -= dt_seconds;
            if coins.respawn_timers[slot] > 0.0 {
                continue;
            }
            let pose = coins.points[slot];
            let id = spawn_into_registry(
                host,
                registry,
                ItemCategory::SpareChange,
                pose,
                Some(slot),
            );
            coins.occupy(slot, id);
            report.spawned = report.spawned.saturating_add(1);
        }

        let max_instances = self.settings.max_instances_per_grocery_item;
        for category in ItemCategory::GROCERIES {
            let Some(pool_id) = category.pool() else {
                continue;
            };
            while registry.count(category) < max_instances {
                let pool = &mut self.pools[pool_id.index()];
                let Some(slot) = pool.pick_open_slot(&*host, &mut self.rng) else {
                    report.deferred_categories = report.deferred_categories.saturating_add(1);
                    debug!(
                        category = ?category,
                        pool = ?pool_id,
                        tracked = registry.count(category),
                        max_instances,
                        "spawn_deferred_no_open_slot"
                    );
                    break;
                };
                let pose = pool.points[slot];
                let id = spawn_into_registry(host, registry, category, pose, Some(slot));
                pool.occupy(slot, id);
                report.spawned = report.spawned.saturating_add(1);
            }
        }

        report
    }

    /// Cleanup half of the scheduler pass: frees slots and single-instance
    /// handles whose occupant the world has destroy-flagged.
    pub fn cleanup(&mut self, host: &dyn WorldHost) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(cookie) = self.starting_cookie {
            if host.is_destroy_flagged(cookie) {
                self.starting_cookie = None;
                self.cookie_can_spawn = false;
                self.mystery_bag_can_spawn = true;
                report.cookie_collected = true;
                debug!(
                    entity = cookie.0,
                    mystery_bag_timer = self.mystery_bag_timer,
                    "starting_cookie_collected"
                );
            }
        }

        if let Some(bag) = self.mystery_bag {
            if host.is_destroy_flagged(bag) {
                let (min, max) = self.settings.mystery_bag_respawn_range_seconds;
                self.mystery_bag = None;
                self.mystery_bag_timer = self.rng.gen_range(min..=max);
                report.mystery_bag_collected = true;
                debug!(
                    entity = bag.0,
                    mystery_bag_timer = self.mystery_bag_timer,
                    "mystery_bag_collected"
                );
            }
        }

        let spare_change_respawn = self.settings.spare_change_respawn_seconds;
        for pool in &mut self.pools {
            let respawn_seconds = pool.id.is_timer_gated().then_some(spare_change_respawn);
            let freed = pool.release_destroyed(host, respawn_seconds);
            report.freed_slots = report.freed_slots.saturating_add(freed);
        }

        report
    }

    /// Match teardown: empty pools, cookie armed, bag disarmed, RNG
    /// reseeded.
    pub fn reset(&mut self) {
        for pool in &mut self.pools {
            pool.reset();
        }
        self.cookie_can_spawn = true;
        self.starting_cookie = None;
        self.mystery_bag_can_spawn = false;
        self.mystery_bag = None;
        self.mystery_bag_timer = self.settings.mystery_bag_first_spawn_seconds;
        self.bonus_banner_frames = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

fn spawn_into_registry(
    host: &mut dyn WorldHost,
    registry: &mut ItemRegistry,
    category: ItemCategory,
    pose: Pose,
    slot: Option<usize>,
) -> EntityId {
    let debug_name = match slot {
        Some(slot) => format!("{}_{slot}", category.debug_name()),
        None => category.debug_name().to_string(),
    };
    let id = host.instantiate(category.entity_kind(), pose, &debug_name);
    registry.record_spawn(
        category,
        ItemLocation::in_world(pose.position, category.target_kind(), id),
    );
    debug!(category = ?category, slot = ?slot, entity = id.0, "item_spawned");
    id
}

#[cfg(test)]
mod tests {
    use engine::{EntityKind, SceneWorld, Vec3};

    use super::*;
    use crate::app::gameplay::types::ParticipantRoster;

    fn points(count: usize, z: f32) -> Vec<Pose> {
        (0..count)
            .map(|index| Pose::at(Vec3::new(index as f32 * 10.0, 3.0, z)))
            .collect()
    }

    fn settings() -> SpawnSettings {
        SpawnSettings {
            max_instances_per_grocery_item: 2,
            spare_change_respawn_seconds: 10.0,
            mystery_bag_first_spawn_seconds: 30.0,
            mystery_bag_respawn_range_seconds: (30.0, 60.0),
            bonus_banner_frames: 75,
            starting_cookie_spawn: Pose::at(Vec3::new(0.0, 3.0, 0.0)),
            mystery_bag_spawn: Pose::at(Vec3::new(5.0, 3.0, 0.0)),
        }
    }

    fn scheduler(coins: usize, per_class: usize) -> SpawnScheduler {
        SpawnScheduler::new(
            settings(),
            SpawnPoints {
                spare_change: points(coins, 0.0),
                drinks: points(per_class, 100.0),
                fruit: points(per_class, 200.0),
                veggies: points(per_class, 300.0),
            },
            7,
        )
    }

    fn run_tick(
        scheduler: &mut SpawnScheduler,
        world: &mut SceneWorld,
        dt_seconds: f32,
    ) -> (SpawnReport, CleanupReport) {
        let mut registry = ItemRegistry::default();
        registry.rebuild(&*world, &ParticipantRoster::default());
        let spawn = scheduler.run_spawns(dt_seconds, world, &mut registry);
        let cleanup = scheduler.cleanup(&*world);
        world.apply_pending();
        (spawn, cleanup)
    }

    #[test]
    fn pick_open_slot_reports_none_when_pool_is_full() {
        let mut world = SceneWorld::default();
        let mut pool = SpawnPool::new(PoolId::Drinks, points(2, 0.0));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for slot in 0..2 {
            let id = world.spawn(EntityKind::Milk, Pose::default(), "milk");
            pool.occupy(slot, id);
        }

        assert!(pool.open_slot_indices(&world).is_empty());
        assert_eq!(pool.pick_open_slot(&world, &mut rng), None);
    }

    #[test]
    fn pick_open_slot_on_empty_pool_is_none() {
        let world = SceneWorld::default();
        let pool = SpawnPool::new(PoolId::Fruit, Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(pool.is_empty());
        assert_eq!(pool.pick_open_slot(&world, &mut rng), None);
    }

    #[test]
    fn pick_open_slot_only_returns_open_slots() {
        let mut world = SceneWorld::default();
        let mut pool = SpawnPool::new(PoolId::Veggies, points(6, 0.0));
        for slot in [0, 1, 3, 4, 5] {
            let id = world.spawn(EntityKind::Carrot, Pose::default(), "carrot");
            pool.occupy(slot, id);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..32 {
            assert_eq!(pool.pick_open_slot(&world, &mut rng), Some(2));
        }
    }

    #[test]
    fn open_slot_scan_sees_destroy_flagged_occupants() {
        let mut world = SceneWorld::default();
        let mut pool = SpawnPool::new(PoolId::Drinks, points(2, 0.0));
        let stale = world.spawn(EntityKind::Water, Pose::default(), "water");
        let live = world.spawn(EntityKind::Water, Pose::default(), "water");
        pool.occupy(0, stale);
        pool.occupy(1, live);
        world.flag_destroy(stale);

        assert_eq!(pool.open_slot_indices(&world), vec![0]);
    }

    #[test]
    fn first_tick_fills_coins_cookie_and_grocery_capacity() {
        let mut world = SceneWorld::default();
        let mut scheduler = scheduler(4, 6);

        let (report, _) = run_tick(&mut scheduler, &mut world, 1.0 / 60.0);

        assert!(report.cookie_spawned);
        assert!(!report.mystery_bag_spawned);
        assert_eq!(scheduler.pool(PoolId::SpareChange).occupied_count(), 4);
        assert_eq!(scheduler.pool(PoolId::Drinks).occupied_count(), 6);
        assert_eq!(scheduler.pool(PoolId::Fruit).occupied_count(), 6);
        assert_eq!(scheduler.pool(PoolId::Veggies).occupied_count(), 6);
        assert_eq!(world.count_live_of_kind(EntityKind::Milk), 2);
        assert_eq!(world.count_live_of_kind(EntityKind::Broccoli), 2);
        assert_eq!(world.count_live_of_kind(EntityKind::StartingCookie), 1);
    }

    #[test]
    fn small_pool_defers_remaining_spawns() {
        let mut world = SceneWorld::default();
        let mut scheduler = scheduler(0, 3);

        let (report, _) = run_tick(&mut scheduler, &mut world, 0.1);

        assert_eq!(scheduler.pool(PoolId::Drinks).occupied_count(), 3);
        let drinks = world.count_live_of_kind(EntityKind::Milk)
            + world.count_live_of_kind(EntityKind::Water)
            + world.count_live_of_kind(EntityKind::Cola);
        assert_eq!(drinks, 3);
        assert!(report.deferred_categories > 0);
    }

    #[test]
    fn collected_coin_waits_for_full_cooldown() {
        let mut world = SceneWorld::default();
        let mut scheduler = scheduler(1, 0);
        run_tick(&mut scheduler, &mut world, 0.1);
        let coin = scheduler
            .pool(PoolId::SpareChange)
            .occupant(0)
            .expect("coin spawned");

        world.flag_destroy(coin);
        let (_, cleanup) = run_tick(&mut scheduler, &mut world, 0.1);
        assert_eq!(cleanup.freed_slots, 1);
        assert_eq!(scheduler.pool(PoolId::SpareChange).occupant(0), None);
        assert_eq!(scheduler.pool(PoolId::SpareChange).respawn_timer(0), Some(10.0));

        for _ in 0..9 {
            run_tick(&mut scheduler, &mut world, 1.0);
            assert_eq!(scheduler.pool(PoolId::SpareChange).occupant(0), None);
        }
        run_tick(&mut scheduler, &mut world, 1.0);
        assert!(scheduler.pool(PoolId::SpareChange).occupant(0).is_some());
    }

    #[test]
    fn cookie_pickup_disables_cookie_and_arms_bag() {
        let mut world = SceneWorld::default();
        let mut scheduler = scheduler(0, 0);
        run_tick(&mut scheduler, &mut world, 0.1);
        let cookie = scheduler.starting_cookie().expect("cookie");

        world.flag_destroy(cookie);
        let (_, cleanup) = run_tick(&mut scheduler, &mut world, 0.1);
        assert!(cleanup.cookie_collected);
        assert!(!scheduler.cookie_can_spawn());
        assert!(scheduler.mystery_bag_can_spawn());

        run_tick(&mut scheduler, &mut world, 29.0);
        assert_eq!(scheduler.mystery_bag(), None);
        let (report, _) = run_tick(&mut scheduler, &mut world, 1.0);
        assert!(report.mystery_bag_spawned);
        assert_eq!(scheduler.bonus_banner_frames(), 75);
        assert_eq!(world.count_live_of_kind(EntityKind::StartingCookie), 0);
    }

    #[test]
    fn bag_respawn_is_drawn_from_configured_range() {
        let mut world = SceneWorld::default();
        let mut scheduler = scheduler(0, 0);
        run_tick(&mut scheduler, &mut world, 0.1);
        world.flag_destroy(scheduler.starting_cookie().expect("cookie"));
        run_tick(&mut scheduler, &mut world, 0.1);
        run_tick(&mut scheduler, &mut world, 30.0);
        let bag = scheduler.mystery_bag().expect("bag");

        world.flag_destroy(bag);
        let (_, cleanup) = run_tick(&mut scheduler, &mut world, 0.1);
        assert!(cleanup.mystery_bag_collected);
        let timer = scheduler.mystery_bag_timer();
        assert!((30.0..=60.0).contains(&timer), "timer {timer}");
    }

    #[test]
    fn bonus_banner_saturates_at_zero() {
        let mut scheduler = scheduler(0, 0);
        scheduler.decrement_bonus_banner();
        assert_eq!(scheduler.bonus_banner_frames(), 0);
    }

    #[test]
    fn reset_restores_match_start_state() {
        let mut world = SceneWorld::default();
        let mut scheduler = scheduler(2, 2);
        run_tick(&mut scheduler, &mut world, 0.1);
        world.flag_destroy(scheduler.starting_cookie().expect("cookie"));
        run_tick(&mut scheduler, &mut world, 0.1);

        scheduler.reset();
        assert!(scheduler.cookie_can_spawn());
        assert!(!scheduler.mystery_bag_can_spawn());
        assert_eq!(scheduler.mystery_bag_timer(), 30.0);
        for id in PoolId::ALL {
            assert_eq!(scheduler.pool(id).occupied_count(), 0);
        }
        assert_eq!(scheduler.pool(PoolId::SpareChange).respawn_timer(0), Some(-1.0));
    }
}
