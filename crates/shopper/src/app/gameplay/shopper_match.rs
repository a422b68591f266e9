use engine::{BgmTrack, ScenePhase, WorldHost};
use tracing::{debug, info};

use super::arbiter::{assign_targets, ArbiterReport};
use super::clock::{clamp_elapsed, MatchClock};
use super::registry::{ItemRegistry, RegistryBuildStats};
use super::spawn::{CleanupReport, SpawnReport, SpawnScheduler};
use super::types::{ControlKind, ItemLocation, ParticipantRoster};

/// Discrete requests raised at the moment the match timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    SceneTransition(ScenePhase),
    ResetAudio,
    ChangeBgm(BgmTrack),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub registry: RegistryBuildStats,
    pub spawn: SpawnReport,
    pub cleanup: CleanupReport,
    pub arbiter: ArbiterReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub control: ControlKind,
    pub points: u32,
}

/// The gameplay core. One `tick` runs registry rebuild, spawning and
/// cleanup, target arbitration and the match clock, in that order.
#[derive(Debug)]
pub struct ShopperMatch {
    registry: ItemRegistry,
    scheduler: SpawnScheduler,
    roster: ParticipantRoster,
    clock: MatchClock,
    ticks: u64,
    last_tick: TickReport,
}

impl ShopperMatch {
    pub fn new(
        scheduler: SpawnScheduler,
        roster: ParticipantRoster,
        match_length_seconds: f32,
    ) -> Self {
        Self {
            registry: ItemRegistry::default(),
            scheduler,
            roster,
            clock: MatchClock::new(match_length_seconds),
            ticks: 0,
            last_tick: TickReport::default(),
        }
    }

    /// Negative or non-finite `dt_seconds` is treated as zero elapsed time
    /// for every timer in the tick.
    pub fn tick(&mut self, host: &mut dyn WorldHost, dt_seconds: f32) -> Vec<MatchEvent> {
        let dt_seconds = clamp_elapsed(dt_seconds);
        let registry = self.registry.rebuild(&*host, &self.roster);
        let spawn = self
            .scheduler
            .run_spawns(dt_seconds, host, &mut self.registry);
        let cleanup = self.scheduler.cleanup(&*host);
        let arbiter = assign_targets(&self.registry, &mut self.roster, &*host);

        self.last_tick = TickReport {
            registry,
            spawn,
            cleanup,
            arbiter,
        };
        self.ticks = self.ticks.saturating_add(1);
        if spawn.spawned > 0 || cleanup.freed_slots > 0 || arbiter.targets_changed > 0 {
            debug!(
                tick = self.ticks,
                tracked = self.registry.total(),
                spawned = spawn.spawned,
                freed_slots = cleanup.freed_slots,
                targets_changed = arbiter.targets_changed,
                "match_tick"
            );
        }

        let mut events = Vec::new();
        if self.clock.tick(dt_seconds) {
            info!(tick = self.ticks, "match_expired");
            events.push(MatchEvent::SceneTransition(ScenePhase::EndScreen));
            events.push(MatchEvent::ResetAudio);
            events.push(MatchEvent::ChangeBgm(BgmTrack::EndScene));
        }
        events
    }

    pub fn remaining_seconds(&self) -> f32 {
        self.clock.remaining_seconds()
    }

    pub fn remaining_pretty(&self) -> String {
        self.clock.pretty()
    }

    pub fn is_expired(&self) -> bool {
        self.clock.is_expired()
    }

    /// Empty for unknown participants and for bots with nothing to chase.
    pub fn targets(&self, participant: usize) -> &[ItemLocation] {
        self.roster
            .get(participant)
            .map_or(&[], |participant| participant.targets())
    }

    pub fn bonus_banner_frames(&self) -> u32 {
        self.scheduler.bonus_banner_frames()
    }

    pub fn decrement_bonus_banner(&mut self) {
        self.scheduler.decrement_bonus_banner();
    }

    /// Points descending; equal scores keep roster order.
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .roster
            .iter()
            .map(|participant| Standing {
                name: participant.name().to_string(),
                control: participant.control(),
                points: participant.points(),
            })
            .collect();
        standings.sort_by(|a, b| b.points.cmp(&a.points));
        standings
    }

    pub fn roster(&self) -> &ParticipantRoster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut ParticipantRoster {
        &mut self.roster
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    #[cfg(test)]
    pub(crate) fn clock_mut(&mut self) -> &mut MatchClock {
        &mut self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_tick(&self) -> TickReport {
        self.last_tick
    }

    /// Scene teardown: everything tracked for the match goes back to its
    /// starting state.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.scheduler.reset();
        self.roster.reset_for_match();
        self.clock.reset();
        self.ticks = 0;
        self.last_tick = TickReport::default();
    }
}
