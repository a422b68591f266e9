use engine::{EntityId, SceneWorld, Vec3, WorldHost};
use tracing::{debug, info};

use super::clock::clamp_elapsed;
use super::types::{ItemCategory, ItemClass, Participant, ParticipantRoster};
use crate::app::config::SandboxConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxStepReport {
    pub pickups: usize,
    pub lists_completed: usize,
    pub hand_offs: usize,
    pub steals: usize,
}

/// Kinematic stand-in for cart physics and player control in headless
/// runs. Bots drive straight at their current target; humans stay put.
/// A bot that reaches an unprotected rival cart grabs one item it needs.
#[derive(Debug, Clone)]
pub struct Sandbox {
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn step(
        &self,
        dt_seconds: f32,
        world: &mut SceneWorld,
        roster: &mut ParticipantRoster,
    ) -> SandboxStepReport {
        let dt_seconds = clamp_elapsed(dt_seconds);
        let mut report = SandboxStepReport::default();

        for participant in roster.iter_mut() {
            participant.decay_bash_protection(dt_seconds);
        }
        self.drive_bots(dt_seconds, world, roster);
        self.resolve_pickups(world, roster, &mut report);
        self.resolve_steals(world, roster, &mut report);
        if self.resolve_hand_off(world, roster) {
            report.hand_offs += 1;
        }
        report
    }

    fn drive_bots(&self, dt_seconds: f32, world: &mut SceneWorld, roster: &ParticipantRoster) {
        let max_step = self.config.cart_speed * dt_seconds;
        for participant in roster.iter().filter(|participant| participant.is_bot()) {
            let Some(cart) = participant.cart() else {
                continue;
            };
            let Some(target) = participant.targets().first() else {
                continue;
            };
            let Some(position) = world.world_position(cart) else {
                continue;
            };
            let offset = target.position() - position;
            let distance = offset.length();
            let next = if distance <= max_step || distance <= f32::EPSILON {
                target.position()
            } else {
                position + offset * (max_step / distance)
            };
            world.set_position(cart, next);
        }
    }

    fn resolve_pickups(
        &self,
        world: &mut SceneWorld,
        roster: &mut ParticipantRoster,
        report: &mut SandboxStepReport,
    ) {
        let items: Vec<(EntityId, ItemCategory, Vec3)> = world
            .live_entities()
            .into_iter()
            .filter_map(|id| {
                let category = ItemCategory::from_entity_kind(world.entity_kind(id)?)?;
                Some((id, category, world.world_position(id)?))
            })
            .collect();

        for participant in roster.iter_mut() {
            let Some(cart) = participant.cart() else {
                continue;
            };
            let Some(cart_position) = world.world_position(cart) else {
                continue;
            };
            for &(item, category, item_position) in &items {
                if world.is_destroy_flagged(item)
                    || cart_position.distance(item_position) > self.config.pickup_radius
                {
                    continue;
                }
                let taken = match category.class() {
                    ItemClass::Currency => {
                        participant.add_points(self.config.spare_change_points);
                        true
                    }
                    ItemClass::UrgentPickup => {
                        participant.set_hot_potato(true);
                        true
                    }
                    ItemClass::BonusPickup => {
                        participant.add_points(self.config.mystery_bag_points);
                        true
                    }
                    _ => {
                        let collected = participant.collect(category);
                        if collected {
                            participant.add_points(self.config.grocery_points);
                        }
                        collected
                    }
                };
                if !taken {
                    continue;
                }
                world.flag_destroy(item);
                report.pickups += 1;
                debug!(
                    participant = participant.name(),
                    item = category.debug_name(),
                    "item_picked_up"
                );

                if category.is_grocery() {
                    self.settle_completed_list(participant, report);
                }
            }
        }
    }

    fn settle_completed_list(
        &self,
        participant: &mut Participant,
        report: &mut SandboxStepReport,
    ) {
        if !participant.list_complete() {
            return;
        }
        participant.add_points(self.config.list_completion_points);
        participant.clear_collected();
        report.lists_completed += 1;
        info!(
            participant = participant.name(),
            points = participant.points(),
            "shopping_list_completed"
        );
    }

    /// Each bot takes at most one needed item from a rival cart in bash
    /// range. Both carts come out of the grab bash-protected.
    fn resolve_steals(
        &self,
        world: &SceneWorld,
        roster: &mut ParticipantRoster,
        report: &mut SandboxStepReport,
    ) {
        let carts = cart_positions(world, roster);
        for thief in 0..roster.len() {
            let Some((victim, category)) = self.find_steal(thief, &carts, roster) else {
                continue;
            };
            if let Some(participant) = roster.get_mut(victim) {
                participant.drop_collected(category);
                participant.set_bash_protection(self.config.bash_protection_seconds);
            }
            let Some(participant) = roster.get_mut(thief) else {
                continue;
            };
            participant.collect(category);
            participant.set_bash_protection(self.config.bash_protection_seconds);
            report.steals += 1;
            debug!(
                thief,
                victim,
                item = category.debug_name(),
                "item_stolen"
            );
            self.settle_completed_list(participant, report);
        }
    }

    fn find_steal(
        &self,
        thief: usize,
        carts: &[Option<Vec3>],
        roster: &ParticipantRoster,
    ) -> Option<(usize, ItemCategory)> {
        let participant = roster.get(thief)?;
        if !participant.is_bot() || participant.is_bash_protected() {
            return None;
        }
        let thief_position = carts.get(thief).copied().flatten()?;
        roster.iter().enumerate().find_map(|(victim, rival)| {
            if victim == thief || rival.is_bash_protected() {
                return None;
            }
            let rival_position = carts.get(victim).copied().flatten()?;
            if thief_position.distance(rival_position) > self.config.bash_radius {
                return None;
            }
            rival
                .shopping_list()
                .iter()
                .filter(|slot| slot.collected)
                .map(|slot| slot.category)
                .find(|category| participant.needs(*category))
                .map(|category| (victim, category))
        })
    }

    /// Passes the hot potato from its holder to the first unprotected rival
    /// within bash range. At most one pass per step; giver and receiver are
    /// both protected afterwards so the token cannot bounce straight back.
    fn resolve_hand_off(&self, world: &SceneWorld, roster: &mut ParticipantRoster) -> bool {
        let carts = cart_positions(world, roster);

        let mut pass: Option<(usize, usize)> = None;
        'holders: for (holder, participant) in roster.iter().enumerate() {
            if !participant.has_hot_potato() {
                continue;
            }
            let Some(holder_position) = carts[holder] else {
                continue;
            };
            for (receiver, rival) in roster.iter().enumerate() {
                if receiver == holder || rival.is_bash_protected() {
                    continue;
                }
                let Some(rival_position) = carts[receiver] else {
                    continue;
                };
                if holder_position.distance(rival_position) <= self.config.bash_radius {
                    pass = Some((holder, receiver));
                    break 'holders;
                }
            }
        }

        let Some((holder, receiver)) = pass else {
            return false;
        };
        if let Some(participant) = roster.get_mut(holder) {
            participant.set_hot_potato(false);
            participant.set_bash_protection(self.config.bash_protection_seconds);
        }
        if let Some(participant) = roster.get_mut(receiver) {
            participant.set_hot_potato(true);
            participant.set_bash_protection(self.config.bash_protection_seconds);
        }
        debug!(holder, receiver, "hot_potato_passed");
        true
    }
}

fn cart_positions(world: &SceneWorld, roster: &ParticipantRoster) -> Vec<Option<Vec3>> {
    roster
        .iter()
        .map(|participant| {
            participant
                .cart()
                .and_then(|cart| world.world_position(cart))
        })
        .collect()
}
