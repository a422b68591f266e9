use engine::{Vec3, WorldHost};
use tracing::debug;

use super::registry::ItemRegistry;
use super::types::{ItemCategory, ItemLocation, Participant, ParticipantRoster, TargetKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArbiterReport {
    pub bots_evaluated: usize,
    pub targets_changed: usize,
    pub idle_bots: usize,
}

/// Recomputes the single current target of every bot-controlled
/// participant. Only the evaluated bot's own target list is written.
pub fn assign_targets(
    registry: &ItemRegistry,
    roster: &mut ParticipantRoster,
    host: &dyn WorldHost,
) -> ArbiterReport {
    let mut report = ArbiterReport::default();

    for index in 0..roster.len() {
        let Some(participant) = roster.get(index) else {
            continue;
        };
        if !participant.is_bot() {
            continue;
        }
        report.bots_evaluated = report.bots_evaluated.saturating_add(1);

        let previous = participant.targets().first().copied();
        let next = choose_target(index, registry, roster, host);

        if next.is_none() {
            report.idle_bots = report.idle_bots.saturating_add(1);
        }
        if next.map(|target| (target.entity(), target.target_kind()))
            != previous.map(|target| (target.entity(), target.target_kind()))
        {
            report.targets_changed = report.targets_changed.saturating_add(1);
            debug!(
                participant = roster.get(index).map_or("", Participant::name),
                target_kind = ?next.map(|target| target.target_kind()),
                target_entity = ?next.map(|target| target.entity().0),
                in_world = ?next.map(|target| target.is_in_world()),
                "bot_target_changed"
            );
        }

        if let Some(participant) = roster.get_mut(index) {
            participant.set_target(next);
        }
    }

    report
}

/// Priority ladder for one bot: hot-potato hand-off, then the starting
/// cookie, then the mystery bag, then the nearest shopping-list item.
pub fn choose_target(
    index: usize,
    registry: &ItemRegistry,
    roster: &ParticipantRoster,
    host: &dyn WorldHost,
) -> Option<ItemLocation> {
    let participant = roster.get(index)?;
    let cart = participant.cart()?;
    let position = host.world_position(cart)?;

    if participant.has_hot_potato() {
        return hot_potato_target(index, participant, roster, host);
    }

    if let Some(cookie) = registry.locations(ItemCategory::StartingCookie).first() {
        return Some(*cookie);
    }
    if let Some(bag) = registry.locations(ItemCategory::MysteryBag).first() {
        return Some(*bag);
    }

    nearest_list_item(participant, position, registry)
}

/// Keeps chasing the current hand-off rival while that rival is still a
/// valid receiver, refreshing its position. Otherwise picks the top scorer
/// among eligible rivals, first in roster order on ties.
fn hot_potato_target(
    index: usize,
    participant: &Participant,
    roster: &ParticipantRoster,
    host: &dyn WorldHost,
) -> Option<ItemLocation> {
    if let Some(current) = participant.targets().first() {
        if current.target_kind() == TargetKind::PassOffHotPotato {
            let still_valid = roster
                .by_cart(current.entity())
                .filter(|rival| !rival.is_bash_protected())
                .and_then(|_| host.world_position(current.entity()));
            if let Some(rival_position) = still_valid {
                return Some(current.with_position(rival_position));
            }
        }
    }

    let mut top: Option<(u32, ItemLocation)> = None;
    for (rival_index, rival) in roster.iter().enumerate() {
        if rival_index == index || rival.is_bash_protected() {
            continue;
        }
        let Some(rival_cart) = rival.cart() else {
            continue;
        };
        if Some(rival_cart) == participant.cart() {
            continue;
        }
        let Some(rival_position) = host.world_position(rival_cart) else {
            continue;
        };
        if top.map_or(true, |(points, _)| rival.points() > points) {
            top = Some((
                rival.points(),
                ItemLocation::carried(rival_position, TargetKind::PassOffHotPotato, rival_cart),
            ));
        }
    }
    top.map(|(_, target)| target)
}

/// World-standing candidates always beat carried ones; within the same
/// placement the strictly closer candidate wins and exact ties keep the
/// first one found.
fn nearest_list_item(
    participant: &Participant,
    position: Vec3,
    registry: &ItemRegistry,
) -> Option<ItemLocation> {
    let own_cart = participant.cart();
    let candidates = participant
        .shopping_list()
        .iter()
        .filter(|slot| !slot.collected)
        .flat_map(|slot| registry.locations(slot.category).iter())
        .filter(|location| Some(location.entity()) != own_cart);

    let mut best: Option<(f32, ItemLocation)> = None;
    for candidate in candidates {
        let separation = candidate.position().distance(position);
        let replace = match best {
            None => true,
            Some((best_separation, best_location)) => {
                if best_location.is_in_world() == candidate.is_in_world() {
                    separation < best_separation
                } else {
                    !best_location.is_in_world() && candidate.is_in_world()
                }
            }
        };
        if replace {
            best = Some((separation, *candidate));
        }
    }
    best.map(|(_, location)| location)
}
