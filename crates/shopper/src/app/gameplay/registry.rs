use engine::{EntityKind, WorldHost};
use tracing::debug;

use super::types::{ItemCategory, ItemLocation, ParticipantRoster};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryBuildStats {
    pub in_world: usize,
    pub carried: usize,
    pub skipped_without_pose: usize,
    pub unknown_carts: usize,
}

/// Per-tick snapshot of every trackable pickup, free-standing or riding in a
/// cart. Discarded and rebuilt wholesale each tick.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    lists: [Vec<ItemLocation>; ItemCategory::COUNT],
}

impl ItemRegistry {
    /// Single pass over the live entities. Carts contribute one carried
    /// location per collected shopping-list slot; tracked pickups contribute
    /// one in-world location each; everything else is ignored.
    pub fn rebuild(
        &mut self,
        host: &dyn WorldHost,
        roster: &ParticipantRoster,
    ) -> RegistryBuildStats {
        self.clear();
        let mut stats = RegistryBuildStats::default();

        for id in host.live_entities() {
            if host.is_destroy_flagged(id) {
                continue;
            }
            let Some(kind) = host.entity_kind(id) else {
                continue;
            };

            if kind == EntityKind::ShoppingCart {
                let Some(participant) = roster.by_cart(id) else {
                    stats.unknown_carts = stats.unknown_carts.saturating_add(1);
                    debug!(entity = id.0, "registry_unknown_cart");
                    continue;
                };
                let Some(cart_position) = host.world_position(id) else {
                    stats.skipped_without_pose = stats.skipped_without_pose.saturating_add(1);
                    debug!(entity = id.0, "registry_skipped_without_pose");
                    continue;
                };
                for slot in participant
                    .shopping_list()
                    .iter()
                    .filter(|slot| slot.collected)
                {
                    self.lists[slot.category.index()].push(ItemLocation::carried(
                        cart_position,
                        slot.category.target_kind(),
                        id,
                    ));
                    stats.carried = stats.carried.saturating_add(1);
                }
                continue;
            }

            let Some(category) = ItemCategory::from_entity_kind(kind) else {
                continue;
            };
            let Some(position) = host.world_position(id) else {
                stats.skipped_without_pose = stats.skipped_without_pose.saturating_add(1);
                debug!(entity = id.0, category = ?category, "registry_skipped_without_pose");
                continue;
            };
            self.lists[category.index()].push(ItemLocation::in_world(
                position,
                category.target_kind(),
                id,
            ));
            stats.in_world = stats.in_world.saturating_add(1);
        }

        stats
    }

    /// Appends a location for an instance spawned after this tick's rebuild.
    pub fn record_spawn(&mut self, category: ItemCategory, location: ItemLocation) {
        self.lists[category.index()].push(location);
    }

    pub fn locations(&self, category: ItemCategory) -> &[ItemLocation] {
        &self.lists[category.index()]
    }

    pub fn count(&self, category: ItemCategory) -> usize {
        self.lists[category.index()].len()
    }

    pub fn total(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        for list in &mut self.lists {
            list.clear();
        }
    }
}
