use engine::{EntityId, EntityKind, Vec3};
use serde::{Deserialize, Serialize};

use super::SHOPPING_LIST_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemClass {
    Currency,
    Drink,
    Fruit,
    Veggie,
    UrgentPickup,
    BonusPickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolId {
    SpareChange,
    Drinks,
    Fruit,
    Veggies,
}

impl PoolId {
    pub const ALL: [PoolId; 4] = [
        PoolId::SpareChange,
        PoolId::Drinks,
        PoolId::Fruit,
        PoolId::Veggies,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::SpareChange => 0,
            Self::Drinks => 1,
            Self::Fruit => 2,
            Self::Veggies => 3,
        }
    }

    /// Currency slots respawn on a per-slot cooldown; the grocery pools chase
    /// capacity every tick.
    pub fn is_timer_gated(self) -> bool {
        matches!(self, Self::SpareChange)
    }
}

/// What a bot is heading for. Only the two global pickups and the hot-potato
/// hand-off carry special meaning for steering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    StartingCookie,
    MysteryBag,
    PassOffHotPotato,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    StartingCookie,
    MysteryBag,
    SpareChange,
    Milk,
    Water,
    Cola,
    Apple,
    Watermelon,
    Banana,
    Carrot,
    Eggplant,
    Broccoli,
}

/// Row of the category capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub category: ItemCategory,
    pub entity_kind: EntityKind,
    pub class: ItemClass,
    pub pool: Option<PoolId>,
    pub target_kind: TargetKind,
    pub debug_name: &'static str,
}

const fn row(
    category: ItemCategory,
    entity_kind: EntityKind,
    class: ItemClass,
    pool: Option<PoolId>,
    target_kind: TargetKind,
    debug_name: &'static str,
) -> CategoryInfo {
    CategoryInfo {
        category,
        entity_kind,
        class,
        pool,
        target_kind,
        debug_name,
    }
}

/// Indexed by `ItemCategory::index`.
pub const ITEM_CATALOGUE: [CategoryInfo; ItemCategory::COUNT] = [
    row(
        ItemCategory::StartingCookie,
        EntityKind::StartingCookie,
        ItemClass::UrgentPickup,
        None,
        TargetKind::StartingCookie,
        "starting_cookie",
    ),
    row(
        ItemCategory::MysteryBag,
        EntityKind::MysteryBag,
        ItemClass::BonusPickup,
        None,
        TargetKind::MysteryBag,
        "mystery_bag",
    ),
    row(
        ItemCategory::SpareChange,
        EntityKind::SpareChange,
        ItemClass::Currency,
        Some(PoolId::SpareChange),
        TargetKind::Other,
        "spare_change",
    ),
    row(
        ItemCategory::Milk,
        EntityKind::Milk,
        ItemClass::Drink,
        Some(PoolId::Drinks),
        TargetKind::Other,
        "milk",
    ),
    row(
        ItemCategory::Water,
        EntityKind::Water,
        ItemClass::Drink,
        Some(PoolId::Drinks),
        TargetKind::Other,
        "water",
    ),
    row(
        ItemCategory::Cola,
        EntityKind::Cola,
        ItemClass::Drink,
        Some(PoolId::Drinks),
        TargetKind::Other,
        "cola",
    ),
    row(
        ItemCategory::Apple,
        EntityKind::Apple,
        ItemClass::Fruit,
        Some(PoolId::Fruit),
        TargetKind::Other,
        "apple",
    ),
    row(
        ItemCategory::Watermelon,
        EntityKind::Watermelon,
        ItemClass::Fruit,
        Some(PoolId::Fruit),
        TargetKind::Other,
        "watermelon",
    ),
    row(
        ItemCategory::Banana,
        EntityKind::Banana,
        ItemClass::Fruit,
        Some(PoolId::Fruit),
        TargetKind::Other,
        "banana",
    ),
    row(
        ItemCategory::Carrot,
        EntityKind::Carrot,
        ItemClass::Veggie,
        Some(PoolId::Veggies),
        TargetKind::Other,
        "carrot",
    ),
    row(
        ItemCategory::Eggplant,
        EntityKind::Eggplant,
        ItemClass::Veggie,
        Some(PoolId::Veggies),
        TargetKind::Other,
        "eggplant",
    ),
    row(
        ItemCategory::Broccoli,
        EntityKind::Broccoli,
        ItemClass::Veggie,
        Some(PoolId::Veggies),
        TargetKind::Other,
        "broccoli",
    ),
];

impl ItemCategory {
    pub const COUNT: usize = 12;

    pub const ALL: [ItemCategory; Self::COUNT] = [
        ItemCategory::StartingCookie,
        ItemCategory::MysteryBag,
        ItemCategory::SpareChange,
        ItemCategory::Milk,
        ItemCategory::Water,
        ItemCategory::Cola,
        ItemCategory::Apple,
        ItemCategory::Watermelon,
        ItemCategory::Banana,
        ItemCategory::Carrot,
        ItemCategory::Eggplant,
        ItemCategory::Broccoli,
    ];

    /// Shopping-list items, in spawn order.
    pub const GROCERIES: [ItemCategory; 9] = [
        ItemCategory::Milk,
        ItemCategory::Water,
        ItemCategory::Cola,
        ItemCategory::Apple,
        ItemCategory::Watermelon,
        ItemCategory::Banana,
        ItemCategory::Carrot,
        ItemCategory::Eggplant,
        ItemCategory::Broccoli,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn info(self) -> &'static CategoryInfo {
        &ITEM_CATALOGUE[self.index()]
    }

    pub fn from_entity_kind(kind: EntityKind) -> Option<Self> {
        ITEM_CATALOGUE
            .iter()
            .find(|info| info.entity_kind == kind)
            .map(|info| info.category)
    }

    pub fn entity_kind(self) -> EntityKind {
        self.info().entity_kind
    }

    pub fn class(self) -> ItemClass {
        self.info().class
    }

    pub fn pool(self) -> Option<PoolId> {
        self.info().pool
    }

    pub fn target_kind(self) -> TargetKind {
        self.info().target_kind
    }

    pub fn debug_name(self) -> &'static str {
        self.info().debug_name
    }

    pub fn is_grocery(self) -> bool {
        matches!(
            self.class(),
            ItemClass::Drink | ItemClass::Fruit | ItemClass::Veggie
        )
    }
}

/// Where a trackable pickup is this tick. Built fresh every tick and never
/// edited in place; `with_position` returns a new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemLocation {
    position: Vec3,
    in_world: bool,
    target_kind: TargetKind,
    entity: EntityId,
}

impl ItemLocation {
    pub fn in_world(position: Vec3, target_kind: TargetKind, entity: EntityId) -> Self {
        Self {
            position,
            in_world: true,
            target_kind,
            entity,
        }
    }

    /// An item riding in a cart. Positioned at, and referencing, the cart.
    pub fn carried(cart_position: Vec3, target_kind: TargetKind, cart: EntityId) -> Self {
        Self {
            position: cart_position,
            in_world: false,
            target_kind,
            entity: cart,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn is_in_world(&self) -> bool {
        self.in_world
    }

    pub fn target_kind(&self) -> TargetKind {
        self.target_kind
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn with_position(self, position: Vec3) -> Self {
        Self { position, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Human,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShoppingListSlot {
    pub category: ItemCategory,
    /// The item is riding in this participant's cart.
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    name: String,
    control: ControlKind,
    cart: Option<EntityId>,
    shopping_list: [ShoppingListSlot; SHOPPING_LIST_LEN],
    points: u32,
    has_hot_potato: bool,
    bash_protection_seconds: f32,
    targets: Vec<ItemLocation>,
}

impl Participant {
    pub fn new(
        name: impl Into<String>,
        control: ControlKind,
        shopping_list: [ItemCategory; SHOPPING_LIST_LEN],
    ) -> Self {
        Self {
            name: name.into(),
            control,
            cart: None,
            shopping_list: shopping_list.map(|category| ShoppingListSlot {
                category,
                collected: false,
            }),
            points: 0,
            has_hot_potato: false,
            bash_protection_seconds: 0.0,
            targets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control(&self) -> ControlKind {
        self.control
    }

    pub fn is_bot(&self) -> bool {
        self.control == ControlKind::Bot
    }

    pub fn cart(&self) -> Option<EntityId> {
        self.cart
    }

    pub fn set_cart(&mut self, cart: Option<EntityId>) {
        self.cart = cart;
    }

    pub fn shopping_list(&self) -> &[ShoppingListSlot; SHOPPING_LIST_LEN] {
        &self.shopping_list
    }

    /// Marks the first uncollected slot of `category` as collected. Returns
    /// `false` when no such slot exists.
    pub fn collect(&mut self, category: ItemCategory) -> bool {
        match self
            .shopping_list
            .iter_mut()
            .find(|slot| slot.category == category && !slot.collected)
        {
            Some(slot) => {
                slot.collected = true;
                true
            }
            None => false,
        }
    }

    /// Inverse of `collect`: the item leaves the cart.
    pub fn drop_collected(&mut self, category: ItemCategory) -> bool {
        match self
            .shopping_list
            .iter_mut()
            .find(|slot| slot.category == category && slot.collected)
        {
            Some(slot) => {
                slot.collected = false;
                true
            }
            None => false,
        }
    }

    pub fn needs(&self, category: ItemCategory) -> bool {
        self.shopping_list
            .iter()
            .any(|slot| slot.category == category && !slot.collected)
    }

    pub fn is_carrying(&self, category: ItemCategory) -> bool {
        self.shopping_list
            .iter()
            .any(|slot| slot.category == category && slot.collected)
    }

    pub fn list_complete(&self) -> bool {
        self.shopping_list.iter().all(|slot| slot.collected)
    }

    pub fn clear_collected(&mut self) {
        for slot in &mut self.shopping_list {
            slot.collected = false;
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn add_points(&mut self, points: u32) {
        self.points = self.points.saturating_add(points);
    }

    pub fn has_hot_potato(&self) -> bool {
        self.has_hot_potato
    }

    pub fn set_hot_potato(&mut self, held: bool) {
        self.has_hot_potato = held;
    }

    pub fn is_bash_protected(&self) -> bool {
        self.bash_protection_seconds > 0.0
    }

    pub fn bash_protection_seconds(&self) -> f32 {
        self.bash_protection_seconds
    }

    pub fn set_bash_protection(&mut self, seconds: f32) {
        self.bash_protection_seconds = seconds.max(0.0);
    }

    pub fn decay_bash_protection(&mut self, dt_seconds: f32) {
        self.bash_protection_seconds = (self.bash_protection_seconds - dt_seconds).max(0.0);
    }

    /// Zero or one entry after arbitration.
    pub fn targets(&self) -> &[ItemLocation] {
        &self.targets
    }

    pub fn set_target(&mut self, target: Option<ItemLocation>) {
        self.targets.clear();
        self.targets.extend(target);
    }

    /// Back to the state the participant starts a match in. Name, control
    /// and shopping list categories survive.
    pub fn reset_for_match(&mut self) {
        self.cart = None;
        self.clear_collected();
        self.points = 0;
        self.has_hot_potato = false;
        self.bash_protection_seconds = 0.0;
        self.targets.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantRoster {
    participants: Vec<Participant>,
}

impl ParticipantRoster {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self { participants }
    }

    pub fn push(&mut self, participant: Participant) {
        self.participants.push(participant);
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Participant> {
        self.participants.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.iter_mut()
    }

    pub fn index_of_cart(&self, cart: EntityId) -> Option<usize> {
        self.participants
            .iter()
            .position(|participant| participant.cart == Some(cart))
    }

    pub fn by_cart(&self, cart: EntityId) -> Option<&Participant> {
        self.index_of_cart(cart)
            .and_then(|index| self.participants.get(index))
    }

    pub fn reset_for_match(&mut self) {
        for participant in &mut self.participants {
            participant.reset_for_match();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_rows_line_up_with_category_indices() {
        for (index, info) in ITEM_CATALOGUE.iter().enumerate() {
            assert_eq!(info.category.index(), index);
            assert_eq!(ItemCategory::ALL[index], info.category);
            assert_eq!(
                ItemCategory::from_entity_kind(info.entity_kind),
                Some(info.category)
            );
        }
    }

    #[test]
    fn every_grocery_maps_to_its_own_class_pool() {
        for category in ItemCategory::GROCERIES {
            let expected = match category.class() {
                ItemClass::Drink => PoolId::Drinks,
                ItemClass::Fruit => PoolId::Fruit,
                ItemClass::Veggie => PoolId::Veggies,
                other => panic!("unexpected grocery class {other:?}"),
            };
            assert_eq!(category.pool(), Some(expected));
            assert!(category.is_grocery());
        }
        assert!(!ItemCategory::SpareChange.is_grocery());
        assert_eq!(ItemCategory::StartingCookie.pool(), None);
    }

    #[test]
    fn carts_and_props_are_not_tracked_categories() {
        assert_eq!(ItemCategory::from_entity_kind(EntityKind::ShoppingCart), None);
        assert_eq!(ItemCategory::from_entity_kind(EntityKind::Prop), None);
    }

    #[test]
    fn with_position_leaves_the_original_untouched() {
        let original = ItemLocation::in_world(Vec3::new(1.0, 0.0, 0.0), TargetKind::Other, EntityId(4));
        let moved = original.with_position(Vec3::new(9.0, 0.0, 0.0));

        assert_eq!(original.position(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(moved.position(), Vec3::new(9.0, 0.0, 0.0));
        assert_eq!(moved.entity(), original.entity());
        assert!(moved.is_in_world());
    }

    #[test]
    fn collect_marks_one_slot_per_call() {
        let mut participant = Participant::new(
            "bot",
            ControlKind::Bot,
            [ItemCategory::Milk, ItemCategory::Milk, ItemCategory::Apple],
        );

        assert!(participant.collect(ItemCategory::Milk));
        assert!(participant.needs(ItemCategory::Milk));
        assert!(participant.collect(ItemCategory::Milk));
        assert!(!participant.needs(ItemCategory::Milk));
        assert!(!participant.collect(ItemCategory::Milk));
        assert!(!participant.list_complete());
        assert!(participant.collect(ItemCategory::Apple));
        assert!(participant.list_complete());
    }

    #[test]
    fn set_target_keeps_at_most_one_entry() {
        let mut participant = Participant::new(
            "bot",
            ControlKind::Bot,
            [ItemCategory::Milk, ItemCategory::Water, ItemCategory::Cola],
        );
        let target = ItemLocation::in_world(Vec3::ZERO, TargetKind::Other, EntityId(1));
        participant.set_target(Some(target));
        participant.set_target(Some(target));
        assert_eq!(participant.targets().len(), 1);

        participant.set_target(None);
        assert!(participant.targets().is_empty());
    }

    #[test]
    fn bash_protection_decays_to_zero() {
        let mut participant = Participant::new(
            "bot",
            ControlKind::Bot,
            [ItemCategory::Milk, ItemCategory::Water, ItemCategory::Cola],
        );
        participant.set_bash_protection(1.0);
        assert!(participant.is_bash_protected());
        participant.decay_bash_protection(0.6);
        assert!(participant.is_bash_protected());
        participant.decay_bash_protection(0.6);
        assert!(!participant.is_bash_protected());
        assert_eq!(participant.bash_protection_seconds(), 0.0);
    }
}
