use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::audio::AudioRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(value: [f32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(value: Vec3) -> Self {
        [value.x, value.y, value.z]
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Spawn transform. Rotation is a heading around the vertical axis; spawn
/// points in the store are all upright.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw_radians: Option<f32>,
}

impl Pose {
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw_radians: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    ShoppingCart,
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
    Prop,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pose: Pose,
    pub debug_name: String,
    destroy_flag: bool,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn is_destroy_flagged(&self) -> bool {
        self.destroy_flag
    }

    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }

    /// Live position, or `None` when the body has no usable pose.
    pub fn live_position(&self) -> Option<Vec3> {
        let position = self.pose.position;
        position.is_finite().then_some(position)
    }
}

/// Contract the gameplay core uses to observe and populate the world.
///
/// Handles are non-owning: the world decides when an entity actually goes
/// away, the core only requests instantiation and watches destroy flags.
pub trait WorldHost {
    /// Entities that are not destroy-flagged, in stable spawn order.
    fn live_entities(&self) -> Vec<EntityId>;
    fn entity_kind(&self, id: EntityId) -> Option<EntityKind>;
    /// `None` for unknown handles and bodies without a finite pose.
    fn world_position(&self, id: EntityId) -> Option<Vec3>;
    fn instantiate(&mut self, kind: EntityKind, pose: Pose, debug_name: &str) -> EntityId;
    /// Unknown handles report `true`.
    fn is_destroy_flagged(&self, id: EntityId) -> bool;
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    next_applied_spawn_order: u64,
    audio_requests: Vec<AudioRequest>,
}

impl SceneWorld {
    pub fn spawn(&mut self, kind: EntityKind, pose: Pose, debug_name: &str) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            kind,
            pose,
            debug_name: debug_name.to_string(),
            destroy_flag: false,
            applied_spawn_order: 0,
        });
        id
    }

    /// Marks an entity for removal at the next `apply_pending`. Returns
    /// `false` for unknown handles.
    pub fn flag_destroy(&mut self, id: EntityId) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.destroy_flag = true;
                true
            }
            None => false,
        }
    }

    pub fn apply_pending(&mut self) {
        self.entities.retain(|entity| !entity.destroy_flag);

        if !self.pending_spawns.is_empty() {
            for mut entity in self.pending_spawns.drain(..) {
                if entity.destroy_flag {
                    continue;
                }
                entity.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.entities.push(entity);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.next_applied_spawn_order = 0;
        self.audio_requests.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .chain(self.pending_spawns.iter_mut())
            .find(|entity| entity.id == id)
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.pose.position = position;
                true
            }
            None => false,
        }
    }

    pub fn count_live_of_kind(&self, kind: EntityKind) -> usize {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .filter(|entity| entity.kind == kind && !entity.destroy_flag)
            .count()
    }

    pub fn push_audio_request(&mut self, request: AudioRequest) {
        self.audio_requests.push(request);
    }

    pub fn drain_audio_requests(&mut self) -> Vec<AudioRequest> {
        std::mem::take(&mut self.audio_requests)
    }
}

impl WorldHost for SceneWorld {
    fn live_entities(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .filter(|entity| !entity.destroy_flag)
            .map(|entity| entity.id)
            .collect()
    }

    fn entity_kind(&self, id: EntityId) -> Option<EntityKind> {
        self.find_entity(id).map(|entity| entity.kind)
    }

    fn world_position(&self, id: EntityId) -> Option<Vec3> {
        self.find_entity(id).and_then(Entity::live_position)
    }

    fn instantiate(&mut self, kind: EntityKind, pose: Pose, debug_name: &str) -> EntityId {
        self.spawn(kind, pose, debug_name)
    }

    fn is_destroy_flagged(&self, id: EntityId) -> bool {
        self.find_entity(id)
            .map_or(true, |entity| entity.destroy_flag)
    }
}
