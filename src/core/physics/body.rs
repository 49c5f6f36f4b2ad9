//=========================================================================
// PhysBody — Game-side Body Wrapper
//=========================================================================
//
// Binds a simulator rigid body to the gameplay layer: a collider
// category for dispatch routing, an optional sensor role, and a weak
// back-reference to the owning entity's collision listener. The physics
// module owns every PhysBody in a registry keyed by `PhysBodyHandle`;
// entities hold only the handle.
//
// The simulator's collider `user_data` carries the handle value so the
// contact dispatcher can map collider handles back to PhysBodies. A
// user_data of zero means "no game-side wrapper" (e.g. the drag anchor).
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

//=== External Crates =====================================================

use glam::Vec2;
use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};

//=== PhysBodyHandle ======================================================

/// Stable handle into the physics module's body registry.
///
/// Handles are never reused; a destroyed body's handle simply stops
/// resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysBodyHandle(pub(crate) u64);

impl PhysBodyHandle {
    /// Value stored in the simulator's `user_data` slot (0 = none).
    pub(crate) fn to_user_data(self) -> u128 {
        self.0 as u128
    }

    pub(crate) fn from_user_data(data: u128) -> Option<Self> {
        if data == 0 {
            None
        } else {
            Some(Self(data as u64))
        }
    }
}

//=== BodyKind ============================================================

/// Requested simulation behavior for a new body.
///
/// `Unknown` exists because body kinds arrive as config strings; the
/// factory treats it as a hard construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
    Kinematic,
    Unknown,
}

impl BodyKind {
    /// Parses a config-file kind string. Unrecognized values map to
    /// `Unknown`, which the factory rejects with a logged error.
    pub fn parse(s: &str) -> Self {
        match s {
            "dynamic" => Self::Dynamic,
            "static" => Self::Static,
            "kinematic" => Self::Kinematic,
            _ => Self::Unknown,
        }
    }
}

//=== Collider Routing Tags ===============================================

/// Gameplay routing tag for contact dispatch. Not a physical property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderCategory {
    Ball,
    Item,
    Sensor,
    Board,
    Anim,
    Unknown,
}

/// What a sensor does when the ball overlaps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorRole {
    Death,
    Power,
    HpUp,
}

impl SensorRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "death" => Some(Self::Death),
            "power" => Some(Self::Power),
            "hp_up" => Some(Self::HpUp),
            _ => None,
        }
    }
}

//=== Collision Filtering =================================================

/// Named collision-group bits shared by the board layout and entities.
pub mod layers {
    pub const BALL: u32 = 1 << 0;
    pub const BOARD: u32 = 1 << 1;
    pub const SENSOR: u32 = 1 << 2;
    pub const ITEM: u32 = 1 << 3;
    pub const FLIPPER: u32 = 1 << 4;
}

/// Collision category/mask pair applied to a new collider.
#[derive(Debug, Clone, Copy)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self { category: 1, mask: u32::MAX }
    }
}

//=== CollisionListener ===================================================

/// Gameplay-side contact callback contract.
///
/// Invoked by the contact dispatcher during the physics module's
/// pre_update, before any gameplay module updates. `me` is always the
/// body owned by the listener. Callbacks must record what happened and
/// react in their own update phase; re-entering the physics module from
/// inside a callback is a contract violation (it is already borrowed).
pub trait CollisionListener {
    fn on_collision(&mut self, me: &PhysBody, other: &PhysBody);
}

//=== PhysBody ============================================================

/// Game-side wrapper around one simulator body + collider.
pub struct PhysBody {
    pub(crate) body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,

    /// Half extents in pixels: (radius, radius) for circles,
    /// (w/2, h/2) for rectangles, zero for polygons and chains.
    pub(crate) half_extents: Vec2,

    pub(crate) category: ColliderCategory,
    pub(crate) sensor_role: Option<SensorRole>,
    pub(crate) listener: Option<Weak<RefCell<dyn CollisionListener>>>,
}

impl PhysBody {
    pub(crate) fn new(
        body: RigidBodyHandle,
        collider: ColliderHandle,
        half_extents: Vec2,
    ) -> Self {
        Self {
            body,
            collider,
            half_extents,
            category: ColliderCategory::Unknown,
            sensor_role: None,
            listener: None,
        }
    }

    pub fn category(&self) -> ColliderCategory {
        self.category
    }

    pub fn sensor_role(&self) -> Option<SensorRole> {
        self.sensor_role
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    /// Upgrades the weak listener back-reference, if the owner is alive.
    pub(crate) fn listener(&self) -> Option<Rc<RefCell<dyn CollisionListener>>> {
        self.listener.as_ref().and_then(Weak::upgrade)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_kind_parses_config_strings() {
        assert_eq!(BodyKind::parse("dynamic"), BodyKind::Dynamic);
        assert_eq!(BodyKind::parse("static"), BodyKind::Static);
        assert_eq!(BodyKind::parse("kinematic"), BodyKind::Kinematic);
        assert_eq!(BodyKind::parse("bouncy"), BodyKind::Unknown);
    }

    #[test]
    fn sensor_role_parses_known_roles_only() {
        assert_eq!(SensorRole::parse("death"), Some(SensorRole::Death));
        assert_eq!(SensorRole::parse("power"), Some(SensorRole::Power));
        assert_eq!(SensorRole::parse("hp_up"), Some(SensorRole::HpUp));
        assert_eq!(SensorRole::parse("teleport"), None);
    }

    #[test]
    fn user_data_zero_is_no_handle() {
        assert_eq!(PhysBodyHandle::from_user_data(0), None);
        let handle = PhysBodyHandle(7);
        assert_eq!(PhysBodyHandle::from_user_data(handle.to_user_data()), Some(handle));
    }

    #[test]
    fn default_filter_collides_with_everything() {
        let filter = CollisionFilter::default();
        assert_eq!(filter.category, 1);
        assert_eq!(filter.mask, u32::MAX);
    }

    #[test]
    fn dead_listener_upgrades_to_none() {
        struct Nobody;
        impl CollisionListener for Nobody {
            fn on_collision(&mut self, _me: &PhysBody, _other: &PhysBody) {}
        }

        let owner: Rc<RefCell<Nobody>> = Rc::new(RefCell::new(Nobody));
        let weak_owner = Rc::downgrade(&owner);
        let weak: Weak<RefCell<dyn CollisionListener>> = weak_owner;

        let mut body = PhysBody::new(
            RigidBodyHandle::invalid(),
            ColliderHandle::invalid(),
            Vec2::ZERO,
        );
        body.listener = Some(weak);

        assert!(body.listener().is_some());
        drop(owner);
        assert!(body.listener().is_none());
    }
}
