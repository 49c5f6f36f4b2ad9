//=========================================================================
// Sensor Zone Entity
//=========================================================================
//
// An invisible overlap trigger: drain at the bottom of the board, score
// multiplier lanes, extra-ball targets. Owns a rectangle sensor body
// and is the listening side of every sensor contact — the dispatcher
// notifies sensors, never the ball.
//
// The dispatcher re-fires while an overlap persists (once per step), so
// the zone edge-filters: the ball effect applies once per overlap
// episode, re-arming only after the overlap ends.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

//=== External Crates =====================================================

use glam::IVec2;
use log::error;

//=== Internal Imports ====================================================

use super::ball::Ball;
use super::Entity;
use crate::core::module::ModuleError;
use crate::core::physics::{
    layers, BodyKind, BodyProps, ColliderCategory, CollisionFilter, CollisionListener, PhysBody,
    PhysBodyHandle, Physics, SensorRole,
};

//=== SensorZone ==========================================================

pub struct SensorZone {
    physics: Rc<RefCell<Physics>>,
    ball: Rc<RefCell<Ball>>,

    body: Option<PhysBodyHandle>,
    role: SensorRole,

    /// Overlap edge detection across steps.
    touched_this_frame: bool,
    was_touching: bool,
}

impl SensorZone {
    pub fn create(
        physics: Rc<RefCell<Physics>>,
        ball: Rc<RefCell<Ball>>,
        center: IVec2,
        size: IVec2,
        role: SensorRole,
    ) -> Rc<RefCell<SensorZone>> {
        let zone = Rc::new(RefCell::new(SensorZone {
            physics,
            ball,
            body: None,
            role,
            touched_this_frame: false,
            was_touching: false,
        }));

        {
            let weak_zone = Rc::downgrade(&zone);
            let listener: Weak<RefCell<dyn CollisionListener>> = weak_zone;
            let mut this = zone.borrow_mut();
            let physics = this.physics.clone();
            let mut physics = physics.borrow_mut();

            match physics.create_rectangle_sensor(
                center.x,
                center.y,
                size.x,
                size.y,
                BodyKind::Static,
                BodyProps {
                    filter: CollisionFilter { category: layers::SENSOR, mask: layers::BALL },
                    ..BodyProps::default()
                },
            ) {
                Ok(handle) => {
                    physics.set_category(handle, ColliderCategory::Sensor);
                    physics.set_sensor_role(handle, role);
                    physics.set_listener(handle, listener);
                    this.body = Some(handle);
                }
                Err(e) => error!("Sensor zone construction failed: {}", e),
            }
        }

        zone
    }

    pub fn role(&self) -> SensorRole {
        self.role
    }
}

//=== Entity Implementation ===============================================

impl Entity for SensorZone {
    fn name(&self) -> &str {
        "sensor_zone"
    }

    /// Applies the role to the ball on the overlap's rising edge.
    /// Physics dispatched before this runs, so the edge is this frame's.
    fn update(&mut self, _dt: f32) -> Result<(), ModuleError> {
        if self.touched_this_frame && !self.was_touching {
            self.ball.borrow_mut().on_sensor(self.role);
        }
        self.was_touching = self.touched_this_frame;
        self.touched_this_frame = false;
        Ok(())
    }

    fn clean_up(&mut self) {
        if let Some(body) = self.body.take() {
            self.physics.borrow_mut().destroy_body(body);
        }
    }
}

//=== Collision Listener ==================================================

impl CollisionListener for SensorZone {
    fn on_collision(&mut self, _me: &PhysBody, other: &PhysBody) {
        if other.category() == ColliderCategory::Ball {
            self.touched_this_frame = true;
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
