//=========================================================================
// Plunger Entity
//=========================================================================
//
// The launch rod in the shooter lane: a dynamic head sliding vertically
// against a static base on a motorized prismatic joint. Holding the
// launch key winds the head down; releasing slams the motor upward,
// scaled by how long the player charged.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== External Crates =====================================================

use glam::{IVec2, Vec2};
use log::error;

//=== Internal Imports ====================================================

use super::{Entity, Visual};
use crate::core::input::{Input, KeyCode};
use crate::core::module::ModuleError;
use crate::core::physics::{
    layers, BodyKind, BodyProps, ColliderCategory, CollisionFilter, ImpulseJointHandle,
    PhysBodyHandle, Physics, PrismaticJointConfig,
};
use crate::core::render::Render;

//=== Tuning ==============================================================

const LAUNCH_KEY: KeyCode = KeyCode::Space;
const HEAD_WIDTH: i32 = 24;
const HEAD_HEIGHT: i32 = 16;
const BASE_SIZE: i32 = 8;

/// Seconds of charge for a full-strength launch.
const FULL_CHARGE: f32 = 1.0;

//=== Plunger =============================================================

pub struct Plunger {
    physics: Rc<RefCell<Physics>>,
    input: Rc<RefCell<Input>>,

    joint_config: PrismaticJointConfig,
    base: Option<PhysBodyHandle>,
    head: Option<PhysBodyHandle>,
    joint: Option<ImpulseJointHandle>,
    visual: Visual,

    charge: f32,
}

impl Plunger {
    pub fn create(
        physics: Rc<RefCell<Physics>>,
        input: Rc<RefCell<Input>>,
        position: IVec2,
        joint_config: PrismaticJointConfig,
        visual: Visual,
    ) -> Rc<RefCell<Plunger>> {
        let plunger = Rc::new(RefCell::new(Plunger {
            physics,
            input,
            joint_config,
            base: None,
            head: None,
            joint: None,
            visual,
            charge: 0.0,
        }));

        plunger.borrow_mut().build(position);
        plunger
    }

    fn build(&mut self, position: IVec2) {
        let mut physics = self.physics.borrow_mut();

        let base = match physics.create_rectangle(
            position.x,
            position.y + HEAD_HEIGHT,
            BASE_SIZE,
            BASE_SIZE,
            BodyKind::Static,
            BodyProps {
                filter: CollisionFilter { category: layers::BOARD, mask: 0 },
                ..BodyProps::default()
            },
        ) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Plunger base construction failed: {}", e);
                return;
            }
        };

        let head = match physics.create_rectangle(
            position.x,
            position.y,
            HEAD_WIDTH,
            HEAD_HEIGHT,
            BodyKind::Dynamic,
            BodyProps {
                filter: CollisionFilter { category: layers::BOARD, mask: layers::BALL },
                ..BodyProps::default()
            },
        ) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Plunger head construction failed: {}", e);
                return;
            }
        };
        physics.set_category(head, ColliderCategory::Board);

        match physics.create_prismatic_joint(
            base,
            head,
            IVec2::ZERO,
            IVec2::new(0, HEAD_HEIGHT),
            &self.joint_config,
        ) {
            Ok(joint) => self.joint = Some(joint),
            Err(e) => error!("Plunger joint construction failed: {}", e),
        }

        self.base = Some(base);
        self.head = Some(head);
    }

    pub fn charge(&self) -> f32 {
        self.charge
    }
}

//=== Entity Implementation ===============================================

impl Entity for Plunger {
    fn name(&self) -> &str {
        "plunger"
    }

    fn update(&mut self, dt: f32) -> Result<(), ModuleError> {
        self.visual.advance(dt);

        let Some(joint) = self.joint else {
            return Ok(());
        };
        if !self.joint_config.enable_motor {
            return Ok(());
        }

        let (held, released) = {
            let input = self.input.borrow();
            (input.is_key_down(LAUNCH_KEY), input.is_key_released(LAUNCH_KEY))
        };

        if held {
            self.charge = (self.charge + dt / FULL_CHARGE).min(1.0);
            // Wind the head down-lane while charging.
            self.physics.borrow_mut().set_linear_motor_velocity(
                joint,
                self.joint_config.motor_speed,
                1.0,
            );
        } else if released {
            let strength = self.charge.max(0.1);
            self.physics.borrow_mut().set_linear_motor_velocity(
                joint,
                -self.joint_config.motor_speed * 4.0 * strength,
                1.0,
            );
            self.charge = 0.0;
        }
        Ok(())
    }

    fn draw(&self, render: &mut Render) {
        let Some(texture) = self.visual.current() else {
            return;
        };
        let Some(head) = self.head else {
            return;
        };

        let physics = self.physics.borrow();
        if let Some(position) = physics.position(head) {
            render.draw_sprite(texture, Vec2::new(position.x as f32, position.y as f32), 0.0);
        }
    }

    fn clean_up(&mut self) {
        let mut physics = self.physics.borrow_mut();
        if let Some(joint) = self.joint.take() {
            physics.destroy_joint(joint);
        }
        if let Some(head) = self.head.take() {
            physics.destroy_body(head);
        }
        if let Some(base) = self.base.take() {
            physics.destroy_body(base);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
