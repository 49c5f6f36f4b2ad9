//=========================================================================
// Flipper Entity
//=========================================================================
//
// A paddle pinned to a static anchor by a motorized revolute joint.
// The joint config (limits, motor speed, torque) comes from the scene
// configuration as a named struct; the input edge only flips the motor
// direction. Left and right flippers are mirrors of each other: same
// geometry, opposite motor signs, opposite arrow keys.
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
    PhysBodyHandle, Physics, RevoluteJointConfig,
};
use crate::core::render::Render;

//=== FlipperSide =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipperSide {
    Left,
    Right,
}

impl FlipperSide {
    fn key(self) -> KeyCode {
        match self {
            Self::Left => KeyCode::ArrowLeft,
            Self::Right => KeyCode::ArrowRight,
        }
    }

    /// Pressing flips upward: counterclockwise for the left paddle,
    /// clockwise for the right (screen-space +y is down).
    fn motor_sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

//=== Geometry ============================================================

const ANCHOR_RADIUS: i32 = 5;
const PADDLE_WIDTH: i32 = 50;
const PADDLE_HEIGHT: i32 = 12;

//=== Flipper =============================================================

pub struct Flipper {
    physics: Rc<RefCell<Physics>>,
    input: Rc<RefCell<Input>>,

    side: FlipperSide,
    joint_config: RevoluteJointConfig,

    anchor: Option<PhysBodyHandle>,
    paddle: Option<PhysBodyHandle>,
    joint: Option<ImpulseJointHandle>,
    visual: Visual,

    pressed_last_frame: bool,
}

impl Flipper {
    pub fn create(
        physics: Rc<RefCell<Physics>>,
        input: Rc<RefCell<Input>>,
        side: FlipperSide,
        pivot: IVec2,
        joint_config: RevoluteJointConfig,
        visual: Visual,
    ) -> Rc<RefCell<Flipper>> {
        let flipper = Rc::new(RefCell::new(Flipper {
            physics,
            input,
            side,
            joint_config,
            anchor: None,
            paddle: None,
            joint: None,
            visual,
            pressed_last_frame: false,
        }));

        flipper.borrow_mut().build(pivot);
        flipper
    }

    /// Builds anchor, paddle, and the revolute joint between them. The
    /// paddle's near edge sits on the pivot so it sweeps like a real
    /// flipper arm.
    fn build(&mut self, pivot: IVec2) {
        let mut physics = self.physics.borrow_mut();

        let anchor = match physics.create_circle(
            pivot.x,
            pivot.y,
            ANCHOR_RADIUS,
            BodyKind::Static,
            BodyProps {
                filter: CollisionFilter { category: layers::BOARD, mask: 0 },
                ..BodyProps::default()
            },
        ) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Flipper anchor construction failed: {}", e);
                return;
            }
        };

        let reach = match self.side {
            FlipperSide::Left => PADDLE_WIDTH / 2,
            FlipperSide::Right => -PADDLE_WIDTH / 2,
        };
        let paddle = match physics.create_rectangle(
            pivot.x + reach,
            pivot.y,
            PADDLE_WIDTH,
            PADDLE_HEIGHT,
            BodyKind::Dynamic,
            BodyProps {
                filter: CollisionFilter { category: layers::FLIPPER, mask: layers::BALL },
                ..BodyProps::default()
            },
        ) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Flipper paddle construction failed: {}", e);
                return;
            }
        };
        physics.set_category(paddle, ColliderCategory::Board);

        let body_offset = IVec2::new(-reach, 0);
        match physics.create_revolute_joint(
            anchor,
            paddle,
            IVec2::ZERO,
            body_offset,
            &self.joint_config,
        ) {
            Ok(joint) => {
                // Rest direction: motor drives toward the lower limit
                // until the player presses.
                if self.joint_config.enable_motor {
                    physics.set_angular_motor_velocity(
                        joint,
                        -self.side.motor_sign() * self.joint_config.motor_speed,
                        1.0,
                    );
                }
                self.joint = Some(joint);
            }
            Err(e) => error!("Flipper joint construction failed: {}", e),
        }

        self.anchor = Some(anchor);
        self.paddle = Some(paddle);
    }
}

//=== Entity Implementation ===============================================

impl Entity for Flipper {
    fn name(&self) -> &str {
        match self.side {
            FlipperSide::Left => "flipper_left",
            FlipperSide::Right => "flipper_right",
        }
    }

    /// Drives the joint motor from the arrow-key state: held flips the
    /// paddle up, released lets the motor swing it back to rest.
    fn update(&mut self, dt: f32) -> Result<(), ModuleError> {
        self.visual.advance(dt);

        let Some(joint) = self.joint else {
            return Ok(());
        };
        if !self.joint_config.enable_motor {
            return Ok(());
        }

        let pressed = self.input.borrow().is_key_down(self.side.key());
        if pressed != self.pressed_last_frame {
            let direction = if pressed { self.side.motor_sign() } else { -self.side.motor_sign() };
            self.physics.borrow_mut().set_angular_motor_velocity(
                joint,
                direction * self.joint_config.motor_speed,
                1.0,
            );
            self.pressed_last_frame = pressed;
        }
        Ok(())
    }

    fn draw(&self, render: &mut Render) {
        let Some(texture) = self.visual.current() else {
            return;
        };
        let Some(paddle) = self.paddle else {
            return;
        };

        let physics = self.physics.borrow();
        if let (Some(position), Some(rotation)) =
            (physics.position(paddle), physics.rotation_deg(paddle))
        {
            render.draw_sprite(texture, Vec2::new(position.x as f32, position.y as f32), rotation);
        }
    }

    fn clean_up(&mut self) {
        let mut physics = self.physics.borrow_mut();
        if let Some(joint) = self.joint.take() {
            physics.destroy_joint(joint);
        }
        if let Some(paddle) = self.paddle.take() {
            physics.destroy_body(paddle);
        }
        if let Some(anchor) = self.anchor.take() {
            physics.destroy_body(anchor);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::AppSignals;
    use crate::core::render::{NullSink, Render as RenderModule};
    use crate::core::window::Window;

    fn world() -> (Rc<RefCell<Physics>>, Rc<RefCell<Input>>) {
        let signals = AppSignals::new();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let input = Rc::new(RefCell::new(Input::new(rx, signals)));
        let window = Rc::new(RefCell::new(Window::new()));
        let render = Rc::new(RefCell::new(RenderModule::new(Box::new(NullSink), window)));
        (Rc::new(RefCell::new(Physics::new(input.clone(), render))), input)
    }

    fn joint_config() -> RevoluteJointConfig {
        RevoluteJointConfig {
            enable_limit: true,
            min_angle: -30.0,
            max_angle: 30.0,
            enable_motor: true,
            motor_speed: 15.0,
            max_torque: 400.0,
        }
    }

    #[test]
    fn create_builds_anchor_paddle_and_joint() {
        let (physics, input) = world();
        let flipper = Flipper::create(
            physics.clone(),
            input,
            FlipperSide::Left,
            IVec2::new(200, 900),
            joint_config(),
            Visual::None,
        );

        let flipper = flipper.borrow();
        assert!(flipper.anchor.is_some());
        assert!(flipper.paddle.is_some());
        assert!(flipper.joint.is_some());
        assert_eq!(physics.borrow().body_count(), 2);
    }

    #[test]
    fn clean_up_removes_everything_it_built() {
        let (physics, input) = world();
        let flipper = Flipper::create(
            physics.clone(),
            input,
            FlipperSide::Right,
            IVec2::new(380, 900),
            joint_config(),
            Visual::None,
        );

        flipper.borrow_mut().clean_up();
        assert_eq!(physics.borrow().body_count(), 0);
    }

    #[test]
    fn sides_mirror_keys_and_motor_signs() {
        assert_eq!(FlipperSide::Left.key(), KeyCode::ArrowLeft);
        assert_eq!(FlipperSide::Right.key(), KeyCode::ArrowRight);
        assert_eq!(FlipperSide::Left.motor_sign(), -FlipperSide::Right.motor_sign());
    }
}
