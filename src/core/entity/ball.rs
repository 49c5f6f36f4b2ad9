//=========================================================================
// Ball Entity
//=========================================================================
//
// The one dynamic actor the whole board exists to push around. Owns a
// circle PhysBody (category Ball, filtered against board, items,
// flippers and sensors) and listens for solid contacts: items score,
// walls just thud.
//
// Sensor effects (drain, score multiplier, extra ball) arrive through
// `on_sensor`, called by the sensor zones — the ball itself never hears
// sensor overlap from the dispatcher, by contract.
//
// Losing the ball destroys the body and recreates it at the spawn
// point; the handle changes, the entity stays.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

//=== External Crates =====================================================

use glam::{IVec2, Vec2};
use log::{debug, error};

//=== Internal Imports ====================================================

use super::{Entity, Visual};
use crate::core::module::ModuleError;
use crate::core::physics::{
    layers, BodyKind, BodyProps, ColliderCategory, CollisionFilter, CollisionListener, PhysBody,
    PhysBodyHandle, Physics, SensorRole,
};
use crate::core::render::Render;

//=== Tuning ==============================================================

const BALL_RESTITUTION: f32 = 0.7;
const SCORE_CAP: u32 = 99_999;
const ITEM_SCORE: u32 = 100;
const STARTING_HP: i32 = 3;

//=== Ball ================================================================

pub struct Ball {
    physics: Rc<RefCell<Physics>>,

    /// Pre-coerced weak self-reference for listener wiring, so body
    /// rebuilds never need the owning Rc.
    self_listener: Option<Weak<RefCell<dyn CollisionListener>>>,

    body: Option<PhysBodyHandle>,
    spawn: IVec2,
    radius: i32,
    visual: Visual,

    score: u32,
    score_multiplier: u32,
    hp: i32,
    reset_pending: bool,
}

impl Ball {
    /// Creates the ball and wires its collision listener. The body is
    /// attached immediately so the board is playable from frame one.
    pub fn create(
        physics: Rc<RefCell<Physics>>,
        spawn: IVec2,
        radius: i32,
        visual: Visual,
    ) -> Rc<RefCell<Ball>> {
        let ball = Rc::new(RefCell::new(Ball {
            physics,
            self_listener: None,
            body: None,
            spawn,
            radius,
            visual,
            score: 0,
            score_multiplier: 1,
            hp: STARTING_HP,
            reset_pending: false,
        }));

        let weak_ball = Rc::downgrade(&ball);
        let listener: Weak<RefCell<dyn CollisionListener>> = weak_ball;
        {
            let mut this = ball.borrow_mut();
            this.self_listener = Some(listener);
            this.create_body();
        }
        ball
    }

    /// Builds the circle body at the spawn point and wires category +
    /// listener. A factory failure is logged and leaves the ball
    /// bodiless (it draws nothing and hits nothing).
    fn create_body(&mut self) {
        let props = BodyProps {
            restitution: BALL_RESTITUTION,
            filter: CollisionFilter {
                category: layers::BALL,
                mask: layers::BOARD | layers::SENSOR | layers::ITEM | layers::FLIPPER,
            },
            ..BodyProps::default()
        };

        let mut physics = self.physics.borrow_mut();
        match physics.create_circle(
            self.spawn.x + self.radius,
            self.spawn.y + self.radius,
            self.radius,
            BodyKind::Dynamic,
            props,
        ) {
            Ok(handle) => {
                physics.set_category(handle, ColliderCategory::Ball);
                if let Some(listener) = &self.self_listener {
                    physics.set_listener(handle, listener.clone());
                }
                self.body = Some(handle);
            }
            Err(e) => error!("Ball body construction failed: {}", e),
        }
    }

    //--- Sensor Effects ---------------------------------------------------

    /// Applies a sensor effect. Called by sensor zones on overlap edges.
    pub fn on_sensor(&mut self, role: SensorRole) {
        match role {
            SensorRole::Death => {
                if !self.reset_pending {
                    self.reset_pending = true;
                    self.hp -= 1;
                }
            }
            SensorRole::Power => self.score_multiplier += 1,
            SensorRole::HpUp => self.hp += 1,
        }
    }

    /// Brings a drained-out ball back: refills hp and rebuilds the body
    /// if it is missing. The score carries over.
    pub fn respawn(&mut self) {
        if self.hp <= 0 {
            self.hp = STARTING_HP;
        }
        if self.body.is_none() {
            self.create_body();
        }
    }

    //--- State Access (scene HUD and save file) ---------------------------

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn multiplier(&self) -> u32 {
        self.score_multiplier
    }

    pub fn restore(&mut self, score: u32, hp: i32, multiplier: u32) {
        self.score = score.min(SCORE_CAP);
        self.hp = hp;
        self.score_multiplier = multiplier.max(1);
    }

    pub fn body(&self) -> Option<PhysBodyHandle> {
        self.body
    }
}

//=== Entity Implementation ===============================================

impl Entity for Ball {
    fn name(&self) -> &str {
        "ball"
    }

    fn update(&mut self, dt: f32) -> Result<(), ModuleError> {
        self.visual.advance(dt);

        // Deferred drain reaction: tear the body down outside the
        // dispatch callback, then respawn in place while lives remain.
        if self.reset_pending {
            if let Some(handle) = self.body.take() {
                self.physics.borrow_mut().destroy_body(handle);
            }
            self.reset_pending = false;
            self.score_multiplier = 1;

            if self.hp > 0 {
                self.create_body();
            }
        }
        Ok(())
    }

    fn draw(&self, render: &mut Render) {
        let Some(texture) = self.visual.current() else {
            return;
        };
        let Some(handle) = self.body else {
            return;
        };

        let physics = self.physics.borrow();
        if let (Some(position), Some(rotation)) =
            (physics.position(handle), physics.rotation_deg(handle))
        {
            render.draw_sprite(texture, Vec2::new(position.x as f32, position.y as f32), rotation);
        }
    }

    fn clean_up(&mut self) {
        if let Some(handle) = self.body.take() {
            self.physics.borrow_mut().destroy_body(handle);
        }
    }
}

//=== Collision Listener ==================================================

impl CollisionListener for Ball {
    /// Solid-contact reactions. Sensor overlaps never arrive here.
    fn on_collision(&mut self, _me: &PhysBody, other: &PhysBody) {
        match other.category() {
            ColliderCategory::Item => {
                if self.score < SCORE_CAP {
                    self.score = (self.score + ITEM_SCORE * self.score_multiplier).min(SCORE_CAP);
                }
                debug!("Ball hit item, score {}", self.score);
            }
            ColliderCategory::Board => debug!("Ball hit board"),
            ColliderCategory::Anim => debug!("Ball hit animated part"),
            other => debug!("Ball hit {:?}", other),
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
    use crate::core::input::Input;
    use crate::core::render::{NullSink, Render as RenderModule};
    use crate::core::window::Window;

    fn physics_rc() -> Rc<RefCell<Physics>> {
        let signals = AppSignals::new();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let input = Rc::new(RefCell::new(Input::new(rx, signals)));
        let window = Rc::new(RefCell::new(Window::new()));
        let render = Rc::new(RefCell::new(RenderModule::new(Box::new(NullSink), window)));
        Rc::new(RefCell::new(Physics::new(input, render)))
    }

    #[test]
    fn create_attaches_a_listening_ball_body() {
        let physics = physics_rc();
        let ball = Ball::create(physics.clone(), IVec2::new(100, 200), 12, Visual::None);

        let handle = ball.borrow().body().expect("body attached");
        let physics = physics.borrow();
        let pb = physics.phys_body(handle).unwrap();
        assert_eq!(pb.category(), ColliderCategory::Ball);
    }

    #[test]
    fn item_contacts_score_with_multiplier_and_cap() {
        let physics = physics_rc();
        let ball = Ball::create(physics.clone(), IVec2::ZERO, 10, Visual::None);

        // Drive on_collision directly with a fabricated item body.
        let item = {
            let mut physics = physics.borrow_mut();
            let handle = physics
                .create_circle(50, 50, 5, BodyKind::Static, BodyProps::default())
                .unwrap();
            physics.set_category(handle, ColliderCategory::Item);
            handle
        };

        {
            let physics = physics.borrow();
            let me_handle = ball.borrow().body().unwrap();
            let me = physics.phys_body(me_handle).unwrap();
            let other = physics.phys_body(item).unwrap();

            let mut this = ball.borrow_mut();
            this.on_collision(me, other);
            assert_eq!(this.score(), 100);

            this.on_sensor(SensorRole::Power);
            this.on_collision(me, other);
            assert_eq!(this.score(), 300);

            this.restore(SCORE_CAP - 50, 3, 1);
            this.on_collision(me, other);
            assert_eq!(this.score(), SCORE_CAP);
        }
    }

    #[test]
    fn death_sensor_resets_body_and_spends_a_life() {
        let physics = physics_rc();
        let ball = Ball::create(physics.clone(), IVec2::new(100, 100), 10, Visual::None);
        let old_body = ball.borrow().body().unwrap();

        ball.borrow_mut().on_sensor(SensorRole::Death);
        // Repeated overlap re-fires must not double-spend.
        ball.borrow_mut().on_sensor(SensorRole::Death);
        assert_eq!(ball.borrow().hp(), STARTING_HP - 1);

        ball.borrow_mut().update(1.0 / 60.0).unwrap();

        let new_body = ball.borrow().body().expect("respawned");
        assert_ne!(old_body, new_body);
        assert!(physics.borrow().phys_body(old_body).is_none());
    }

    #[test]
    fn drained_out_ball_stays_down_until_respawn() {
        let physics = physics_rc();
        let ball = Ball::create(physics.clone(), IVec2::new(100, 100), 10, Visual::None);
        ball.borrow_mut().restore(0, 1, 1);

        ball.borrow_mut().on_sensor(SensorRole::Death);
        ball.borrow_mut().update(1.0 / 60.0).unwrap();

        assert_eq!(ball.borrow().hp(), 0);
        assert!(ball.borrow().body().is_none());

        ball.borrow_mut().respawn();
        assert_eq!(ball.borrow().hp(), STARTING_HP);
        assert!(ball.borrow().body().is_some());
    }

    #[test]
    fn hp_up_and_power_sensors_adjust_state() {
        let physics = physics_rc();
        let ball = Ball::create(physics, IVec2::ZERO, 10, Visual::None);

        ball.borrow_mut().on_sensor(SensorRole::HpUp);
        assert_eq!(ball.borrow().hp(), STARTING_HP + 1);

        ball.borrow_mut().on_sensor(SensorRole::Power);
        assert_eq!(ball.borrow().multiplier(), 2);
    }
}
