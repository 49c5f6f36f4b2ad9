//=========================================================================
// Bumper Entity
//=========================================================================
//
// A scoring target: static circle tagged Item with lively restitution.
// Both dispatch directions are exercised here — the ball's listener
// scores the hit, the bumper's own listener counts it and kicks its
// flash animation.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

//=== External Crates =====================================================

use glam::{IVec2, Vec2};
use log::error;

//=== Internal Imports ====================================================

use super::{Entity, Visual};
use crate::core::module::ModuleError;
use crate::core::physics::{
    layers, BodyKind, BodyProps, ColliderCategory, CollisionFilter, CollisionListener, PhysBody,
    PhysBodyHandle, Physics,
};
use crate::core::render::Render;

//=== Tuning ==============================================================

/// Above 1.0: bumpers add energy, like the real solenoid kick.
const BUMPER_RESTITUTION: f32 = 1.2;

//=== Bumper ==============================================================

pub struct Bumper {
    physics: Rc<RefCell<Physics>>,
    body: Option<PhysBodyHandle>,
    visual: Visual,
    hits: u32,
    flash_pending: bool,
}

impl Bumper {
    pub fn create(
        physics: Rc<RefCell<Physics>>,
        center: IVec2,
        radius: i32,
        visual: Visual,
    ) -> Rc<RefCell<Bumper>> {
        let bumper = Rc::new(RefCell::new(Bumper {
            physics,
            body: None,
            visual,
            hits: 0,
            flash_pending: false,
        }));

        {
            let weak_bumper = Rc::downgrade(&bumper);
            let listener: Weak<RefCell<dyn CollisionListener>> = weak_bumper;
            let mut this = bumper.borrow_mut();
            let physics = this.physics.clone();
            let mut physics = physics.borrow_mut();

            match physics.create_circle(
                center.x,
                center.y,
                radius,
                BodyKind::Static,
                BodyProps {
                    restitution: BUMPER_RESTITUTION,
                    filter: CollisionFilter { category: layers::ITEM, mask: layers::BALL },
                    ..BodyProps::default()
                },
            ) {
                Ok(handle) => {
                    physics.set_category(handle, ColliderCategory::Item);
                    physics.set_listener(handle, listener);
                    this.body = Some(handle);
                }
                Err(e) => error!("Bumper construction failed: {}", e),
            }
        }

        bumper
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }
}

//=== Entity Implementation ===============================================

impl Entity for Bumper {
    fn name(&self) -> &str {
        "bumper"
    }

    fn update(&mut self, dt: f32) -> Result<(), ModuleError> {
        if self.flash_pending {
            // Restart the flash animation from its first frame.
            if let Visual::Animated { elapsed, .. } = &mut self.visual {
                *elapsed = 0.0;
            }
            self.flash_pending = false;
        }
        self.visual.advance(dt);
        Ok(())
    }

    fn draw(&self, render: &mut Render) {
        let Some(texture) = self.visual.current() else {
            return;
        };
        let Some(body) = self.body else {
            return;
        };

        let physics = self.physics.borrow();
        if let Some(position) = physics.position(body) {
            render.draw_sprite(texture, Vec2::new(position.x as f32, position.y as f32), 0.0);
        }
    }

    fn clean_up(&mut self) {
        if let Some(body) = self.body.take() {
            self.physics.borrow_mut().destroy_body(body);
        }
    }
}

//=== Collision Listener ==================================================

impl CollisionListener for Bumper {
    fn on_collision(&mut self, _me: &PhysBody, other: &PhysBody) {
        if other.category() == ColliderCategory::Ball {
            self.hits += 1;
            self.flash_pending = true;
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
    use crate::core::entity::Ball;
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
    fn ball_striking_bumper_scores_and_counts_on_both_sides() {
        let physics = physics_rc();

        // Ball spawned overlapping the bumper: the first step reports
        // the begin contact to both listeners.
        let ball = Ball::create(physics.clone(), IVec2::new(90, 90), 10, Visual::None);
        let bumper = Bumper::create(physics.clone(), IVec2::new(105, 105), 12, Visual::None);

        physics.borrow_mut().step_once();

        assert_eq!(bumper.borrow().hits(), 1);
        assert_eq!(ball.borrow().score(), 100);
    }

    #[test]
    fn non_ball_contacts_do_not_count() {
        let physics = physics_rc();
        let bumper = Bumper::create(physics.clone(), IVec2::new(100, 100), 12, Visual::None);

        {
            let mut physics = physics.borrow_mut();
            // Overlapping board geometry; bumper mask ignores it, and
            // even a reported contact must not count as a hit.
            let wall = physics
                .create_rectangle(100, 100, 30, 30, BodyKind::Static, BodyProps::default())
                .unwrap();
            physics.set_category(wall, ColliderCategory::Board);
        }

        physics.borrow_mut().step_once();
        assert_eq!(bumper.borrow().hits(), 0);
    }
}
