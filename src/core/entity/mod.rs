//=========================================================================
// Entity Manager Module
//=========================================================================
//
// Ordered registry of gameplay entities. Entities are created by the
// scene with their collaborators injected, registered here, and driven
// every frame: update in registration order, then draw into the render
// queue. Physics has already stepped and dispatched contacts by the
// time update runs, so entities see this frame's collisions.
//
// Rendering state is a tagged `Visual` variant — an entity is a static
// image, an animation sequence, or invisible, and carries only the
// state that variant needs.
//
//=========================================================================

//=== Submodules ==========================================================

pub mod ball;
pub mod bumper;
pub mod flipper;
pub mod plunger;
pub mod sensor_zone;

//=== Public API ==========================================================

pub use ball::Ball;
pub use bumper::Bumper;
pub use flipper::{Flipper, FlipperSide};
pub use plunger::Plunger;
pub use sensor_zone::SensorZone;

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== External Crates =====================================================

use log::info;

//=== Internal Imports ====================================================

use crate::core::module::{Module, ModuleError};
use crate::core::render::Render;
use crate::core::textures::TextureHandle;

//=== Visual ==============================================================

/// What an entity looks like. Each variant carries only its own state.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// One fixed image.
    Static { texture: TextureHandle },

    /// Looping or one-shot frame sequence.
    Animated {
        frames: Vec<TextureHandle>,
        frame_time: f32,
        elapsed: f32,
        looping: bool,
    },

    /// Nothing drawn (pure collision geometry).
    None,
}

impl Visual {
    pub fn animated(frames: Vec<TextureHandle>, fps: f32, looping: bool) -> Self {
        Self::Animated {
            frames,
            frame_time: if fps > 0.0 { 1.0 / fps } else { f32::MAX },
            elapsed: 0.0,
            looping,
        }
    }

    /// Advances animation time; no-op for the other variants.
    pub fn advance(&mut self, dt: f32) {
        if let Self::Animated { frames, frame_time, elapsed, looping } = self {
            if frames.is_empty() {
                return;
            }
            *elapsed += dt;
            let total = *frame_time * frames.len() as f32;
            if *looping && total > 0.0 {
                *elapsed %= total;
            }
        }
    }

    /// The frame to draw right now, if any.
    pub fn current(&self) -> Option<TextureHandle> {
        match self {
            Self::Static { texture } => Some(*texture),
            Self::Animated { frames, frame_time, elapsed, .. } => {
                if frames.is_empty() {
                    return None;
                }
                let index = (*elapsed / *frame_time) as usize;
                Some(frames[index.min(frames.len() - 1)])
            }
            Self::None => None,
        }
    }
}

//=== Entity Trait ========================================================

/// A gameplay object owned by the entity manager.
///
/// Entities that listen for contacts also implement `CollisionListener`
/// and wire themselves to their PhysBody at creation.
pub trait Entity {
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn update(&mut self, _dt: f32) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Queues this entity's drawing into the shared render queue.
    fn draw(&self, _render: &mut Render) {}

    fn clean_up(&mut self) {}
}

//=== EntityManager =======================================================

/// Entity manager module.
pub struct EntityManager {
    render: Rc<RefCell<Render>>,
    entities: Vec<Rc<RefCell<dyn Entity>>>,
    started: bool,
    active: bool,
}

impl EntityManager {
    pub fn new(render: Rc<RefCell<Render>>) -> Self {
        Self {
            render,
            entities: Vec::new(),
            started: false,
            active: true,
        }
    }

    /// Registers an entity. Entities added after module start are
    /// started immediately.
    pub fn add(&mut self, entity: Rc<RefCell<dyn Entity>>) -> Result<(), ModuleError> {
        if self.started {
            entity.borrow_mut().start()?;
        }
        self.entities.push(entity);
        Ok(())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

//=== Module Implementation ===============================================

impl Module for EntityManager {
    fn name(&self) -> &'static str {
        "entity_manager"
    }

    fn start(&mut self) -> Result<(), ModuleError> {
        for entity in &self.entities {
            entity.borrow_mut().start()?;
        }
        self.started = true;
        Ok(())
    }

    fn update(&mut self, dt: f32) -> Result<(), ModuleError> {
        for entity in &self.entities {
            entity.borrow_mut().update(dt)?;
        }

        let mut render = self.render.borrow_mut();
        for entity in &self.entities {
            entity.borrow().draw(&mut render);
        }
        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        info!("Tearing down {} entities", self.entities.len());
        for entity in self.entities.iter().rev() {
            entity.borrow_mut().clean_up();
        }
        self.entities.clear();
        self.started = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
