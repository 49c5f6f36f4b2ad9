//=========================================================================
// Map Module
//=========================================================================
//
// Builds the static board geometry from its config subtree. Each entry
// names a shape ("chain" with a compact xy point string, or "circle")
// and the whole set shares one body kind. Colliders are tagged Board
// so the ball's collision listener can tell walls from everything else.
//
// Entries that fail to parse or build are logged and skipped; a board
// with a missing decoration is playable, a dead frame loop is not.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== External Crates =====================================================

use log::{info, warn};
use serde_json::Value;

//=== Internal Imports ====================================================

use crate::core::module::{Module, ModuleError};
use crate::core::physics::{
    layers, BodyKind, BodyProps, ColliderCategory, CollisionFilter, PhysBodyHandle, Physics,
};

//=== Map =================================================================

/// Map module: data-driven board colliders.
pub struct Map {
    physics: Rc<RefCell<Physics>>,
    config: Value,
    board: Vec<PhysBodyHandle>,
    active: bool,
}

impl Map {
    pub fn new(physics: Rc<RefCell<Physics>>) -> Self {
        Self {
            physics,
            config: Value::Null,
            board: Vec::new(),
            active: true,
        }
    }

    pub fn board_handles(&self) -> &[PhysBodyHandle] {
        &self.board
    }

    //--- Collider Construction --------------------------------------------

    fn board_props() -> BodyProps {
        BodyProps {
            filter: CollisionFilter { category: layers::BOARD, mask: u32::MAX },
            ..BodyProps::default()
        }
    }

    /// Builds one collider entry; unrecognized or malformed entries are
    /// reported to the caller for logging.
    fn build_collider(
        physics: &mut Physics,
        entry: &Value,
        kind: BodyKind,
    ) -> Result<PhysBodyHandle, String> {
        let shape = entry
            .get("shape")
            .and_then(Value::as_str)
            .ok_or_else(|| "entry without a shape".to_string())?;

        let handle = match shape {
            "chain" => {
                let xy = entry
                    .get("xy")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "chain without an xy point string".to_string())?;
                physics
                    .create_chain_from_text(
                        entry.get("x").and_then(Value::as_i64).unwrap_or(0) as i32,
                        entry.get("y").and_then(Value::as_i64).unwrap_or(0) as i32,
                        xy,
                        kind,
                        Self::board_props(),
                    )
                    .map_err(|e| e.to_string())?
            }
            "circle" => {
                let x = entry.get("x").and_then(Value::as_i64).unwrap_or(0) as i32;
                let y = entry.get("y").and_then(Value::as_i64).unwrap_or(0) as i32;
                let radius = entry.get("radius").and_then(Value::as_i64).unwrap_or(0) as i32;
                physics
                    .create_circle(x, y, radius, kind, Self::board_props())
                    .map_err(|e| e.to_string())?
            }
            other => return Err(format!("shape '{}' not recognized", other)),
        };

        physics.set_category(handle, ColliderCategory::Board);
        Ok(handle)
    }
}

//=== Module Implementation ===============================================

impl Module for Map {
    fn name(&self) -> &'static str {
        "map"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        self.config = config.clone();
        Ok(())
    }

    /// Builds the board. Runs at start so the physics world exists.
    fn start(&mut self) -> Result<(), ModuleError> {
        let kind = BodyKind::parse(
            self.config
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or("static"),
        );

        let entries = match self.config.get("colliders").and_then(Value::as_array) {
            Some(entries) => entries.clone(),
            None => {
                info!("Map has no collider entries");
                return Ok(());
            }
        };

        let mut physics = self.physics.borrow_mut();
        for (index, entry) in entries.iter().enumerate() {
            match Self::build_collider(&mut physics, entry, kind) {
                Ok(handle) => self.board.push(handle),
                Err(reason) => warn!("Map collider {} skipped: {}", index, reason),
            }
        }

        info!("Map built {} board colliders", self.board.len());
        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        let mut physics = self.physics.borrow_mut();
        for handle in self.board.drain(..) {
            physics.destroy_body(handle);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::AppSignals;
    use crate::core::input::Input;
    use crate::core::render::{NullSink, Render};
    use crate::core::window::Window;
    use serde_json::json;

    fn map_with_physics() -> (Map, Rc<RefCell<Physics>>) {
        let signals = AppSignals::new();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let input = Rc::new(RefCell::new(Input::new(rx, signals)));
        let window = Rc::new(RefCell::new(Window::new()));
        let render = Rc::new(RefCell::new(Render::new(Box::new(NullSink), window)));
        let physics = Rc::new(RefCell::new(Physics::new(input, render)));
        (Map::new(physics.clone()), physics)
    }

    #[test]
    fn start_builds_configured_colliders_as_board() {
        let (mut map, physics) = map_with_physics();

        map.awake(&json!({
            "body": "static",
            "colliders": [
                { "shape": "chain", "xy": "0 0 576 0 576 960 0 960" },
                { "shape": "circle", "x": 288, "y": 480, "radius": 20 }
            ]
        }))
        .unwrap();
        map.start().unwrap();

        assert_eq!(map.board_handles().len(), 2);
        let physics = physics.borrow();
        for &handle in map.board_handles() {
            assert_eq!(
                physics.phys_body(handle).unwrap().category(),
                ColliderCategory::Board
            );
        }
    }

    #[test]
    fn bad_entries_are_skipped_not_fatal() {
        let (mut map, physics) = map_with_physics();

        map.awake(&json!({
            "colliders": [
                { "shape": "hexagon" },
                { "shape": "chain", "xy": "10 20 30" },
                { "shape": "circle", "x": 10, "y": 10, "radius": 5 }
            ]
        }))
        .unwrap();
        map.start().unwrap();

        assert_eq!(map.board_handles().len(), 1);
        assert_eq!(physics.borrow().body_count(), 1);
    }

    #[test]
    fn clean_up_destroys_board_bodies() {
        let (mut map, physics) = map_with_physics();

        map.awake(&json!({
            "colliders": [{ "shape": "circle", "x": 0, "y": 0, "radius": 10 }]
        }))
        .unwrap();
        map.start().unwrap();
        assert_eq!(physics.borrow().body_count(), 1);

        map.clean_up().unwrap();
        assert_eq!(physics.borrow().body_count(), 0);
        assert!(map.board_handles().is_empty());
    }
}
