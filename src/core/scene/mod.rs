//=========================================================================
// Scene Module
//=========================================================================
//
// Game flow for the pinball board: spawns the playfield entities from
// its config subtree, draws the HUD, and owns the session-level
// bindings (save/load requests, vsync preference, quit, ball respawn).
//
// Everything the scene spawns goes through the entity manager; the
// scene keeps a direct handle only to the ball, which the HUD and the
// save file care about.
//
// Bindings (edges):
//   F5     request save        F6     request load
//   V      toggle vsync-on-restart preference
//   R      respawn a drained-out ball
//   Escape quit
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== External Crates =====================================================

use glam::{IVec2, Vec2};
use log::info;
use serde::Deserialize;
use serde_json::{json, Map, Value};

//=== Internal Imports ====================================================

use crate::core::app::AppSignals;
use crate::core::audio::Audio;
use crate::core::entity::{
    Ball, Bumper, EntityManager, Flipper, FlipperSide, Plunger, SensorZone, Visual,
};
use crate::core::fonts::Fonts;
use crate::core::input::{Input, KeyCode};
use crate::core::module::{Module, ModuleError};
use crate::core::physics::{Physics, PrismaticJointConfig, RevoluteJointConfig, SensorRole};
use crate::core::render::Render;
use crate::core::textures::Textures;

//=== Configuration =======================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SceneConfig {
    music: String,
    ball: BallSpec,
    flippers: FlipperPair,
    plunger: Option<PlungerSpec>,
    bumpers: Vec<BumperSpec>,
    sensors: Vec<SensorSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct BallSpec {
    x: i32,
    y: i32,
    radius: i32,
    texture: String,
}

impl Default for BallSpec {
    fn default() -> Self {
        Self { x: 520, y: 820, radius: 12, texture: String::new() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FlipperPair {
    left: Option<FlipperSpec>,
    right: Option<FlipperSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct FlipperSpec {
    x: i32,
    y: i32,
    #[serde(default)]
    joint: RevoluteJointConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct PlungerSpec {
    x: i32,
    y: i32,
    #[serde(default)]
    joint: PrismaticJointConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct BumperSpec {
    x: i32,
    y: i32,
    radius: i32,
    #[serde(default)]
    frames: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SensorSpec {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    role: String,
}

//=== Scene ===============================================================

/// Scene module: board population and session bindings.
pub struct Scene {
    input: Rc<RefCell<Input>>,
    render: Rc<RefCell<Render>>,
    physics: Rc<RefCell<Physics>>,
    textures: Rc<RefCell<Textures>>,
    audio: Rc<RefCell<Audio>>,
    fonts: Rc<RefCell<Fonts>>,
    entities: Rc<RefCell<EntityManager>>,
    signals: Rc<AppSignals>,

    config: SceneConfig,
    ball: Option<Rc<RefCell<Ball>>>,

    active: bool,
}

impl Scene {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: Rc<RefCell<Input>>,
        render: Rc<RefCell<Render>>,
        physics: Rc<RefCell<Physics>>,
        textures: Rc<RefCell<Textures>>,
        audio: Rc<RefCell<Audio>>,
        fonts: Rc<RefCell<Fonts>>,
        entities: Rc<RefCell<EntityManager>>,
        signals: Rc<AppSignals>,
    ) -> Self {
        Self {
            input,
            render,
            physics,
            textures,
            audio,
            fonts,
            entities,
            signals,
            config: SceneConfig::default(),
            ball: None,
            active: true,
        }
    }

    pub fn ball(&self) -> Option<&Rc<RefCell<Ball>>> {
        self.ball.as_ref()
    }

    //--- Spawning ---------------------------------------------------------

    fn visual_for(&self, texture: &str) -> Visual {
        if texture.is_empty() {
            return Visual::None;
        }
        match self.textures.borrow_mut().load(texture) {
            Some(handle) => Visual::Static { texture: handle },
            None => Visual::None,
        }
    }

    fn animated_visual_for(&self, frames: &str) -> Visual {
        if frames.is_empty() {
            return Visual::None;
        }
        let frames = self.textures.borrow_mut().frame_sequence(frames);
        if frames.is_empty() {
            Visual::None
        } else {
            Visual::animated(frames, 12.0, false)
        }
    }

    fn spawn_board(&mut self) -> Result<(), ModuleError> {
        let mut entities = self.entities.borrow_mut();

        //--- Ball ---------------------------------------------------------
        let ball_visual = self.visual_for(&self.config.ball.texture);
        let ball = Ball::create(
            self.physics.clone(),
            IVec2::new(self.config.ball.x, self.config.ball.y),
            self.config.ball.radius,
            ball_visual,
        );
        entities.add(ball.clone())?;
        self.ball = Some(ball.clone());

        //--- Flippers -----------------------------------------------------
        let sides = [
            (FlipperSide::Left, self.config.flippers.left.clone()),
            (FlipperSide::Right, self.config.flippers.right.clone()),
        ];
        for (side, spec) in sides {
            if let Some(spec) = spec {
                let flipper = Flipper::create(
                    self.physics.clone(),
                    self.input.clone(),
                    side,
                    IVec2::new(spec.x, spec.y),
                    spec.joint,
                    Visual::None,
                );
                entities.add(flipper)?;
            }
        }

        //--- Plunger ------------------------------------------------------
        if let Some(spec) = self.config.plunger.clone() {
            let plunger = Plunger::create(
                self.physics.clone(),
                self.input.clone(),
                IVec2::new(spec.x, spec.y),
                spec.joint,
                Visual::None,
            );
            entities.add(plunger)?;
        }

        //--- Bumpers ------------------------------------------------------
        for spec in self.config.bumpers.clone() {
            let visual = self.animated_visual_for(&spec.frames);
            let bumper = Bumper::create(
                self.physics.clone(),
                IVec2::new(spec.x, spec.y),
                spec.radius,
                visual,
            );
            entities.add(bumper)?;
        }

        //--- Sensor Zones -------------------------------------------------
        for spec in self.config.sensors.clone() {
            let Some(role) = SensorRole::parse(&spec.role) else {
                log::warn!("Sensor role '{}' not recognized, zone skipped", spec.role);
                continue;
            };
            let zone = SensorZone::create(
                self.physics.clone(),
                ball.clone(),
                IVec2::new(spec.x, spec.y),
                IVec2::new(spec.width, spec.height),
                role,
            );
            entities.add(zone)?;
        }

        Ok(())
    }

    //--- HUD --------------------------------------------------------------

    fn draw_hud(&self) {
        let Some(ball) = &self.ball else {
            return;
        };
        let ball = ball.borrow();
        let fonts = self.fonts.borrow();

        fonts.draw_text(Vec2::new(8.0, 8.0), &format!("SCORE {:05}", ball.score()));
        fonts.draw_text(Vec2::new(8.0, 20.0), &format!("BALLS {}", ball.hp().max(0)));
    }
}

//=== Module Implementation ===============================================

impl Module for Scene {
    fn name(&self) -> &'static str {
        "scene"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        self.config = match config {
            Value::Null => SceneConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("scene: {}", e)))?,
        };
        Ok(())
    }

    fn start(&mut self) -> Result<(), ModuleError> {
        info!("Scene populating the board");

        if !self.config.music.is_empty() {
            self.audio.borrow_mut().play_music(&self.config.music, true);
        }

        self.spawn_board()
    }

    fn update(&mut self, _dt: f32) -> Result<(), ModuleError> {
        let (save, load, vsync, respawn, quit) = {
            let input = self.input.borrow();
            (
                input.is_key_pressed(KeyCode::F5),
                input.is_key_pressed(KeyCode::F6),
                input.is_key_pressed(KeyCode::KeyV),
                input.is_key_pressed(KeyCode::KeyR),
                input.is_key_pressed(KeyCode::Escape),
            )
        };

        if save {
            self.signals.request_save();
        }
        if load {
            self.signals.request_load();
        }
        if quit {
            self.signals.request_quit();
        }
        if vsync {
            let mut render = self.render.borrow_mut();
            let flipped = !render.vsync_on_restart();
            render.set_vsync_on_restart(flipped);
        }
        if respawn {
            if let Some(ball) = &self.ball {
                ball.borrow_mut().respawn();
            }
        }

        self.draw_hud();
        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        self.ball = None;
        Ok(())
    }

    fn save_state(&self, state: &mut Map<String, Value>) -> Result<(), ModuleError> {
        if let Some(ball) = &self.ball {
            let ball = ball.borrow();
            state.insert(
                "ball".into(),
                json!({
                    "score": ball.score(),
                    "hp": ball.hp(),
                    "multiplier": ball.multiplier(),
                }),
            );
        }
        Ok(())
    }

    fn load_state(&mut self, state: &Value) -> Result<(), ModuleError> {
        let Some(ball_state) = state.get("ball") else {
            return Ok(());
        };
        let Some(ball) = &self.ball else {
            return Ok(());
        };

        let score = ball_state.get("score").and_then(Value::as_u64).unwrap_or(0) as u32;
        let hp = ball_state.get("hp").and_then(Value::as_i64).unwrap_or(3) as i32;
        let multiplier = ball_state.get("multiplier").and_then(Value::as_u64).unwrap_or(1) as u32;
        ball.borrow_mut().restore(score, hp, multiplier);
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
