//=========================================================================
// Render Module
//=========================================================================
//
// Draw-command queue between gameplay and the presentation backend.
//
// Modules and entities queue commands during their update/post_update;
// this module's post_update (registered last) hands the whole frame to
// the `RenderSink` collaborator and clears the queue. Commands are in
// world pixels; the sink applies the camera offset and integer scale.
//
// Persisted state: camera position and the vsync-on-restart preference
// (the latter is also staged for config write-back at cleanup, so it
// survives without a save file).
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== External Crates =====================================================

use glam::Vec2;
use log::info;
use serde::Deserialize;
use serde_json::{json, Map, Value};

//=== Internal Imports ====================================================

use crate::core::app::AppSignals;
use crate::core::module::{Module, ModuleError};
use crate::core::textures::TextureHandle;
use crate::core::window::Window;

//=== Color ===============================================================

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

//=== DrawCommand =========================================================

/// One queued drawing operation, in world-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Full texture at a top-left position.
    Sprite {
        texture: TextureHandle,
        position: Vec2,
        rotation_deg: f32,
    },

    /// Sub-rectangle of a texture (font glyphs, atlas frames).
    Region {
        texture: TextureHandle,
        source_min: Vec2,
        source_size: Vec2,
        position: Vec2,
    },

    /// Axis-aligned rectangle.
    Rect {
        min: Vec2,
        size: Vec2,
        color: Color,
        filled: bool,
    },

    Line {
        from: Vec2,
        to: Vec2,
        color: Color,
    },

    /// Circle outline.
    Circle {
        center: Vec2,
        radius: f32,
        color: Color,
    },
}

//=== RenderSink ==========================================================

/// Presentation backend (external collaborator). Receives the whole
/// frame's commands once per post_update.
pub trait RenderSink {
    fn present(&mut self, camera: Vec2, scale: u32, commands: &[DrawCommand]);
}

/// Sink that discards every frame. Headless runs and tests.
pub struct NullSink;

impl RenderSink for NullSink {
    fn present(&mut self, _camera: Vec2, _scale: u32, _commands: &[DrawCommand]) {}
}

//=== Configuration =======================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RenderConfig {
    vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { vsync: true }
    }
}

//=== Render ==============================================================

/// Render module: command queue, camera, vsync preference.
pub struct Render {
    sink: Box<dyn RenderSink>,
    window: Rc<RefCell<Window>>,
    signals: Option<Rc<AppSignals>>,

    commands: Vec<DrawCommand>,
    pub camera: Vec2,

    vsync: bool,
    vsync_on_restart: bool,

    active: bool,
}

impl Render {
    pub fn new(sink: Box<dyn RenderSink>, window: Rc<RefCell<Window>>) -> Self {
        Self {
            sink,
            window,
            signals: None,
            commands: Vec::new(),
            camera: Vec2::ZERO,
            vsync: true,
            vsync_on_restart: true,
            active: true,
        }
    }

    /// Wires the signals handle used to stage the vsync config
    /// write-back at cleanup.
    pub fn connect_signals(&mut self, signals: Rc<AppSignals>) {
        self.signals = Some(signals);
    }

    //--- Queueing ---------------------------------------------------------

    pub fn draw_sprite(&mut self, texture: TextureHandle, position: Vec2, rotation_deg: f32) {
        self.commands.push(DrawCommand::Sprite { texture, position, rotation_deg });
    }

    pub fn draw_region(
        &mut self,
        texture: TextureHandle,
        source_min: Vec2,
        source_size: Vec2,
        position: Vec2,
    ) {
        self.commands.push(DrawCommand::Region { texture, source_min, source_size, position });
    }

    pub fn draw_rect(&mut self, min: Vec2, size: Vec2, color: Color, filled: bool) {
        self.commands.push(DrawCommand::Rect { min, size, color, filled });
    }

    pub fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    pub fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle { center, radius, color });
    }

    /// Commands queued so far this frame.
    pub fn queued(&self) -> &[DrawCommand] {
        &self.commands
    }

    //--- Vsync Preference -------------------------------------------------

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Preference applied on next launch (staged to config at cleanup).
    pub fn set_vsync_on_restart(&mut self, vsync: bool) {
        self.vsync_on_restart = vsync;
        info!("Vsync on restart set to {}", vsync);
    }

    pub fn vsync_on_restart(&self) -> bool {
        self.vsync_on_restart
    }
}

//=== Module Implementation ===============================================

impl Module for Render {
    fn name(&self) -> &'static str {
        "render"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        let config: RenderConfig = match config {
            Value::Null => RenderConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("render: {}", e)))?,
        };

        self.vsync = config.vsync;
        self.vsync_on_restart = config.vsync;
        if self.vsync {
            info!("Using vsync");
        }
        Ok(())
    }

    /// Flushes the frame. Registered last so every other module has
    /// already queued its commands.
    fn post_update(&mut self) -> Result<(), ModuleError> {
        let scale = self.window.borrow().scale();
        self.sink.present(self.camera, scale, &self.commands);
        self.commands.clear();
        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        if let Some(signals) = &self.signals {
            signals.stage_config_edit("render", "vsync", json!(self.vsync_on_restart));
        }
        Ok(())
    }

    fn save_state(&self, state: &mut Map<String, Value>) -> Result<(), ModuleError> {
        state.insert("camera".into(), json!({ "x": self.camera.x, "y": self.camera.y }));
        state.insert("vsync".into(), json!(self.vsync_on_restart));
        Ok(())
    }

    fn load_state(&mut self, state: &Value) -> Result<(), ModuleError> {
        if let Some(camera) = state.get("camera") {
            self.camera.x = camera.get("x").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            self.camera.y = camera.get("y").and_then(Value::as_f64).unwrap_or(0.0) as f32;
        }
        if let Some(vsync) = state.get("vsync").and_then(Value::as_bool) {
            self.vsync_on_restart = vsync;
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

    /// Sink that records what it was handed.
    struct CaptureSink {
        frames: Rc<RefCell<Vec<usize>>>,
    }

    impl RenderSink for CaptureSink {
        fn present(&mut self, _camera: Vec2, _scale: u32, commands: &[DrawCommand]) {
            self.frames.borrow_mut().push(commands.len());
        }
    }

    fn render_with_capture() -> (Render, Rc<RefCell<Vec<usize>>>) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = CaptureSink { frames: frames.clone() };
        let window = Rc::new(RefCell::new(Window::new()));
        (Render::new(Box::new(sink), window), frames)
    }

    #[test]
    fn post_update_flushes_and_clears_queue() {
        let (mut render, frames) = render_with_capture();

        render.draw_line(Vec2::ZERO, Vec2::new(10.0, 0.0), Color::WHITE);
        render.draw_circle(Vec2::new(5.0, 5.0), 3.0, Color::YELLOW);
        assert_eq!(render.queued().len(), 2);

        render.post_update().unwrap();
        assert_eq!(frames.borrow().as_slice(), &[2]);
        assert!(render.queued().is_empty());

        render.post_update().unwrap();
        assert_eq!(frames.borrow().as_slice(), &[2, 0]);
    }

    #[test]
    fn save_state_round_trips_camera_and_vsync() {
        let (mut render, _) = render_with_capture();
        render.camera = Vec2::new(12.0, -4.0);
        render.set_vsync_on_restart(false);

        let mut state = Map::new();
        render.save_state(&mut state).unwrap();

        let (mut restored, _) = render_with_capture();
        restored.load_state(&Value::Object(state)).unwrap();

        assert_eq!(restored.camera, Vec2::new(12.0, -4.0));
        assert!(!restored.vsync_on_restart());
    }

    #[test]
    fn awake_reads_vsync_preference() {
        let (mut render, _) = render_with_capture();
        render.awake(&serde_json::json!({ "vsync": false })).unwrap();
        assert!(!render.vsync());
    }

    #[test]
    fn clean_up_stages_vsync_write_back() {
        let (mut render, _) = render_with_capture();
        let signals = AppSignals::new();
        render.connect_signals(signals.clone());

        render.set_vsync_on_restart(false);
        render.clean_up().unwrap();

        let edits = signals.drain_config_edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].0, "render");
        assert_eq!(edits[0].1, "vsync");
        assert_eq!(edits[0].2, json!(false));
    }
}
