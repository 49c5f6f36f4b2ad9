//=========================================================================
// Module Contract
//=========================================================================
//
// Lifecycle contract implemented by every engine subsystem.
//
// Phase order, driven by `App`:
//   init (once, at registration)
//   awake (once, with config subtree) → start (once)
//   per frame: pre_update → update(dt) → post_update
//   clean_up (once, reverse registration order)
//
// A module's `name()` keys both its config subtree and its save-state
// subtree, so it must be stable across runs.
//
//=========================================================================

//=== External Dependencies ===============================================

use serde_json::{Map, Value};

//=== ModuleError =========================================================

/// Lifecycle phase failure.
///
/// Any error returned from `awake`/`start` aborts startup; any error from
/// a per-frame phase ends the frame loop and triggers shutdown. Both are
/// deliberate fail-fast policies: a broken subsystem invalidates the frame.
#[derive(Debug)]
pub enum ModuleError {
    /// Configuration subtree missing or malformed during `awake`.
    Config(String),

    /// One-time startup work failed (`awake`/`start`).
    Startup(String),

    /// A per-frame phase failed.
    Runtime(String),

    /// Save/load state serialization failed.
    State(String),

    /// Underlying file I/O failed (config or save file).
    Io(std::io::Error),
}

//--- Trait Implementations -----------------------------------------------

impl std::fmt::Display for ModuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Config error: {}", msg),
            Self::Startup(msg) => write!(f, "Startup error: {}", msg),
            Self::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            Self::State(msg) => write!(f, "State error: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ModuleError {}

impl From<std::io::Error> for ModuleError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        Self::State(e.to_string())
    }
}

//=== Module Trait ========================================================

/// An independently lifecycled engine subsystem.
///
/// Only `name()` is required. Every phase has a default no-op so modules
/// implement exactly the hooks they care about. Inactive modules keep
/// receiving the one-time hooks (`awake`, `start`, `clean_up`) but are
/// skipped for the three per-frame phases.
///
/// # Minimal Implementation
///
/// ```rust
/// # use voltaic_engine::core::module::Module;
/// struct Splash;
///
/// impl Module for Splash {
///     fn name(&self) -> &'static str {
///         "splash"
///     }
/// }
/// ```
pub trait Module {
    /// Stable identity used as the config / save-state subtree key.
    fn name(&self) -> &'static str;

    /// Called once when the module is registered with the `App`.
    fn init(&mut self) {}

    /// Called once before the first frame, with this module's config
    /// subtree (`Value::Null` when the config carries no such subtree).
    fn awake(&mut self, _config: &Value) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called once after every module has awoken, before the frame loop.
    fn start(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// First per-frame phase. Input digestion and physics stepping live here.
    fn pre_update(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Main per-frame phase. `dt` is the previous frame's duration in seconds.
    fn update(&mut self, _dt: f32) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Last per-frame phase. Debug draw and queue flushing live here.
    fn post_update(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called once at shutdown, in reverse registration order.
    fn clean_up(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Restores module state from its named save-file subtree.
    fn load_state(&mut self, _state: &Value) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Appends module state into the save document under its own key.
    /// The default writes nothing (the subtree stays an empty object).
    fn save_state(&self, _state: &mut Map<String, Value>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Whether the three per-frame phases run for this module.
    fn is_active(&self) -> bool {
        true
    }

    fn set_active(&mut self, _active: bool) {}
}

//=========================================================================
// Unit Tests
//=========================================================================
