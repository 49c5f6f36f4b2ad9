//=========================================================================
// Window Module
//=========================================================================
//
// Holds the display parameters every other module reads (board size,
// integer scale). The OS surface itself is created and owned by the
// platform shell; this module is the single source of truth for what
// the shell should create.
//
//=========================================================================

//=== External Crates =====================================================

use log::info;
use serde::Deserialize;
use serde_json::Value;

//=== Internal Imports ====================================================

use crate::core::module::{Module, ModuleError};

//=== Configuration =======================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct WindowConfig {
    width: u32,
    height: u32,
    scale: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        // Portrait pinball cabinet proportions.
        Self { width: 576, height: 960, scale: 1 }
    }
}

//=== Window ==============================================================

/// Window module: validated display parameters.
pub struct Window {
    width: u32,
    height: u32,
    scale: u32,
    active: bool,
}

impl Window {
    pub fn new() -> Self {
        let defaults = WindowConfig::default();
        Self {
            width: defaults.width,
            height: defaults.height,
            scale: defaults.scale,
            active: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

//=== Module Implementation ===============================================

impl Module for Window {
    fn name(&self) -> &'static str {
        "window"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        let config: WindowConfig = match config {
            Value::Null => WindowConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("window: {}", e)))?,
        };

        if config.width == 0 || config.height == 0 {
            return Err(ModuleError::Config(format!(
                "window: invalid resolution {}x{}",
                config.width, config.height
            )));
        }
        if config.scale == 0 {
            return Err(ModuleError::Config("window: scale must be at least 1".into()));
        }

        self.width = config.width;
        self.height = config.height;
        self.scale = config.scale;

        info!("Window configured: {}x{} @ {}x", self.width, self.height, self.scale);
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
    use serde_json::json;

    #[test]
    fn awake_accepts_valid_resolution() {
        let mut window = Window::new();
        window.awake(&json!({ "width": 800, "height": 600, "scale": 2 })).unwrap();
        assert_eq!(window.width(), 800);
        assert_eq!(window.height(), 600);
        assert_eq!(window.scale(), 2);
    }

    #[test]
    fn awake_rejects_zero_resolution() {
        let mut window = Window::new();
        assert!(window.awake(&json!({ "width": 0, "height": 600 })).is_err());
    }

    #[test]
    fn missing_config_keeps_cabinet_defaults() {
        let mut window = Window::new();
        window.awake(&Value::Null).unwrap();
        assert_eq!(window.width(), 576);
        assert_eq!(window.height(), 960);
    }
}
