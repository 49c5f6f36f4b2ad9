//=========================================================================
// Configuration Tree
//=========================================================================
//
// JSON configuration keyed by module name. The `App` loads the tree once
// during `awake()` and hands each module its own subtree; modules never
// see each other's configuration.
//
// Write-back: modules may stage edits (e.g. a restart-time vsync
// preference). Staged edits mark the tree dirty and the `App` persists it
// at cleanup. File-backed trees only; inline trees (tests, headless runs)
// skip persistence.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::PathBuf;

use log::{info, warn};
use serde_json::{Map, Value};

use super::module::ModuleError;

//=== ConfigSource ========================================================

/// Where the configuration tree comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Load and persist a JSON file at this path.
    File(PathBuf),

    /// Use this tree directly (tests and embedded setups). Never persisted.
    Inline(Value),
}

//=== Config ==============================================================

/// Loaded configuration tree with per-module subtree access.
pub struct Config {
    root: Value,
    source: ConfigSource,
    dirty: bool,
}

impl Config {
    //--- Construction -----------------------------------------------------

    /// Loads the tree from its source.
    ///
    /// A missing or malformed file is a fatal startup error, matching the
    /// fail-fast awake contract.
    pub fn load(source: ConfigSource) -> Result<Self, ModuleError> {
        let root = match &source {
            ConfigSource::File(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    ModuleError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&text).map_err(|e| {
                    ModuleError::Config(format!("cannot parse {}: {}", path.display(), e))
                })?
            }
            ConfigSource::Inline(value) => value.clone(),
        };

        if !root.is_object() {
            return Err(ModuleError::Config("config root must be an object".into()));
        }

        Ok(Self { root, source, dirty: false })
    }

    //--- Subtree Access ---------------------------------------------------

    /// Returns the named module subtree, or `Value::Null` when absent.
    pub fn subtree(&self, name: &str) -> &Value {
        self.root.get(name).unwrap_or(&Value::Null)
    }

    //--- Write-back -------------------------------------------------------

    /// Stages a single value under `module.key`, creating the subtree if
    /// needed, and marks the tree dirty.
    pub fn set(&mut self, module: &str, key: &str, value: Value) {
        // Root was validated as an object at load.
        let Some(root) = self.root.as_object_mut() else {
            return;
        };
        let subtree = root
            .entry(module.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        match subtree.as_object_mut() {
            Some(map) => {
                map.insert(key.to_string(), value);
                self.dirty = true;
            }
            None => warn!("Config subtree '{}' is not an object, dropping '{}'", module, key),
        }
    }

    /// Writes staged edits back to the source file, if any.
    pub fn persist(&mut self) -> Result<(), ModuleError> {
        if !self.dirty {
            return Ok(());
        }

        match &self.source {
            ConfigSource::File(path) => {
                let text = serde_json::to_string_pretty(&self.root)
                    .map_err(|e| ModuleError::Config(e.to_string()))?;
                fs::write(path, text)?;
                info!("Config written back to {}", path.display());
            }
            ConfigSource::Inline(_) => {
                warn!("Inline config has staged edits but no backing file, discarding");
            }
        }

        self.dirty = false;
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inline(value: Value) -> Config {
        Config::load(ConfigSource::Inline(value)).expect("inline config")
    }

    #[test]
    fn subtree_returns_named_node() {
        let config = inline(json!({
            "window": { "width": 576, "height": 960 },
            "render": { "vsync": true }
        }));

        assert_eq!(config.subtree("window")["width"], 576);
        assert_eq!(config.subtree("render")["vsync"], true);
    }

    #[test]
    fn missing_subtree_is_null() {
        let config = inline(json!({}));
        assert!(config.subtree("audio").is_null());
    }

    #[test]
    fn non_object_root_is_rejected() {
        let result = Config::load(ConfigSource::Inline(json!([1, 2, 3])));
        assert!(result.is_err());
    }

    #[test]
    fn set_creates_subtree_and_marks_dirty() {
        let mut config = inline(json!({}));
        config.set("render", "vsync", json!(false));

        assert_eq!(config.subtree("render")["vsync"], false);
        assert!(config.dirty);
    }

    #[test]
    fn persist_on_inline_config_discards_edits() {
        let mut config = inline(json!({}));
        config.set("render", "vsync", json!(false));

        assert!(config.persist().is_ok());
        assert!(!config.dirty);
    }
}
