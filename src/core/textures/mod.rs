//=========================================================================
// Textures Module
//=========================================================================
//
// Name → handle registry over an external asset catalog. Decoding and
// GPU upload are the catalog's problem (an injected collaborator); the
// engine only tracks stable handles and animation frame sequences.
//
// Frame sequences replace ad hoc directory scanning: the catalog
// resolves "ordered frames for pattern X" however it likes (packed
// atlas, numbered files, embedded data) and the engine never knows.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::collections::HashMap;

//=== External Crates =====================================================

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

//=== Internal Imports ====================================================

use crate::core::module::{Module, ModuleError};

//=== TextureHandle =======================================================

/// Stable handle to a loaded texture. Cheap to copy, meaningless to
/// inspect; only the render sink and catalog know what it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Texture dimensions reported by the catalog, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}

//=== AssetCatalog ========================================================

/// External collaborator that resolves asset paths to texture data.
///
/// Returning `None` means the asset could not be resolved; the module
/// logs and the caller gets no handle.
pub trait AssetCatalog {
    fn load_texture(&mut self, path: &str) -> Option<TextureInfo>;

    /// Ordered animation frames matching a sequence name.
    fn load_frame_sequence(&mut self, pattern: &str) -> Vec<TextureInfo>;
}

/// Catalog that resolves nothing. Headless runs and tests use this.
pub struct NullCatalog;

impl AssetCatalog for NullCatalog {
    fn load_texture(&mut self, _path: &str) -> Option<TextureInfo> {
        None
    }

    fn load_frame_sequence(&mut self, _pattern: &str) -> Vec<TextureInfo> {
        Vec::new()
    }
}

//=== Configuration =======================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TexturesConfig {
    /// Base folder prepended to every load path.
    folder: String,
}

//=== Textures ============================================================

/// Textures module: handle registry + frame sequences.
pub struct Textures {
    catalog: Box<dyn AssetCatalog>,
    folder: String,

    by_name: HashMap<String, TextureHandle>,
    info: HashMap<TextureHandle, TextureInfo>,
    sequences: HashMap<String, Vec<TextureHandle>>,
    next_handle: u32,

    active: bool,
}

impl Textures {
    pub fn new(catalog: Box<dyn AssetCatalog>) -> Self {
        Self {
            catalog,
            folder: String::new(),
            by_name: HashMap::new(),
            info: HashMap::new(),
            sequences: HashMap::new(),
            next_handle: 1,
            active: true,
        }
    }

    //--- Loading ----------------------------------------------------------

    /// Loads (or returns the cached handle for) a named texture.
    pub fn load(&mut self, name: &str) -> Option<TextureHandle> {
        if let Some(&handle) = self.by_name.get(name) {
            return Some(handle);
        }

        let path = format!("{}{}", self.folder, name);
        let Some(info) = self.catalog.load_texture(&path) else {
            warn!("Texture '{}' could not be resolved", path);
            return None;
        };

        let handle = self.allocate(info);
        self.by_name.insert(name.to_string(), handle);
        Some(handle)
    }

    /// Loads an ordered animation frame sequence by pattern name.
    /// An empty result is logged and cached so it is not retried every
    /// frame.
    pub fn frame_sequence(&mut self, pattern: &str) -> Vec<TextureHandle> {
        if let Some(frames) = self.sequences.get(pattern) {
            return frames.clone();
        }

        let path = format!("{}{}", self.folder, pattern);
        let frames: Vec<TextureHandle> = self
            .catalog
            .load_frame_sequence(&path)
            .into_iter()
            .map(|info| self.allocate(info))
            .collect();

        if frames.is_empty() {
            warn!("Frame sequence '{}' resolved to no frames", path);
        }

        self.sequences.insert(pattern.to_string(), frames.clone());
        frames
    }

    pub fn texture_info(&self, handle: TextureHandle) -> Option<TextureInfo> {
        self.info.get(&handle).copied()
    }

    pub fn loaded_count(&self) -> usize {
        self.info.len()
    }

    fn allocate(&mut self, info: TextureInfo) -> TextureHandle {
        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        self.info.insert(handle, info);
        handle
    }
}

//=== Module Implementation ===============================================

impl Module for Textures {
    fn name(&self) -> &'static str {
        "textures"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        let config: TexturesConfig = match config {
            Value::Null => TexturesConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("textures: {}", e)))?,
        };
        self.folder = config.folder;
        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        info!("Releasing {} textures", self.info.len());
        self.by_name.clear();
        self.info.clear();
        self.sequences.clear();
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

    /// Catalog that knows a fixed set of names.
    struct FixedCatalog;

    impl AssetCatalog for FixedCatalog {
        fn load_texture(&mut self, path: &str) -> Option<TextureInfo> {
            path.ends_with("ball.png").then_some(TextureInfo { width: 24, height: 24 })
        }

        fn load_frame_sequence(&mut self, pattern: &str) -> Vec<TextureInfo> {
            if pattern.ends_with("spark") {
                vec![
                    TextureInfo { width: 16, height: 16 },
                    TextureInfo { width: 16, height: 16 },
                    TextureInfo { width: 16, height: 16 },
                ]
            } else {
                Vec::new()
            }
        }
    }

    fn textures() -> Textures {
        let mut t = Textures::new(Box::new(FixedCatalog));
        t.awake(&json!({ "folder": "assets/" })).unwrap();
        t
    }

    #[test]
    fn load_resolves_through_folder_prefix() {
        let mut t = textures();
        let handle = t.load("ball.png").expect("catalog knows ball.png");
        assert_eq!(t.texture_info(handle), Some(TextureInfo { width: 24, height: 24 }));
    }

    #[test]
    fn load_is_cached_by_name() {
        let mut t = textures();
        let first = t.load("ball.png").unwrap();
        let second = t.load("ball.png").unwrap();
        assert_eq!(first, second);
        assert_eq!(t.loaded_count(), 1);
    }

    #[test]
    fn unresolvable_texture_returns_none() {
        let mut t = textures();
        assert!(t.load("missing.png").is_none());
        assert_eq!(t.loaded_count(), 0);
    }

    #[test]
    fn frame_sequence_preserves_order_and_caches() {
        let mut t = textures();
        let frames = t.frame_sequence("spark");
        assert_eq!(frames.len(), 3);

        let again = t.frame_sequence("spark");
        assert_eq!(frames, again);
        assert_eq!(t.loaded_count(), 3);
    }

    #[test]
    fn empty_sequence_is_cached_not_retried() {
        let mut t = textures();
        assert!(t.frame_sequence("nothing").is_empty());
        assert!(t.frame_sequence("nothing").is_empty());
        assert_eq!(t.loaded_count(), 0);
    }
}
