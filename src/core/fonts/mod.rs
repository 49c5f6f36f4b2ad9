//=========================================================================
// Fonts Module
//=========================================================================
//
// Fixed-grid bitmap font rendering: a font is one texture holding a
// charset laid out in uniform cells. `draw_text` turns a string into
// per-glyph Region commands on the render queue; characters outside
// the charset are skipped.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== External Crates =====================================================

use glam::Vec2;
use log::warn;
use serde::Deserialize;
use serde_json::Value;

//=== Internal Imports ====================================================

use crate::core::module::{Module, ModuleError};
use crate::core::render::Render;
use crate::core::textures::{TextureHandle, Textures};

//=== Configuration =======================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct FontsConfig {
    texture: String,
    charset: String,
    glyph_width: u32,
    glyph_height: u32,
    columns: u32,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            texture: String::new(),
            charset: String::new(),
            glyph_width: 8,
            glyph_height: 8,
            columns: 16,
        }
    }
}

//=== BitmapFont ==========================================================

struct BitmapFont {
    texture: TextureHandle,
    charset: String,
    glyph_size: Vec2,
    columns: u32,
}

impl BitmapFont {
    /// Source rectangle of `c` inside the font texture, or None if the
    /// charset does not contain it.
    fn glyph_rect(&self, c: char) -> Option<(Vec2, Vec2)> {
        let index = self.charset.chars().position(|g| g == c)? as u32;
        let col = index % self.columns;
        let row = index / self.columns;
        Some((
            Vec2::new(col as f32 * self.glyph_size.x, row as f32 * self.glyph_size.y),
            self.glyph_size,
        ))
    }
}

//=== Fonts ===============================================================

/// Fonts module: bitmap font loading and text layout.
pub struct Fonts {
    textures: Rc<RefCell<Textures>>,
    render: Rc<RefCell<Render>>,
    font: Option<BitmapFont>,
    config: FontsConfig,
    active: bool,
}

impl Fonts {
    pub fn new(textures: Rc<RefCell<Textures>>, render: Rc<RefCell<Render>>) -> Self {
        Self {
            textures,
            render,
            font: None,
            config: FontsConfig::default(),
            active: true,
        }
    }

    //--- Text Layout ------------------------------------------------------

    /// Queues one Region command per known glyph, advancing by glyph
    /// width. Unknown characters are skipped silently (score digits and
    /// uppercase labels are all the board needs).
    pub fn draw_text(&self, position: Vec2, text: &str) {
        let Some(font) = &self.font else {
            return;
        };

        let mut render = self.render.borrow_mut();
        let mut cursor = position;

        for c in text.chars() {
            if let Some((source_min, source_size)) = font.glyph_rect(c) {
                render.draw_region(font.texture, source_min, source_size, cursor);
            }
            cursor.x += font.glyph_size.x;
        }
    }

    pub fn loaded(&self) -> bool {
        self.font.is_some()
    }
}

//=== Module Implementation ===============================================

impl Module for Fonts {
    fn name(&self) -> &'static str {
        "fonts"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        self.config = match config {
            Value::Null => FontsConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("fonts: {}", e)))?,
        };
        Ok(())
    }

    /// Resolves the font texture. Runs at start (not awake) because the
    /// textures module must have its catalog configured first.
    fn start(&mut self) -> Result<(), ModuleError> {
        if self.config.texture.is_empty() {
            return Ok(());
        }

        match self.textures.borrow_mut().load(&self.config.texture) {
            Some(texture) => {
                self.font = Some(BitmapFont {
                    texture,
                    charset: self.config.charset.clone(),
                    glyph_size: Vec2::new(
                        self.config.glyph_width as f32,
                        self.config.glyph_height as f32,
                    ),
                    columns: self.config.columns.max(1),
                });
            }
            None => warn!("Font texture '{}' unavailable, text disabled", self.config.texture),
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
    use crate::core::render::{DrawCommand, NullSink};
    use crate::core::textures::{AssetCatalog, TextureInfo};
    use crate::core::window::Window;
    use serde_json::json;

    struct FontCatalog;

    impl AssetCatalog for FontCatalog {
        fn load_texture(&mut self, _path: &str) -> Option<TextureInfo> {
            Some(TextureInfo { width: 128, height: 64 })
        }

        fn load_frame_sequence(&mut self, _pattern: &str) -> Vec<TextureInfo> {
            Vec::new()
        }
    }

    fn fonts() -> (Fonts, Rc<RefCell<Render>>) {
        let textures = Rc::new(RefCell::new(Textures::new(Box::new(FontCatalog))));
        let window = Rc::new(RefCell::new(Window::new()));
        let render = Rc::new(RefCell::new(Render::new(Box::new(NullSink), window)));
        let mut fonts = Fonts::new(textures, render.clone());
        fonts
            .awake(&json!({
                "texture": "font.png",
                "charset": "0123456789 ABC",
                "glyph_width": 8,
                "glyph_height": 8,
                "columns": 8
            }))
            .unwrap();
        fonts.start().unwrap();
        (fonts, render)
    }

    #[test]
    fn draw_text_queues_one_region_per_known_glyph() {
        let (fonts, render) = fonts();
        assert!(fonts.loaded());

        fonts.draw_text(Vec2::ZERO, "12C");
        assert_eq!(render.borrow().queued().len(), 3);
    }

    #[test]
    fn unknown_glyphs_are_skipped_but_advance() {
        let (fonts, render) = fonts();

        fonts.draw_text(Vec2::ZERO, "1?2");
        let render = render.borrow();
        assert_eq!(render.queued().len(), 2);

        // The second drawn glyph sits two cells over: the '?' advanced.
        match render.queued()[1] {
            DrawCommand::Region { position, .. } => assert_eq!(position.x, 16.0),
            ref other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn glyph_rect_wraps_rows_by_column_count() {
        let font = BitmapFont {
            texture: TextureHandle(1),
            charset: "0123456789 ABC".into(),
            glyph_size: Vec2::new(8.0, 8.0),
            columns: 8,
        };

        // Index 10 (' ') wraps to row 1, column 2.
        let (min, _) = font.glyph_rect(' ').unwrap();
        assert_eq!(min, Vec2::new(16.0, 8.0));

        assert!(font.glyph_rect('z').is_none());
    }
}
