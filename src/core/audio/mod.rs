//=========================================================================
// Audio Module
//=========================================================================
//
// Thin registry over an external mixing backend. Decoding, channels,
// and actual playback live behind the `AudioSink` collaborator; the
// engine tracks fx handles and volume preferences and forwards play
// requests.
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

//=== FxHandle ============================================================

/// Stable handle to a loaded sound effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FxHandle(pub u32);

//=== AudioSink ===========================================================

/// External mixing backend.
pub trait AudioSink {
    /// Loads an effect; `None` when the asset cannot be resolved.
    fn load_fx(&mut self, path: &str) -> Option<u32>;

    fn play_fx(&mut self, fx: u32);

    fn play_music(&mut self, path: &str, looping: bool);

    /// Volumes in 0.0 ..= 1.0.
    fn set_volumes(&mut self, music: f32, fx: f32);
}

/// Backend that plays nothing. Headless runs and tests.
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn load_fx(&mut self, _path: &str) -> Option<u32> {
        None
    }

    fn play_fx(&mut self, _fx: u32) {}

    fn play_music(&mut self, _path: &str, _looping: bool) {}

    fn set_volumes(&mut self, _music: f32, _fx: f32) {}
}

//=== Configuration =======================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct AudioConfig {
    music_volume: f32,
    fx_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { music_volume: 0.7, fx_volume: 1.0 }
    }
}

//=== Audio ===============================================================

/// Audio module: fx registry + volume preferences.
pub struct Audio {
    sink: Box<dyn AudioSink>,

    by_name: HashMap<String, FxHandle>,
    backend_ids: HashMap<FxHandle, u32>,
    next_handle: u32,

    music_volume: f32,
    fx_volume: f32,

    active: bool,
}

impl Audio {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            by_name: HashMap::new(),
            backend_ids: HashMap::new(),
            next_handle: 1,
            music_volume: 0.7,
            fx_volume: 1.0,
            active: true,
        }
    }

    //--- Playback ---------------------------------------------------------

    /// Loads (or returns the cached handle for) a named effect.
    pub fn load_fx(&mut self, path: &str) -> Option<FxHandle> {
        if let Some(&handle) = self.by_name.get(path) {
            return Some(handle);
        }

        let Some(backend_id) = self.sink.load_fx(path) else {
            warn!("Sound effect '{}' could not be resolved", path);
            return None;
        };

        let handle = FxHandle(self.next_handle);
        self.next_handle += 1;
        self.by_name.insert(path.to_string(), handle);
        self.backend_ids.insert(handle, backend_id);
        Some(handle)
    }

    pub fn play_fx(&mut self, fx: FxHandle) {
        match self.backend_ids.get(&fx) {
            Some(&backend_id) => self.sink.play_fx(backend_id),
            None => warn!("play_fx with unknown handle {:?}", fx),
        }
    }

    pub fn play_music(&mut self, path: &str, looping: bool) {
        self.sink.play_music(path, looping);
    }

    pub fn volumes(&self) -> (f32, f32) {
        (self.music_volume, self.fx_volume)
    }
}

//=== Module Implementation ===============================================

impl Module for Audio {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        let config: AudioConfig = match config {
            Value::Null => AudioConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("audio: {}", e)))?,
        };

        self.music_volume = config.music_volume.clamp(0.0, 1.0);
        self.fx_volume = config.fx_volume.clamp(0.0, 1.0);
        self.sink.set_volumes(self.music_volume, self.fx_volume);
        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        info!("Releasing {} sound effects", self.backend_ids.len());
        self.by_name.clear();
        self.backend_ids.clear();
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
    use std::cell::RefCell;
    use std::rc::Rc;

    struct CountingSink {
        played: Rc<RefCell<Vec<u32>>>,
    }

    impl AudioSink for CountingSink {
        fn load_fx(&mut self, path: &str) -> Option<u32> {
            path.ends_with(".wav").then_some(path.len() as u32)
        }

        fn play_fx(&mut self, fx: u32) {
            self.played.borrow_mut().push(fx);
        }

        fn play_music(&mut self, _path: &str, _looping: bool) {}

        fn set_volumes(&mut self, _music: f32, _fx: f32) {}
    }

    fn audio() -> (Audio, Rc<RefCell<Vec<u32>>>) {
        let played = Rc::new(RefCell::new(Vec::new()));
        (Audio::new(Box::new(CountingSink { played: played.clone() })), played)
    }

    #[test]
    fn load_and_play_routes_to_backend() {
        let (mut audio, played) = audio();
        let bump = audio.load_fx("bumper.wav").unwrap();
        audio.play_fx(bump);
        assert_eq!(played.borrow().len(), 1);
    }

    #[test]
    fn unknown_handle_is_a_warning_not_a_panic() {
        let (mut audio, played) = audio();
        audio.play_fx(FxHandle(99));
        assert!(played.borrow().is_empty());
    }

    #[test]
    fn awake_clamps_volumes() {
        let (mut audio, _) = audio();
        audio
            .awake(&serde_json::json!({ "music_volume": 2.5, "fx_volume": -1.0 }))
            .unwrap();
        assert_eq!(audio.volumes(), (1.0, 0.0));
    }
}
