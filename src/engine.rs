//=========================================================================
// Voltaic Engine
//
// Main entry point and coordinator for the engine.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run()──>  [Frame Loop]
//         │                          │
//         ├─ with_config_*()         ├─ awake / start all modules
//         ├─ with_render_sink()      ├─ winit shell drives App::update
//         └─ with_asset_catalog()    └─ clean_up in reverse order
// ```
//
// The builder is also the dependency injector: every module receives
// its collaborators here, by `Rc` handle, instead of reaching through
// ambient globals. Registration order is lifecycle order (and the
// reverse of cleanup order); render goes last so it flushes a frame
// every other module has already written into.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Sender};
use log::info;
use serde_json::Value;

//=== Internal Dependencies ===============================================

use crate::core::app::{App, AppSignals, TickControl};
use crate::core::audio::{Audio, AudioSink, NullAudio};
use crate::core::config::ConfigSource;
use crate::core::entity::EntityManager;
use crate::core::fonts::Fonts;
use crate::core::input::Input;
use crate::core::map::Map;
use crate::core::module::ModuleError;
use crate::core::physics::Physics;
use crate::core::platform_bridge::{PlatformError, PlatformEvent};
use crate::core::render::{NullSink, Render, RenderSink};
use crate::core::scene::Scene;
use crate::core::textures::{AssetCatalog, NullCatalog, Textures};
use crate::core::window::Window;
use crate::platform::Platform;

//=== EngineError =========================================================

/// Top-level failure, tagged by the lifecycle stage that produced it.
#[derive(Debug)]
pub enum EngineError {
    /// A module failed to awake or start; nothing ran.
    Startup(ModuleError),

    /// A module failed mid-frame; the loop ended and cleanup ran.
    Runtime(ModuleError),

    /// Cleanup itself reported a failure.
    Shutdown(ModuleError),

    /// The windowing layer failed.
    Platform(PlatformError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Startup(e) => write!(f, "Startup failed: {}", e),
            Self::Runtime(e) => write!(f, "Frame loop failed: {}", e),
            Self::Shutdown(e) => write!(f, "Shutdown failed: {}", e),
            Self::Platform(e) => write!(f, "Platform failed: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Defaults
///
/// - **Config**: `config.json` next to the executable
/// - **Save file**: `save_game.json`
/// - **Render sink / asset catalog / audio sink**: null backends
///   (headless; a real frontend injects its own)
///
/// # Examples
///
/// ```no_run
/// use voltaic_engine::EngineBuilder;
///
/// EngineBuilder::new().build().run().unwrap();
/// ```
///
/// Headless with inline configuration (tests, servers):
/// ```
/// use voltaic_engine::EngineBuilder;
/// use serde_json::json;
///
/// EngineBuilder::new()
///     .with_config(json!({ "app": { "title": "Test Cabinet" } }))
///     .build()
///     .run_headless(3)
///     .unwrap();
/// ```
pub struct EngineBuilder {
    config: ConfigSource,
    save_path: Option<PathBuf>,
    render_sink: Option<Box<dyn RenderSink>>,
    asset_catalog: Option<Box<dyn AssetCatalog>>,
    audio_sink: Option<Box<dyn AudioSink>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigSource::File(PathBuf::from("config.json")),
            save_path: None,
            render_sink: None,
            asset_catalog: None,
            audio_sink: None,
        }
    }

    /// Loads configuration from a JSON file at `path`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = ConfigSource::File(path.into());
        self
    }

    /// Uses an inline configuration tree (never persisted).
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = ConfigSource::Inline(config);
        self
    }

    /// Overrides the save-file location.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Injects the presentation backend.
    pub fn with_render_sink(mut self, sink: Box<dyn RenderSink>) -> Self {
        self.render_sink = Some(sink);
        self
    }

    /// Injects the texture/asset resolver.
    pub fn with_asset_catalog(mut self, catalog: Box<dyn AssetCatalog>) -> Self {
        self.asset_catalog = Some(catalog);
        self
    }

    /// Injects the audio backend.
    pub fn with_audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.audio_sink = Some(sink);
        self
    }

    /// Wires every module and registers them in lifecycle order.
    pub fn build(self) -> Engine {
        info!("Building engine");

        let signals = AppSignals::new();
        let (event_sender, event_receiver) = bounded::<PlatformEvent>(128);

        //--- Modules, leaves first ---------------------------------------
        let input = Rc::new(RefCell::new(Input::new(event_receiver, signals.clone())));
        let window = Rc::new(RefCell::new(Window::new()));
        let textures = Rc::new(RefCell::new(Textures::new(
            self.asset_catalog.unwrap_or_else(|| Box::new(NullCatalog)),
        )));
        let audio = Rc::new(RefCell::new(Audio::new(
            self.audio_sink.unwrap_or_else(|| Box::new(NullAudio)),
        )));
        let render = Rc::new(RefCell::new(Render::new(
            self.render_sink.unwrap_or_else(|| Box::new(NullSink)),
            window.clone(),
        )));
        render.borrow_mut().connect_signals(signals.clone());

        let fonts = Rc::new(RefCell::new(Fonts::new(textures.clone(), render.clone())));
        let physics = Rc::new(RefCell::new(Physics::new(input.clone(), render.clone())));
        let entities = Rc::new(RefCell::new(EntityManager::new(render.clone())));
        let map = Rc::new(RefCell::new(Map::new(physics.clone())));
        let scene = Rc::new(RefCell::new(Scene::new(
            input.clone(),
            render.clone(),
            physics.clone(),
            textures.clone(),
            audio.clone(),
            fonts.clone(),
            entities.clone(),
            signals.clone(),
        )));

        //--- Registration: awake/start/update order; reverse of cleanup --
        let mut app = App::new(self.config, signals);
        if let Some(path) = self.save_path {
            app.set_save_path(path);
        }

        app.add_module(input);
        app.add_module(window.clone());
        app.add_module(textures);
        app.add_module(audio);
        app.add_module(fonts);
        app.add_module(physics);
        app.add_module(scene);
        app.add_module(entities);
        app.add_module(map);
        // Render last: it flushes the frame everyone else queued.
        app.add_module(render);

        Engine { app, event_sender, window }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Voltaic Engine runtime.
///
/// Create via [`EngineBuilder`]. `run()` opens a window and blocks
/// until the session ends; `run_headless()` drives the same lifecycle
/// without any OS surface.
pub struct Engine {
    app: App,
    event_sender: Sender<PlatformEvent>,
    window: Rc<RefCell<Window>>,
}

impl Engine {
    /// Channel into the Input module. Embedders and tests use this to
    /// feed synthetic input or a shutdown request.
    pub fn event_sender(&self) -> Sender<PlatformEvent> {
        self.event_sender.clone()
    }

    //--- Execution --------------------------------------------------------

    /// Starts the engine with an OS window and blocks until exit.
    ///
    /// # Lifecycle
    ///
    /// 1. `awake()` + `start()` every module (fail-fast)
    /// 2. Winit event loop drives one `App::update` per redraw
    /// 3. Quit request or fatal frame error leaves the loop
    /// 4. `clean_up()` every module in reverse order
    pub fn run(mut self) -> Result<(), EngineError> {
        self.app.awake().map_err(EngineError::Startup)?;
        self.app.start().map_err(EngineError::Startup)?;

        let title = self.app.title().to_string();
        let size = {
            let window = self.window.borrow();
            (window.width() * window.scale(), window.height() * window.scale())
        };

        info!("Entering frame loop ({})", title);
        let shell = Platform::new(&mut self.app, self.event_sender.clone(), title, size);
        let frame_failure = shell.run().map_err(EngineError::Platform)?;

        let cleanup = self.app.clean_up();

        if let Some(e) = frame_failure {
            return Err(EngineError::Runtime(e));
        }
        cleanup.map_err(EngineError::Shutdown)?;

        info!("Engine shutdown complete");
        Ok(())
    }

    /// Runs the full lifecycle without a window: at most `max_frames`
    /// frames, or until a quit request. Same protocol as `run()`.
    pub fn run_headless(mut self, max_frames: u64) -> Result<(), EngineError> {
        self.app.awake().map_err(EngineError::Startup)?;
        self.app.start().map_err(EngineError::Startup)?;

        let mut frames = 0;
        loop {
            match self.app.update() {
                Ok(TickControl::Continue) => {
                    frames += 1;
                    if frames >= max_frames {
                        break;
                    }
                }
                Ok(TickControl::Exit) => break,
                Err(e) => {
                    let _ = self.app.clean_up();
                    return Err(EngineError::Runtime(e));
                }
            }
        }

        self.app.clean_up().map_err(EngineError::Shutdown)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
