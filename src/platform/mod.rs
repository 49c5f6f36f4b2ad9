//=========================================================================
// Platform Shell
//
// Bridges Winit (OS window + events) with the engine's frame loop.
//
// Architecture:
// ```text
//  Winit Event Loop (main thread)
//   ├─ input events ──► InputProcessor ──► InputBuffer
//   └─ RedrawRequested (frame boundary)
//        ├─ flush buffer ──► channel ──► Input module
//        ├─ App::update()  (the whole five-phase frame)
//        └─ request next redraw / exit
// ```
//
// Key design decisions:
// - **RedrawRequested = frame boundary**: buffered input is sent
//   atomically, then the frame runs; event order stays deterministic.
// - **Single thread**: the frame loop is cooperative, so the shell
//   drives `App::update` directly from the event handler instead of
//   spawning a logic thread. Frame pacing lives in the App.
// - **Close goes through the quit signal**: CloseRequested sends
//   `WindowClosed` down the channel; the Input module latches the quit
//   request and the next frame exits through the lifecycle protocol,
//   so shutdown is identical for windowed and headless runs.
//
//=========================================================================

//=== Submodules ==========================================================

mod input_buffer;
mod input_processor;

//=== External Crates =====================================================

use crossbeam_channel::Sender;
use log::{error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

//=== Internal Imports ====================================================

use crate::core::app::{App, TickControl};
use crate::core::module::ModuleError;
use crate::core::platform_bridge::{PlatformError, PlatformEvent};
use input_buffer::InputBuffer;
use input_processor::InputProcessor;

//=== Platform ============================================================

/// Window manager, input pump, and frame driver.
///
/// Owns the OS window and runs the Winit event loop on the calling
/// thread (a Winit requirement on macOS/iOS). Each `RedrawRequested`
/// flushes buffered input to the Input module's channel and runs one
/// frame of the lifecycle protocol.
pub(crate) struct Platform<'app> {
    app: &'app mut App,

    /// OS window handle (None until `resumed()` is called).
    window: Option<Window>,

    buffer: InputBuffer,
    event_sender: Sender<PlatformEvent>,
    input_processor: InputProcessor,

    title: String,
    size: (u32, u32),

    /// First fatal frame error, handed back to the engine after exit.
    failure: Option<ModuleError>,
}

impl<'app> Platform<'app> {
    //--- Construction -----------------------------------------------------

    pub fn new(
        app: &'app mut App,
        event_sender: Sender<PlatformEvent>,
        title: String,
        size: (u32, u32),
    ) -> Self {
        info!(target: "platform", "Platform shell initialized ({}x{})", size.0, size.1);
        Self {
            app,
            window: None,
            buffer: InputBuffer::new(),
            event_sender,
            input_processor: InputProcessor::new(),
            title,
            size,
            failure: None,
        }
    }

    //--- Execution --------------------------------------------------------

    /// Runs the event loop until the frame loop exits (quit request or
    /// fatal module error). Returns the fatal error, if any.
    pub fn run(mut self) -> Result<Option<ModuleError>, PlatformError> {
        let event_loop = EventLoop::new()
            .map_err(|e| PlatformError::EventLoopCreation(e.to_string()))?;

        event_loop
            .run_app(&mut self)
            .map_err(|e| PlatformError::EventLoopExecution(e.to_string()))?;

        info!(target: "platform", "Event loop exited");
        Ok(self.failure.take())
    }

    //--- Internal Helpers -------------------------------------------------

    /// Sends this frame's buffered input to the Input module. A
    /// disconnected channel is logged and dropped; shutdown is already
    /// in progress when that can happen.
    fn flush_input_buffer(&mut self) {
        if let Some((discrete, continuous)) = self.buffer.drain() {
            trace!(
                target: "platform::input",
                "Flushing {} discrete + {} continuous events",
                discrete.len(),
                continuous.len()
            );

            if self.event_sender.send(PlatformEvent::Inputs { discrete, continuous }).is_err() {
                warn!(target: "platform::input", "Channel disconnected, dropping events");
            }
        }
    }

    /// Runs one frame and schedules the next (or exits).
    fn drive_frame(&mut self, event_loop: &ActiveEventLoop) {
        match self.app.update() {
            Ok(TickControl::Continue) => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Ok(TickControl::Exit) => {
                info!(target: "platform", "Frame loop requested exit");
                event_loop.exit();
            }
            Err(e) => {
                error!(target: "platform", "Frame failed, shutting down: {}", e);
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for Platform<'_> {
    /// Creates the window on startup (and on mobile resume).
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(&self.title)
            .with_inner_size(LogicalSize::new(self.size.0, self.size.1))
            .with_resizable(false);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x DPI",
                    window.inner_size().width,
                    window.inner_size().height,
                    window.scale_factor()
                );
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                let _ = self.event_sender.send(PlatformEvent::WindowClosed);
                // The quit propagates through the Input module; one more
                // frame runs so shutdown follows the lifecycle protocol.
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::ModifiersChanged(state) => {
                self.input_processor.update_modifiers(state.state());
            }

            WindowEvent::CursorMoved { position, .. } => {
                let event = self
                    .input_processor
                    .process_mouse_move(position.x as f32, position.y as f32);
                self.buffer.push_continuous(event);
            }

            WindowEvent::KeyboardInput { event: key_event, .. } => {
                if let Some(event) = self.input_processor.process_key_event(key_event) {
                    self.buffer.push_discrete(event);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let event = self.input_processor.process_mouse_button(*button, *state);
                self.buffer.push_discrete(event);
            }

            WindowEvent::RedrawRequested => {
                self.flush_input_buffer();
                self.drive_frame(event_loop);
            }

            _ => {
                // Resized, Focused, etc. carry nothing the core needs.
            }
        }
    }
}
