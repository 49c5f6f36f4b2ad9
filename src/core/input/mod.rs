//=========================================================================
// Input Module
//
// First module in the registry: every frame's pre_update pass begins by
// draining the platform event channel into the state tracker, so every
// later module sees a consistent input snapshot for the whole frame.
//
// Responsibilities:
// - Drain batched platform events (non-blocking) each pre_update
// - Maintain held/pressed/released state for keys and buttons
// - Latch the quit request when the window closes or the platform dies
// - Expose read-only queries for gameplay, physics debug, and UI layers
//
//=========================================================================

//=== Submodules ==========================================================

pub mod event;
mod state_tracker;

//=== Public API ==========================================================

pub use event::{InputEvent, KeyCode, Modifiers, MouseButton};
pub use state_tracker::{KeyState, StateTracker};

//=== External Crates =====================================================

use std::rc::Rc;

use crossbeam_channel::Receiver;
use log::info;

//=== Internal Imports ====================================================

use crate::core::app::AppSignals;
use crate::core::module::{Module, ModuleError};
use crate::core::platform_bridge::{CollectControl, EventCollector, PlatformEvent};

//=== Input ===============================================================

/// Input module: event intake plus per-frame state queries.
pub struct Input {
    collector: EventCollector,
    tracker: StateTracker,
    signals: Rc<AppSignals>,
    active: bool,
}

impl Input {
    //--- Construction -----------------------------------------------------

    /// `receiver` is the platform shell's event channel; headless setups
    /// (tests) keep the sender and feed events synthetically.
    pub fn new(receiver: Receiver<PlatformEvent>, signals: Rc<AppSignals>) -> Self {
        Self {
            collector: EventCollector::new(receiver),
            tracker: StateTracker::new(),
            signals,
            active: true,
        }
    }

    //--- Query Methods ----------------------------------------------------
    //
    // Thin pass-throughs to the tracker; collaborators hold an
    // `Rc<RefCell<Input>>` and only ever call these.
    //

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.tracker.is_key_pressed(key)
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.tracker.is_key_down(key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.tracker.is_key_released(key)
    }

    pub fn key_state(&self, key: KeyCode) -> KeyState {
        self.tracker.key_state(key)
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.tracker.is_button_pressed(button)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.tracker.is_button_down(button)
    }

    pub fn is_button_released(&self, button: MouseButton) -> bool {
        self.tracker.is_button_released(button)
    }

    pub fn button_state(&self, button: MouseButton) -> KeyState {
        self.tracker.button_state(button)
    }

    pub fn mouse_position(&self) -> (f32, f32) {
        self.tracker.mouse_position()
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        self.tracker.mouse_delta()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.tracker.modifiers()
    }
}

//=== Module Implementation ===============================================

impl Module for Input {
    fn name(&self) -> &'static str {
        "input"
    }

    fn init(&mut self) {
        info!("Input module registered");
    }

    /// Digests this frame's platform events into the state tracker.
    fn pre_update(&mut self) -> Result<(), ModuleError> {
        self.tracker.clear();

        if self.collector.collect_frame() == CollectControl::Shutdown {
            self.signals.request_quit();
        }

        for batch in self.collector.take_batches() {
            self.tracker.process_events(&batch);
        }

        self.tracker.finalize_frame();
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
    use crossbeam_channel::{unbounded, Sender};

    fn harness() -> (Input, Sender<PlatformEvent>, Rc<AppSignals>) {
        let (tx, rx) = unbounded();
        let signals = AppSignals::new();
        (Input::new(rx, signals.clone()), tx, signals)
    }

    fn send_key_down(tx: &Sender<PlatformEvent>, key: KeyCode) {
        tx.send(PlatformEvent::Inputs {
            discrete: vec![InputEvent::KeyDown { key, modifiers: Modifiers::NONE }],
            continuous: vec![],
        })
        .unwrap();
    }

    #[test]
    fn pre_update_digests_channel_events() {
        let (mut input, tx, _) = harness();

        send_key_down(&tx, KeyCode::Space);
        input.pre_update().unwrap();

        assert_eq!(input.key_state(KeyCode::Space), KeyState::Pressed);

        input.pre_update().unwrap();
        assert_eq!(input.key_state(KeyCode::Space), KeyState::Held);
    }

    #[test]
    fn window_closed_latches_quit_signal() {
        let (mut input, tx, signals) = harness();

        tx.send(PlatformEvent::WindowClosed).unwrap();
        input.pre_update().unwrap();

        assert!(signals.quit_requested());
    }

    #[test]
    fn disconnected_platform_latches_quit_signal() {
        let (mut input, tx, signals) = harness();

        drop(tx);
        input.pre_update().unwrap();

        assert!(signals.quit_requested());
    }

    #[test]
    fn mouse_position_tracks_continuous_batch() {
        let (mut input, tx, _) = harness();

        tx.send(PlatformEvent::Inputs {
            discrete: vec![],
            continuous: vec![InputEvent::MouseMoved { x: 320.0, y: 480.0 }],
        })
        .unwrap();
        input.pre_update().unwrap();

        assert_eq!(input.mouse_position(), (320.0, 480.0));
    }
}
