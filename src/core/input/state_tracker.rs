//=========================================================================
// State Tracker
//=========================================================================
//
// Low-level input state tracking with per-frame delta tracking.
//
// Architecture:
//   InputEvent → process_events() → HashSet (keys/buttons held) → query
//
// Frame lifecycle: clear() → process_events() → finalize_frame() → query
//
// Queries come in two flavors: edge-style booleans (pressed this frame /
// held / released this frame) and the combined `KeyState` used by the
// physics debug bindings, which need to distinguish a fresh press from a
// hold in a single match.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashSet;

//=== Internal Dependencies ===============================================

use super::event::{InputEvent, KeyCode, Modifiers, MouseButton};

//=== KeyState ============================================================

/// Combined per-frame state of a key or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Not held, no transition this frame.
    Idle,

    /// Transitioned UP → DOWN this frame.
    Pressed,

    /// Held, but the transition happened on an earlier frame.
    Held,

    /// Transitioned DOWN → UP this frame.
    Released,
}

//=== StateTracker ========================================================

/// Tracks persistent state (keys held) and per-frame deltas (pressed /
/// released). Frame lifecycle: clear() → process_events() →
/// finalize_frame() → query.
pub struct StateTracker {
    //--- Persistent State (survives frame boundary) ----------------------
    keys_down: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    mouse_position: (f32, f32),
    modifiers: Modifiers,

    //--- Frame Deltas (reset each frame via clear()) ---------------------
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    buttons_pressed: HashSet<MouseButton>,
    buttons_released: HashSet<MouseButton>,

    //--- Continuous Input -------------------------------------------------
    mouse_delta: (f32, f32),
    last_mouse_position: (f32, f32),
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            keys_down: HashSet::new(),
            buttons_down: HashSet::new(),
            mouse_position: (0.0, 0.0),
            modifiers: Modifiers::NONE,
            keys_pressed: HashSet::new(),
            keys_released: HashSet::new(),
            buttons_pressed: HashSet::new(),
            buttons_released: HashSet::new(),
            mouse_delta: (0.0, 0.0),
            last_mouse_position: (0.0, 0.0),
        }
    }

    //--- Frame Processing -------------------------------------------------

    /// Clears frame-specific deltas (pressed/released flags).
    pub(super) fn clear(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.last_mouse_position = self.mouse_position;
    }

    /// Processes input events, updating internal state.
    pub(super) fn process_events(&mut self, events: &[InputEvent]) {
        for event in events {
            self.process_event(event);
        }
    }

    /// Finalizes frame calculations (mouse delta).
    pub(super) fn finalize_frame(&mut self) {
        self.mouse_delta = (
            self.mouse_position.0 - self.last_mouse_position.0,
            self.mouse_position.1 - self.last_mouse_position.1,
        );
    }

    //--- Internal Helpers -------------------------------------------------

    fn process_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown { key, modifiers } => {
                self.modifiers = modifiers;
                // OS key-repeat resends KeyDown while held; only the first
                // transition counts as a press.
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }

            InputEvent::KeyUp { key, modifiers } => {
                self.modifiers = modifiers;
                if self.keys_down.remove(&key) {
                    self.keys_released.insert(key);
                }
            }

            InputEvent::MouseButtonDown { button, modifiers } => {
                self.modifiers = modifiers;
                if self.buttons_down.insert(button) {
                    self.buttons_pressed.insert(button);
                }
            }

            InputEvent::MouseButtonUp { button, modifiers } => {
                self.modifiers = modifiers;
                if self.buttons_down.remove(&button) {
                    self.buttons_released.insert(button);
                }
            }

            InputEvent::MouseMoved { x, y } => {
                self.mouse_position = (x, y);
            }

            InputEvent::Unidentified => {}
        }
    }

    //=====================================================================
    // Query API - Keyboard
    //=====================================================================

    /// Returns `true` if key transitioned UP → DOWN (one frame only).
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns `true` while key is held.
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns `true` if key transitioned DOWN → UP this frame.
    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Combined per-frame key state.
    pub fn key_state(&self, key: KeyCode) -> KeyState {
        if self.keys_pressed.contains(&key) {
            KeyState::Pressed
        } else if self.keys_down.contains(&key) {
            KeyState::Held
        } else if self.keys_released.contains(&key) {
            KeyState::Released
        } else {
            KeyState::Idle
        }
    }

    //=====================================================================
    // Query API - Mouse
    //=====================================================================

    /// Like [`is_key_pressed`](Self::is_key_pressed) but for mouse buttons.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    /// Like [`is_key_down`](Self::is_key_down) but for mouse buttons.
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Like [`is_key_released`](Self::is_key_released) but for mouse buttons.
    pub fn is_button_released(&self, button: MouseButton) -> bool {
        self.buttons_released.contains(&button)
    }

    /// Combined per-frame button state.
    pub fn button_state(&self, button: MouseButton) -> KeyState {
        if self.buttons_pressed.contains(&button) {
            KeyState::Pressed
        } else if self.buttons_down.contains(&button) {
            KeyState::Held
        } else if self.buttons_released.contains(&button) {
            KeyState::Released
        } else {
            KeyState::Idle
        }
    }

    /// Mouse position in screen coordinates (pixels, top-left origin).
    pub fn mouse_position(&self) -> (f32, f32) {
        self.mouse_position
    }

    /// Mouse movement delta since last frame (0,0 if no movement).
    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    /// Current modifier key state.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key_down(key: KeyCode) -> InputEvent {
        InputEvent::KeyDown { key, modifiers: Modifiers::NONE }
    }

    fn key_up(key: KeyCode) -> InputEvent {
        InputEvent::KeyUp { key, modifiers: Modifiers::NONE }
    }

    fn frame(tracker: &mut StateTracker, events: &[InputEvent]) {
        tracker.clear();
        tracker.process_events(events);
        tracker.finalize_frame();
    }

    #[test]
    fn press_is_one_frame_then_held() {
        let mut tracker = StateTracker::new();

        frame(&mut tracker, &[key_down(KeyCode::KeyB)]);
        assert_eq!(tracker.key_state(KeyCode::KeyB), KeyState::Pressed);
        assert!(tracker.is_key_pressed(KeyCode::KeyB));

        frame(&mut tracker, &[]);
        assert_eq!(tracker.key_state(KeyCode::KeyB), KeyState::Held);
        assert!(!tracker.is_key_pressed(KeyCode::KeyB));
        assert!(tracker.is_key_down(KeyCode::KeyB));
    }

    #[test]
    fn release_is_one_frame_then_idle() {
        let mut tracker = StateTracker::new();

        frame(&mut tracker, &[key_down(KeyCode::KeyN)]);
        frame(&mut tracker, &[key_up(KeyCode::KeyN)]);
        assert_eq!(tracker.key_state(KeyCode::KeyN), KeyState::Released);

        frame(&mut tracker, &[]);
        assert_eq!(tracker.key_state(KeyCode::KeyN), KeyState::Idle);
    }

    #[test]
    fn os_key_repeat_does_not_retrigger_press() {
        let mut tracker = StateTracker::new();

        frame(&mut tracker, &[key_down(KeyCode::Space)]);
        frame(&mut tracker, &[key_down(KeyCode::Space)]);

        assert_eq!(tracker.key_state(KeyCode::Space), KeyState::Held);
    }

    #[test]
    fn button_edges_mirror_key_edges() {
        let mut tracker = StateTracker::new();

        frame(&mut tracker, &[InputEvent::MouseButtonDown {
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        }]);
        assert_eq!(tracker.button_state(MouseButton::Left), KeyState::Pressed);

        frame(&mut tracker, &[InputEvent::MouseButtonUp {
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        }]);
        assert_eq!(tracker.button_state(MouseButton::Left), KeyState::Released);
    }

    #[test]
    fn mouse_delta_spans_one_frame() {
        let mut tracker = StateTracker::new();

        frame(&mut tracker, &[InputEvent::MouseMoved { x: 100.0, y: 50.0 }]);
        assert_eq!(tracker.mouse_position(), (100.0, 50.0));

        frame(&mut tracker, &[InputEvent::MouseMoved { x: 110.0, y: 45.0 }]);
        assert_eq!(tracker.mouse_delta(), (10.0, -5.0));

        frame(&mut tracker, &[]);
        assert_eq!(tracker.mouse_delta(), (0.0, 0.0));
    }

    #[test]
    fn modifiers_follow_latest_event() {
        let mut tracker = StateTracker::new();

        frame(&mut tracker, &[InputEvent::KeyDown {
            key: KeyCode::Digit3,
            modifiers: Modifiers { shift: true, ctrl: false, alt: false },
        }]);
        assert!(tracker.modifiers().shift);
    }
}
