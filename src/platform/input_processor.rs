//=========================================================================
// Input Processor
//=========================================================================
//
// Converts platform-specific Winit events into engine InputEvents.
//
// Architecture:
//   Winit Events → InputProcessor → InputEvent (engine type) → InputBuffer
//
// Stateful modifier tracking: caches modifier state from
// ModifiersChanged events and applies it to all subsequent key/mouse
// events. Unmapped keys (F13+, numpad, media keys) are filtered.
//
//=========================================================================

//=== External Dependencies ===============================================

use winit::{
    event::ElementState,
    event::{KeyEvent, MouseButton as WinitMouseButton},
    keyboard::{KeyCode as WinitKeyCode, ModifiersState, PhysicalKey},
};

//=== Internal Dependencies ===============================================

use crate::core::input::event::{InputEvent, KeyCode, Modifiers, MouseButton};

//=== InputProcessor ======================================================

/// Converts Winit events to engine InputEvents with stateful modifier
/// tracking.
pub struct InputProcessor {
    current_modifiers: Modifiers,
}

impl InputProcessor {
    pub fn new() -> Self {
        Self {
            current_modifiers: Modifiers::NONE,
        }
    }

    //--- Modifier State Management ----------------------------------------

    /// Updates cached modifier state (applied to subsequent events).
    pub fn update_modifiers(&mut self, modifiers_state: ModifiersState) {
        self.current_modifiers = Modifiers {
            shift: modifiers_state.shift_key(),
            ctrl: modifiers_state.control_key(),
            alt: modifiers_state.alt_key(),
        };
    }

    //--- Event Processing -------------------------------------------------

    /// Converts a Winit KeyEvent to an InputEvent (filters unmapped keys).
    pub fn process_key_event(&self, key_event: &KeyEvent) -> Option<InputEvent> {
        let key = match key_event.physical_key {
            PhysicalKey::Code(code) => map_key(code),
            _ => return None,
        };

        if matches!(key, KeyCode::Unidentified) {
            return None;
        }

        Some(match key_event.state {
            ElementState::Pressed => InputEvent::KeyDown { key, modifiers: self.current_modifiers },
            ElementState::Released => InputEvent::KeyUp { key, modifiers: self.current_modifiers },
        })
    }

    /// Converts a Winit mouse button event (with cached modifiers).
    pub fn process_mouse_button(
        &self,
        button: WinitMouseButton,
        state: ElementState,
    ) -> InputEvent {
        let button = map_button(button);

        match state {
            ElementState::Pressed => {
                InputEvent::MouseButtonDown { button, modifiers: self.current_modifiers }
            }
            ElementState::Released => {
                InputEvent::MouseButtonUp { button, modifiers: self.current_modifiers }
            }
        }
    }

    /// Creates a mouse move event (screen space, no modifiers).
    pub fn process_mouse_move(&self, x: f32, y: f32) -> InputEvent {
        InputEvent::MouseMoved { x, y }
    }
}

//=========================================================================
// Winit Conversions
//=========================================================================

/// Maps Winit physical key codes to engine key codes.
///
/// Covers A-Z, 0-9, F1-F6, arrows, and the common special keys.
/// Everything else maps to `Unidentified` and is filtered upstream.
fn map_key(code: WinitKeyCode) -> KeyCode {
    use WinitKeyCode::*;
    match code {
        //--- Digits -------------------------------------------------------

        Digit0 => KeyCode::Digit0,
        Digit1 => KeyCode::Digit1,
        Digit2 => KeyCode::Digit2,
        Digit3 => KeyCode::Digit3,
        Digit4 => KeyCode::Digit4,
        Digit5 => KeyCode::Digit5,
        Digit6 => KeyCode::Digit6,
        Digit7 => KeyCode::Digit7,
        Digit8 => KeyCode::Digit8,
        Digit9 => KeyCode::Digit9,

        //--- Letters ------------------------------------------------------

        KeyA => KeyCode::KeyA,
        KeyB => KeyCode::KeyB,
        KeyC => KeyCode::KeyC,
        KeyD => KeyCode::KeyD,
        KeyE => KeyCode::KeyE,
        KeyF => KeyCode::KeyF,
        KeyG => KeyCode::KeyG,
        KeyH => KeyCode::KeyH,
        KeyI => KeyCode::KeyI,
        KeyJ => KeyCode::KeyJ,
        KeyK => KeyCode::KeyK,
        KeyL => KeyCode::KeyL,
        KeyM => KeyCode::KeyM,
        KeyN => KeyCode::KeyN,
        KeyO => KeyCode::KeyO,
        KeyP => KeyCode::KeyP,
        KeyQ => KeyCode::KeyQ,
        KeyR => KeyCode::KeyR,
        KeyS => KeyCode::KeyS,
        KeyT => KeyCode::KeyT,
        KeyU => KeyCode::KeyU,
        KeyV => KeyCode::KeyV,
        KeyW => KeyCode::KeyW,
        KeyX => KeyCode::KeyX,
        KeyY => KeyCode::KeyY,
        KeyZ => KeyCode::KeyZ,

        //--- Function Keys ------------------------------------------------

        F1 => KeyCode::F1,
        F2 => KeyCode::F2,
        F3 => KeyCode::F3,
        F4 => KeyCode::F4,
        F5 => KeyCode::F5,
        F6 => KeyCode::F6,

        //--- Arrows -------------------------------------------------------

        ArrowUp => KeyCode::ArrowUp,
        ArrowDown => KeyCode::ArrowDown,
        ArrowLeft => KeyCode::ArrowLeft,
        ArrowRight => KeyCode::ArrowRight,

        //--- Special ------------------------------------------------------

        Space => KeyCode::Space,
        Enter => KeyCode::Enter,
        Escape => KeyCode::Escape,
        Tab => KeyCode::Tab,
        Backspace => KeyCode::Backspace,
        Delete => KeyCode::Delete,

        //--- Unmapped -----------------------------------------------------

        _ => KeyCode::Unidentified,
    }
}

fn map_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        _ => MouseButton::Other,
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_keys_are_mapped() {
        assert_eq!(map_key(WinitKeyCode::F1), KeyCode::F1);
        assert_eq!(map_key(WinitKeyCode::KeyN), KeyCode::KeyN);
        assert_eq!(map_key(WinitKeyCode::Digit5), KeyCode::Digit5);
    }

    #[test]
    fn exotic_keys_are_unidentified() {
        assert_eq!(map_key(WinitKeyCode::F13), KeyCode::Unidentified);
        assert_eq!(map_key(WinitKeyCode::NumpadAdd), KeyCode::Unidentified);
    }

    #[test]
    fn modifiers_apply_to_mouse_buttons() {
        let mut processor = InputProcessor::new();
        processor.update_modifiers(ModifiersState::SHIFT);

        let event = processor.process_mouse_button(WinitMouseButton::Left, ElementState::Pressed);
        match event {
            InputEvent::MouseButtonDown { button, modifiers } => {
                assert_eq!(button, MouseButton::Left);
                assert!(modifiers.shift);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
