//=========================================================================
// Input Buffer
//
// Collects and normalizes raw input events (keyboard, mouse) into two
// categories: discrete and continuous. Acts as a transient event
// aggregator between the platform shell and the Input module.
//
// Responsibilities:
// - Store incoming platform events per frame
// - Deduplicate repeated discrete inputs (e.g., auto-repeat KeyDown)
// - Coalesce continuous inputs (only the last MouseMoved matters)
// - Provide unified access to collected events via `drain()`
//
//=========================================================================

//=== Internal Modules ====================================================

use crate::core::input::event::InputEvent;

//=== InputBuffer =========================================================

/// Transient event store for one frame of input.
pub struct InputBuffer {
    discrete: Vec<InputEvent>,

    /// Latest continuous event (cursor position); newer replaces older.
    continuous: Option<InputEvent>,
}

impl InputBuffer {
    pub fn new() -> Self {
        const DISCRETE_BASE: usize = 128;

        Self {
            discrete: Vec::with_capacity(DISCRETE_BASE),
            continuous: None,
        }
    }

    //--- Continuous Event Handling ---------------------------------------

    /// Replaces the buffered continuous input; the last position of the
    /// frame is the only one anyone reads.
    pub fn push_continuous(&mut self, event: InputEvent) {
        self.continuous = Some(event);
    }

    //--- Discrete Event Handling -----------------------------------------

    /// Appends a discrete input. Consecutive duplicates (OS auto-repeat
    /// floods) are ignored.
    pub fn push_discrete(&mut self, event: InputEvent) {
        if self.discrete.last() != Some(&event) {
            self.discrete.push(event);
        }
    }

    //--- Drain ------------------------------------------------------------

    /// Takes this frame's events, leaving the buffer empty. Returns
    /// `None` when there is nothing to send.
    pub fn drain(&mut self) -> Option<(Vec<InputEvent>, Vec<InputEvent>)> {
        if self.is_empty() {
            return None;
        }

        let discrete = std::mem::take(&mut self.discrete);
        let continuous = self.continuous.take().into_iter().collect();
        Some((discrete, continuous))
    }

    pub fn is_empty(&self) -> bool {
        self.discrete.is_empty() && self.continuous.is_none()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::event::{KeyCode, Modifiers};

    fn key_down(key: KeyCode) -> InputEvent {
        InputEvent::KeyDown { key, modifiers: Modifiers::NONE }
    }

    fn mouse_move(x: f32, y: f32) -> InputEvent {
        InputEvent::MouseMoved { x, y }
    }

    #[test]
    fn discrete_consecutive_duplicates_are_dropped() {
        let mut buffer = InputBuffer::new();
        buffer.push_discrete(key_down(KeyCode::KeyA));
        buffer.push_discrete(key_down(KeyCode::KeyA));
        buffer.push_discrete(key_down(KeyCode::KeyB));

        let (discrete, _) = buffer.drain().unwrap();
        assert_eq!(discrete.len(), 2);
    }

    #[test]
    fn continuous_keeps_only_the_latest() {
        let mut buffer = InputBuffer::new();
        buffer.push_continuous(mouse_move(10.0, 10.0));
        buffer.push_continuous(mouse_move(20.0, 30.0));

        let (_, continuous) = buffer.drain().unwrap();
        assert_eq!(continuous, vec![mouse_move(20.0, 30.0)]);
    }

    #[test]
    fn drain_empties_the_buffer() {
        let mut buffer = InputBuffer::new();
        buffer.push_discrete(key_down(KeyCode::KeyA));
        buffer.push_continuous(mouse_move(5.0, 5.0));

        assert!(buffer.drain().is_some());
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_none());
    }
}
