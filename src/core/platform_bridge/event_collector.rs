//=========================================================================
// Event Collector
//=========================================================================
//
// Platform event collector with bounded polling and shutdown detection.
//
// Architecture:
//   Receiver<PlatformEvent> → collect_frame() → input_batches → TickControl
//
// Bounded polling prevents starvation. Everything is non-blocking: the
// frame loop paces itself, so an empty queue simply yields an empty frame.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::warn;

//=== Internal Dependencies ===============================================

use super::PlatformEvent;
use crate::core::input::event::InputEvent;

//=== TickControl =========================================================

/// Collector verdict for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectControl {
    Continue,
    /// The window closed or the platform side disappeared.
    Shutdown,
}

//=== EventCollector ======================================================

/// Collects platform events with bounded polling and batch extraction.
pub struct EventCollector {
    receiver: Receiver<PlatformEvent>,
    input_batches: Vec<Vec<InputEvent>>,
}

impl EventCollector {
    pub fn new(receiver: Receiver<PlatformEvent>) -> Self {
        Self {
            receiver,
            input_batches: Vec::with_capacity(4),
        }
    }

    /// Collects pending platform events (bounded to prevent starvation).
    pub fn collect_frame(&mut self) -> CollectControl {
        const MAX_EVENTS_PER_FRAME: usize = 100;

        self.input_batches.clear();
        let mut drained = 0;

        while drained < MAX_EVENTS_PER_FRAME {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.handle_event(event) == CollectControl::Shutdown {
                        return CollectControl::Shutdown;
                    }
                    drained += 1;
                }
                Err(TryRecvError::Disconnected) => return CollectControl::Shutdown,
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= MAX_EVENTS_PER_FRAME {
            warn!("Event queue backlog: drained {} events this frame", drained);
        }

        CollectControl::Continue
    }

    /// Takes ownership of collected input batches, leaving an empty vec.
    pub fn take_batches(&mut self) -> Vec<Vec<InputEvent>> {
        std::mem::take(&mut self.input_batches)
    }

    fn handle_event(&mut self, event: PlatformEvent) -> CollectControl {
        match event {
            PlatformEvent::Inputs { discrete, continuous } => {
                if !discrete.is_empty() {
                    self.input_batches.push(discrete);
                }
                if !continuous.is_empty() {
                    self.input_batches.push(continuous);
                }
                CollectControl::Continue
            }
            PlatformEvent::WindowClosed => CollectControl::Shutdown,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
