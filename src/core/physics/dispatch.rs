//=========================================================================
// Contact Dispatcher
//=========================================================================
//
// Turns simulator-level contact events into gameplay `on_collision`
// callbacks. Runs once per physics step, in two passes:
//
// Pass 1 — native begin contacts (solid vs solid):
//   Drains the collision event channel. Each newly-touching pair
//   notifies BOTH sides, each from its own perspective (`me` is always
//   the listener's body). Sensor-flagged events are skipped here; they
//   belong to pass 2.
//
// Pass 2 — synthesized sensor overlaps:
//   The simulator does not broadcast sensor begin-events through the
//   solid contact path, so the dispatcher walks the live intersection
//   list instead. Every currently-touching pair notifies the SENSOR
//   side's listener only: sensors are one-directional triggers, the
//   solid side never hears about the overlap. This re-fires on every
//   step while the overlap persists.
//
// Edge policy: a pair where either collider lacks a game-side PhysBody
// is skipped; a body whose listener is unset or already dropped loses
// the event silently.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::collections::HashMap;

//=== External Crates =====================================================

use rapier2d::crossbeam::channel::Receiver;
use rapier2d::prelude::{ColliderHandle, ColliderSet, CollisionEvent, NarrowPhase};

//=== Internal Imports ====================================================

use super::body::{PhysBody, PhysBodyHandle};

//=== Dispatch ============================================================

/// Runs both dispatch passes for the step that just completed.
pub(crate) fn dispatch_contacts(
    bodies: &HashMap<PhysBodyHandle, PhysBody>,
    colliders: &ColliderSet,
    narrow_phase: &NarrowPhase,
    collision_events: &Receiver<CollisionEvent>,
) {
    //--- Pass 1: native begin contacts ------------------------------------
    while let Ok(event) = collision_events.try_recv() {
        if !event.started() || event.sensor() {
            continue;
        }

        let Some(first) = body_key(colliders, event.collider1()) else {
            continue;
        };
        let Some(second) = body_key(colliders, event.collider2()) else {
            continue;
        };

        notify(bodies, first, second);
        notify(bodies, second, first);
    }

    //--- Pass 2: synthesized sensor overlaps ------------------------------
    for (h1, h2, intersecting) in narrow_phase.intersection_pairs() {
        if !intersecting {
            continue;
        }

        let (Some(c1), Some(c2)) = (colliders.get(h1), colliders.get(h2)) else {
            continue;
        };
        let Some(first) = PhysBodyHandle::from_user_data(c1.user_data) else {
            continue;
        };
        let Some(second) = PhysBodyHandle::from_user_data(c2.user_data) else {
            continue;
        };

        // Pair ordering is arbitrary, so find the sensor side; exactly
        // one side is notified per touching pair per walk.
        if c1.is_sensor() {
            notify(bodies, first, second);
        } else if c2.is_sensor() {
            notify(bodies, second, first);
        }
    }
}

//--- Internal Helpers ----------------------------------------------------

fn body_key(colliders: &ColliderSet, handle: ColliderHandle) -> Option<PhysBodyHandle> {
    PhysBodyHandle::from_user_data(colliders.get(handle)?.user_data)
}

/// Invokes `on_collision` on `me`'s listener, if it is set and alive.
fn notify(bodies: &HashMap<PhysBodyHandle, PhysBody>, me: PhysBodyHandle, other: PhysBodyHandle) {
    let (Some(me_body), Some(other_body)) = (bodies.get(&me), bodies.get(&other)) else {
        return;
    };

    if let Some(listener) = me_body.listener() {
        listener.borrow_mut().on_collision(me_body, other_body);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
//
// Dispatch is exercised end-to-end (factory → step → callbacks) because
// the interesting behavior lives in how the simulator feeds the two
// passes, not in the pair bookkeeping alone.
//
//=========================================================================
