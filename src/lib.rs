//=========================================================================
// Voltaic Engine — Library Root
//
// This crate defines the public API surface of the Voltaic Engine, a
// fixed-timestep pinball engine: a module lifecycle driver, a 2D
// rigid-body integration layer, and the board gameplay built on top.
//
// Responsibilities:
// - Expose the engine entry point (`Engine` / `EngineBuilder`)
// - Keep OS integration (`platform`) hidden from end users
// - Provide clean separation between the high-level engine facade
//   and the subsystem modules in `core`
//
// Typical usage:
// ```no_run
// use voltaic_engine::EngineBuilder;
//
// fn main() {
//     EngineBuilder::new().build().run().unwrap();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the lifecycle driver and every engine subsystem
// (input, physics, rendering queue, gameplay entities). It is exposed
// publicly for engine-level extensibility, but normal application code
// will mostly use the top-level `Engine` facade.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `platform` contains OS-specific logic (window, Winit integration,
// event loop) and is kept private, as it is not part of the public API
// surface.
//
// `engine` defines the main engine entry point and builder.
//
mod engine;
mod platform;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the engine entry points so users can simply
// `use voltaic_engine::EngineBuilder;` without knowing the internal
// module structure.
//
pub use engine::{Engine, EngineBuilder, EngineError};
