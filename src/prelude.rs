//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use voltaic_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder, EngineError};

// Lifecycle contract
pub use crate::core::app::{App, AppSignals, TickControl};
pub use crate::core::module::{Module, ModuleError};

// Input
pub use crate::core::input::{Input, InputEvent, KeyCode, KeyState, Modifiers, MouseButton};

// Physics integration layer
pub use crate::core::physics::{
    layers, BodyKind, BodyProps, BuildError, ColliderCategory, CollisionFilter,
    CollisionListener, PhysBody, PhysBodyHandle, Physics, PrismaticJointConfig,
    RevoluteJointConfig, SensorRole,
};

// External collaborator contracts
pub use crate::core::audio::{AudioSink, NullAudio};
pub use crate::core::render::{Color, DrawCommand, NullSink, RenderSink};
pub use crate::core::textures::{AssetCatalog, NullCatalog, TextureHandle, TextureInfo};
