//=========================================================================
// Physics Module
//=========================================================================
//
// Integration layer over the rapier2d rigid-body simulator.
//
// Responsibilities:
// - Fixed-timestep stepping (1/60s, fixed solver iterations) with a
//   Running ⇄ SingleStep-Paused debug state machine
// - Body/shape/joint construction from pixel-space parameters (factory)
// - Contact dispatch: native begin-contacts to both listeners, synthesized
//   sensor overlaps to the sensor-side listener only (dispatch)
// - Debug draw of live shapes and the mouse-drag tool (debug_draw)
//
// The simulator world is mutated only inside this module's own phases:
// pre_update steps it, post_update reads it for debug draw and mutates
// the drag joint. Other modules interact exclusively through PhysBody
// handles created by the factory.
//
// Debug bindings (all edges, debug-only affordances):
//   N      toggle Running / SingleStep-Paused
//   B      advance one step while paused
//   F1     toggle debug draw
//   F2     toggle drawing other shapes while dragging
//   1-9,0  retarget gravity magnitude (Ctrl negates, Shift doubles,
//          Alt steers the X axis instead of Y)
//
//=========================================================================

//=== Submodules ==========================================================

pub mod body;
mod debug_draw;
mod dispatch;
pub mod factory;
pub mod units;

//=== Public API ==========================================================

pub use body::{
    layers, BodyKind, ColliderCategory, CollisionFilter, CollisionListener, PhysBody,
    PhysBodyHandle, SensorRole,
};
pub use factory::{parse_point_list, BodyProps, BuildError, PrismaticJointConfig, RevoluteJointConfig};
pub use rapier2d::prelude::ImpulseJointHandle;

//=== Standard Library Imports ============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::{Rc, Weak};

//=== External Crates =====================================================

use glam::{IVec2, Vec2};
use log::info;
use rapier2d::crossbeam::channel::Receiver as EventReceiver;
use rapier2d::parry::query::PointQuery;
use rapier2d::prelude::{
    point, vector, CCDSolver, ChannelEventCollector, ColliderSet, CollisionEvent,
    ContactForceEvent, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters, IslandManager,
    JointAxis, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryPipeline, Ray,
    RigidBodyHandle, RigidBodySet, Vector,
};
use serde::Deserialize;
use serde_json::Value;

//=== Internal Imports ====================================================

use crate::core::input::{Input, KeyCode};
use crate::core::module::{Module, ModuleError};
use crate::core::render::Render;
use units::{meters_to_pixels, pixels_to_meters, pixels_to_meters_f};

//=== Constants ===========================================================

/// Fixed simulation timestep, independent of render frame time.
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Solver iteration count pinned so simulation quality never depends on
/// frame rate or machine.
const SOLVER_ITERATIONS: usize = 6;

/// Default gravity in simulator units. The world uses screen-space
/// orientation (+y points down), so gravity is positive.
const DEFAULT_GRAVITY: (f32, f32) = (0.0, 10.0);

//=== Configuration =======================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct PhysicsConfig {
    gravity_x: f32,
    gravity_y: f32,
    debug: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_x: DEFAULT_GRAVITY.0,
            gravity_y: DEFAULT_GRAVITY.1,
            debug: false,
        }
    }
}

//=== StepMode ============================================================

/// Step controller state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Advance the simulator every pre_update.
    Running,

    /// Advance only on the explicit step-once input edge.
    SingleStepPaused,
}

//=== Physics =============================================================

/// Physics module: simulator world, factory, dispatcher, debug tools.
pub struct Physics {
    //--- Collaborators (injected) ----------------------------------------
    input: Rc<RefCell<Input>>,
    render: Rc<RefCell<Render>>,

    //--- Simulator World --------------------------------------------------
    pub(crate) gravity: Vector<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    //--- Contact Events ---------------------------------------------------
    event_collector: ChannelEventCollector,
    collision_recv: EventReceiver<CollisionEvent>,
    force_recv: EventReceiver<ContactForceEvent>,

    //--- Game-side Registry ----------------------------------------------
    pub(crate) phys_bodies: HashMap<PhysBodyHandle, PhysBody>,
    next_key: u64,

    //--- Step Controller --------------------------------------------------
    mode: StepMode,

    //--- Debug Draw / Drag ------------------------------------------------
    debug_draw: bool,
    draw_while_dragging: bool,
    pub(crate) drag_anchor: Option<RigidBodyHandle>,
    pub(crate) selected: Option<RigidBodyHandle>,
    pub(crate) drag_joint: Option<ImpulseJointHandle>,

    active: bool,
}

impl Physics {
    //--- Construction -----------------------------------------------------

    pub fn new(input: Rc<RefCell<Input>>, render: Rc<RefCell<Render>>) -> Self {
        let (collision_send, collision_recv) = rapier2d::crossbeam::channel::unbounded();
        let (force_send, force_recv) = rapier2d::crossbeam::channel::unbounded();

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = FIXED_TIMESTEP;
        if let Some(iterations) = NonZeroUsize::new(SOLVER_ITERATIONS) {
            integration_parameters.num_solver_iterations = iterations;
        }

        Self {
            input,
            render,
            gravity: vector![DEFAULT_GRAVITY.0, DEFAULT_GRAVITY.1],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: ChannelEventCollector::new(collision_send, force_send),
            collision_recv,
            force_recv,
            phys_bodies: HashMap::new(),
            next_key: 1,
            mode: StepMode::Running,
            debug_draw: false,
            draw_while_dragging: false,
            drag_anchor: None,
            selected: None,
            drag_joint: None,
            active: true,
        }
    }

    //--- Step Controller --------------------------------------------------

    pub fn step_mode(&self) -> StepMode {
        self.mode
    }

    /// Advances the simulator by exactly one fixed timestep.
    pub(crate) fn step_world(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );
    }

    /// Steps (honoring the pause state machine) and runs contact dispatch.
    /// Split out of `pre_update` so tests can drive frames without an
    /// input channel round trip.
    fn step_and_dispatch(&mut self, step_edge: bool) {
        if self.mode == StepMode::Running || step_edge {
            self.step_world();
            dispatch::dispatch_contacts(
                &self.phys_bodies,
                &self.colliders,
                &self.narrow_phase,
                &self.collision_recv,
            );
            // Force events are not subscribed to; keep the queue empty.
            while self.force_recv.try_recv().is_ok() {}
        }
    }

    /// Test/tooling hook: one unconditional step plus dispatch.
    pub fn step_once(&mut self) {
        self.step_world();
        dispatch::dispatch_contacts(
            &self.phys_bodies,
            &self.colliders,
            &self.narrow_phase,
            &self.collision_recv,
        );
        while self.force_recv.try_recv().is_ok() {}
    }

    //--- Debug Gravity ----------------------------------------------------

    /// Digit keys retarget gravity magnitude; modifier keys steer sign,
    /// axis, and doubling. Debug affordance only.
    fn retarget_gravity(&mut self, input: &Input) {
        let mut requested: Option<f32> = None;

        for (digit, key) in KeyCode::DIGITS.iter().enumerate() {
            if !input.is_key_pressed(*key) {
                continue;
            }
            if digit == 0 {
                requested = Some(0.0);
                break;
            }

            let mut magnitude = digit as f32;
            if input.modifiers().ctrl {
                magnitude = -magnitude;
            }
            if input.modifiers().shift {
                magnitude *= 2.0;
            }
            requested = Some(magnitude);
        }

        if let Some(magnitude) = requested {
            self.gravity = if input.modifiers().alt {
                vector![magnitude, self.gravity.y]
            } else {
                vector![self.gravity.x, magnitude]
            };
            info!("Gravity retargeted to ({}, {})", self.gravity.x, self.gravity.y);
        }
    }

    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    //--- Registry Access --------------------------------------------------

    pub fn phys_body(&self, handle: PhysBodyHandle) -> Option<&PhysBody> {
        self.phys_bodies.get(&handle)
    }

    pub fn body_count(&self) -> usize {
        self.phys_bodies.len()
    }

    /// Number of rigid bodies actually present in the simulator,
    /// including internal bodies like the drag anchor.
    pub fn sim_body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn set_category(&mut self, handle: PhysBodyHandle, category: ColliderCategory) {
        if let Some(pb) = self.phys_bodies.get_mut(&handle) {
            pb.category = category;
        }
    }

    pub fn set_sensor_role(&mut self, handle: PhysBodyHandle, role: SensorRole) {
        if let Some(pb) = self.phys_bodies.get_mut(&handle) {
            pb.sensor_role = Some(role);
        }
    }

    /// Wires the owning entity's collision listener. The physics side
    /// holds only a weak reference; the entity stays the owner.
    pub fn set_listener(
        &mut self,
        handle: PhysBodyHandle,
        listener: Weak<RefCell<dyn CollisionListener>>,
    ) {
        if let Some(pb) = self.phys_bodies.get_mut(&handle) {
            pb.listener = Some(listener);
        }
    }

    //--- Body Queries -----------------------------------------------------

    /// Top-left pixel corner of the body (center minus half extents),
    /// mirroring how sprites are positioned.
    pub fn position(&self, handle: PhysBodyHandle) -> Option<IVec2> {
        let pb = self.phys_bodies.get(&handle)?;
        let body = self.bodies.get(pb.body)?;
        let center = body.translation();
        Some(IVec2::new(
            meters_to_pixels(center.x) - pb.half_extents.x as i32,
            meters_to_pixels(center.y) - pb.half_extents.y as i32,
        ))
    }

    /// Body rotation in degrees.
    pub fn rotation_deg(&self, handle: PhysBodyHandle) -> Option<f32> {
        let pb = self.phys_bodies.get(&handle)?;
        let body = self.bodies.get(pb.body)?;
        Some(body.rotation().angle().to_degrees())
    }

    /// Point-in-shape test in pixel coordinates.
    pub fn contains(&self, handle: PhysBodyHandle, x: i32, y: i32) -> bool {
        let Some(pb) = self.phys_bodies.get(&handle) else {
            return false;
        };
        let Some(collider) = self.colliders.get(pb.collider) else {
            return false;
        };
        let point = point![pixels_to_meters(x), pixels_to_meters(y)];
        collider.shape().contains_point(collider.position(), &point)
    }

    /// Casts the pixel segment (x1,y1)→(x2,y2) against this body's shape.
    /// Returns the hit distance in pixels and the surface normal, or None.
    pub fn ray_cast(
        &self,
        handle: PhysBodyHandle,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    ) -> Option<(f32, Vec2)> {
        use rapier2d::parry::query::RayCast;

        let pb = self.phys_bodies.get(&handle)?;
        let collider = self.colliders.get(pb.collider)?;

        let origin = point![pixels_to_meters(x1), pixels_to_meters(y1)];
        let dir = vector![
            pixels_to_meters(x2) - origin.x,
            pixels_to_meters(y2) - origin.y
        ];
        let ray = Ray::new(origin, dir);

        let hit = collider
            .shape()
            .cast_ray_and_get_normal(collider.position(), &ray, 1.0, true)?;

        let segment_len =
            (((x2 - x1).pow(2) + (y2 - y1).pow(2)) as f32).sqrt();
        Some((
            hit.time_of_impact * segment_len,
            Vec2::new(hit.normal.x, hit.normal.y),
        ))
    }

    //--- Joint Motors -----------------------------------------------------

    /// Sets a revolute joint's motor target velocity (radians/second).
    pub fn set_angular_motor_velocity(
        &mut self,
        joint: ImpulseJointHandle,
        velocity: f32,
        factor: f32,
    ) {
        if let Some(j) = self.impulse_joints.get_mut(joint) {
            j.data.set_motor_velocity(JointAxis::AngX, velocity, factor);
        }
    }

    /// Sets a prismatic joint's motor target velocity (pixels/second).
    pub fn set_linear_motor_velocity(
        &mut self,
        joint: ImpulseJointHandle,
        velocity_px: f32,
        factor: f32,
    ) {
        if let Some(j) = self.impulse_joints.get_mut(joint) {
            j.data
                .set_motor_velocity(JointAxis::LinX, pixels_to_meters_f(velocity_px), factor);
        }
    }
}

//=== Module Implementation ===============================================

impl Module for Physics {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn awake(&mut self, config: &Value) -> Result<(), ModuleError> {
        let config: PhysicsConfig = match config {
            Value::Null => PhysicsConfig::default(),
            node => serde_json::from_value(node.clone())
                .map_err(|e| ModuleError::Config(format!("physics: {}", e)))?,
        };

        self.gravity = vector![config.gravity_x, config.gravity_y];
        self.debug_draw = config.debug;
        Ok(())
    }

    fn start(&mut self) -> Result<(), ModuleError> {
        info!("Creating physics 2D environment");
        self.create_drag_anchor();
        Ok(())
    }

    /// Steps the simulator and dispatches contacts. Runs before any
    /// gameplay module's update, so frame N's collisions are always
    /// visible to frame N's gameplay.
    fn pre_update(&mut self) -> Result<(), ModuleError> {
        let input = self.input.clone();
        let (step_edge, pause_edge) = {
            let input = input.borrow();
            self.retarget_gravity(&input);
            (
                input.is_key_pressed(KeyCode::KeyB),
                input.is_key_pressed(KeyCode::KeyN),
            )
        };

        self.step_and_dispatch(self.mode == StepMode::SingleStepPaused && step_edge);

        if pause_edge {
            self.mode = match self.mode {
                StepMode::Running => StepMode::SingleStepPaused,
                StepMode::SingleStepPaused => StepMode::Running,
            };
            info!("Physics step mode: {:?}", self.mode);
        }

        Ok(())
    }

    /// Debug draw and mouse drag. Only reads world state, except for the
    /// transient drag joint.
    fn post_update(&mut self) -> Result<(), ModuleError> {
        let (debug_edge, drag_draw_edge) = {
            let input = self.input.borrow();
            (
                input.is_key_pressed(KeyCode::F1),
                input.is_key_pressed(KeyCode::F2),
            )
        };

        if debug_edge {
            self.debug_draw = !self.debug_draw;
        }
        if drag_draw_edge {
            self.draw_while_dragging = !self.draw_while_dragging;
        }

        if !self.debug_draw {
            return Ok(());
        }

        self.draw_shapes_and_pick(self.draw_while_dragging);
        self.drag_selected_object();

        Ok(())
    }

    fn clean_up(&mut self) -> Result<(), ModuleError> {
        info!("Destroying physics world");
        self.phys_bodies.clear();
        self.drag_joint = None;
        self.selected = None;
        self.drag_anchor = None;
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
