//=========================================================================
// Body / Shape / Joint Factory
//=========================================================================
//
// Constructs simulator bodies from pixel-space parameters. Every input
// is converted to simulator units on the way in; every query converts
// back on the way out (see `units`).
//
// Construction failures (unknown body kind, degenerate shapes, malformed
// point lists, stale handles) are logged and returned as `BuildError` —
// they never abort the frame. Callers must check the result.
//
// Joints take named config structs instead of positional property lists;
// field type mismatches surface as deserialization errors at the config
// boundary rather than as misread slots at build time.
//
//=========================================================================

//=== External Crates =====================================================

use glam::{IVec2, Vec2};
use log::error;
use rapier2d::prelude::{
    point, vector, ActiveEvents, ColliderBuilder, Group, ImpulseJointHandle, InteractionGroups,
    PrismaticJointBuilder, RevoluteJointBuilder, RigidBodyBuilder, Vector,
};
use serde::Deserialize;

//=== Internal Imports ====================================================

use super::body::{BodyKind, CollisionFilter, PhysBody, PhysBodyHandle};
use super::units::{pixels_to_meters, pixels_to_meters_f};
use super::Physics;

//=== BuildError ==========================================================

/// Recoverable construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Body kind parsed to `Unknown` (bad config string or caller bug).
    UnknownBodyKind,

    /// Convex hull computation failed (collinear or duplicate points).
    DegeneratePolygon,

    /// A digit run in a point list exceeded three digits.
    OversizedToken(String),

    /// Point list held a dangling x without a y.
    OddCoordinateCount(usize),

    /// Point list contained no coordinates at all.
    EmptyPointList,

    /// Shape needs at least three points.
    TooFewPoints(usize),

    /// A joint referenced a body handle that no longer resolves.
    MissingBody,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBodyKind => write!(f, "body kind is Unknown"),
            Self::DegeneratePolygon => write!(f, "polygon points do not form a convex hull"),
            Self::OversizedToken(t) => write!(f, "point token '{}' exceeds 3 digits", t),
            Self::OddCoordinateCount(n) => {
                write!(f, "point list has {} values (dangling x without y)", n)
            }
            Self::EmptyPointList => write!(f, "point list is empty"),
            Self::TooFewPoints(n) => write!(f, "shape needs at least 3 points, got {}", n),
            Self::MissingBody => write!(f, "joint references a destroyed body"),
        }
    }
}

impl std::error::Error for BuildError {}

//=== BodyProps ===========================================================

/// Optional per-body construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct BodyProps {
    pub restitution: f32,
    pub gravity_scale: f32,
    pub filter: CollisionFilter,
}

impl Default for BodyProps {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            gravity_scale: 1.0,
            filter: CollisionFilter::default(),
        }
    }
}

//=== Joint Configs =======================================================

/// Revolute joint parameters (flippers).
///
/// Angles are degrees; `motor_speed` is radians per second and
/// `max_torque` is the simulator's torque unit, both passed through
/// unscaled.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevoluteJointConfig {
    pub enable_limit: bool,
    pub min_angle: f32,
    pub max_angle: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_torque: f32,
}

impl Default for RevoluteJointConfig {
    fn default() -> Self {
        Self {
            enable_limit: false,
            min_angle: 0.0,
            max_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_torque: 0.0,
        }
    }
}

/// Prismatic joint parameters (plunger). The slide axis is vertical.
///
/// Translations and motor speed are pixels / pixels-per-second.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrismaticJointConfig {
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_force: f32,
}

impl Default for PrismaticJointConfig {
    fn default() -> Self {
        Self {
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_force: 0.0,
        }
    }
}

//=== Point List Parsing ==================================================

/// Parses the compact board-geometry encoding: runs of 1–3 ASCII digits,
/// any other characters acting as separators, interpreted pairwise as
/// x,y pixel coordinates.
///
/// Malformed input is rejected rather than clamped: a digit run longer
/// than three characters or a dangling x coordinate is an error, so
/// garbage never reaches the simulator.
pub fn parse_point_list(text: &str) -> Result<Vec<i32>, BuildError> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        let token = &text[start..i];
        if token.len() > 3 {
            return Err(BuildError::OversizedToken(token.to_string()));
        }
        let value = token
            .parse::<i32>()
            .map_err(|_| BuildError::OversizedToken(token.to_string()))?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(BuildError::EmptyPointList);
    }
    if values.len() % 2 != 0 {
        return Err(BuildError::OddCoordinateCount(values.len()));
    }

    Ok(values)
}

//=== Factory =============================================================

impl Physics {
    //--- Shape Creation ---------------------------------------------------

    /// Dynamic/static/kinematic circle at pixel center (x, y).
    pub fn create_circle(
        &mut self,
        x: i32,
        y: i32,
        radius: i32,
        kind: BodyKind,
        props: BodyProps,
    ) -> Result<PhysBodyHandle, BuildError> {
        let body = body_builder(kind, "create_circle")?
            .translation(vector![pixels_to_meters(x), pixels_to_meters(y)])
            .gravity_scale(props.gravity_scale);

        let collider = ColliderBuilder::ball(pixels_to_meters(radius))
            .density(1.0)
            .restitution(props.restitution)
            .collision_groups(groups(props.filter))
            .active_events(ActiveEvents::COLLISION_EVENTS);

        Ok(self.register(body, collider, Vec2::splat(radius as f32)))
    }

    /// Axis-aligned solid rectangle, pixel center (x, y), full extents
    /// width × height.
    pub fn create_rectangle(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        kind: BodyKind,
        props: BodyProps,
    ) -> Result<PhysBodyHandle, BuildError> {
        let body = body_builder(kind, "create_rectangle")?
            .translation(vector![pixels_to_meters(x), pixels_to_meters(y)])
            .gravity_scale(props.gravity_scale);

        let collider = ColliderBuilder::cuboid(
            pixels_to_meters(width) * 0.5,
            pixels_to_meters(height) * 0.5,
        )
        .density(1.0)
        .restitution(props.restitution)
        .collision_groups(groups(props.filter))
        .active_events(ActiveEvents::COLLISION_EVENTS);

        Ok(self.register(body, collider, Vec2::new(width as f32 * 0.5, height as f32 * 0.5)))
    }

    /// Overlap-only rectangle: detects but never collides. Sensor
    /// contacts are dispatched from the intersection walk, not the
    /// begin-contact events, so no event flag is set here.
    pub fn create_rectangle_sensor(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        kind: BodyKind,
        props: BodyProps,
    ) -> Result<PhysBodyHandle, BuildError> {
        let body = body_builder(kind, "create_rectangle_sensor")?
            .translation(vector![pixels_to_meters(x), pixels_to_meters(y)]);

        let collider = ColliderBuilder::cuboid(
            pixels_to_meters(width) * 0.5,
            pixels_to_meters(height) * 0.5,
        )
        .density(1.0)
        .sensor(true)
        .collision_groups(groups(props.filter));

        Ok(self.register(body, collider, Vec2::new(width as f32 * 0.5, height as f32 * 0.5)))
    }

    /// Convex polygon from a flat pixel point list (x0 y0 x1 y1 ...)
    /// relative to the body origin, rotated by `angle_deg`.
    pub fn create_polygon(
        &mut self,
        x: i32,
        y: i32,
        points: &[i32],
        kind: BodyKind,
        angle_deg: i32,
        props: BodyProps,
    ) -> Result<PhysBodyHandle, BuildError> {
        let local_points = to_local_points(points)?;

        let body = body_builder(kind, "create_polygon")?
            .translation(vector![pixels_to_meters(x), pixels_to_meters(y)])
            .rotation((angle_deg as f32).to_radians())
            .gravity_scale(props.gravity_scale);

        let collider = ColliderBuilder::convex_hull(&local_points)
            .ok_or_else(|| {
                error!("create_polygon: points do not form a convex hull");
                BuildError::DegeneratePolygon
            })?
            .density(1.0)
            .restitution(props.restitution)
            .collision_groups(groups(props.filter))
            .active_events(ActiveEvents::COLLISION_EVENTS);

        Ok(self.register(body, collider, Vec2::ZERO))
    }

    /// Closed polyline loop from a flat pixel point list. The last point
    /// links back to the first.
    pub fn create_chain(
        &mut self,
        x: i32,
        y: i32,
        points: &[i32],
        kind: BodyKind,
        angle_deg: i32,
        props: BodyProps,
    ) -> Result<PhysBodyHandle, BuildError> {
        let local_points = to_local_points(points)?;

        let count = local_points.len() as u32;
        let loop_indices: Vec<[u32; 2]> = (0..count).map(|i| [i, (i + 1) % count]).collect();

        let body = body_builder(kind, "create_chain")?
            .translation(vector![pixels_to_meters(x), pixels_to_meters(y)])
            .rotation((angle_deg as f32).to_radians());

        let collider = ColliderBuilder::polyline(local_points, Some(loop_indices))
            .restitution(props.restitution)
            .collision_groups(groups(props.filter))
            .active_events(ActiveEvents::COLLISION_EVENTS);

        Ok(self.register(body, collider, Vec2::ZERO))
    }

    /// Chain loop from the compact textual encoding (see
    /// [`parse_point_list`]).
    pub fn create_chain_from_text(
        &mut self,
        x: i32,
        y: i32,
        xy: &str,
        kind: BodyKind,
        props: BodyProps,
    ) -> Result<PhysBodyHandle, BuildError> {
        let points = parse_point_list(xy).map_err(|e| {
            error!("create_chain_from_text: {}", e);
            e
        })?;
        self.create_chain(x, y, &points, kind, 0, props)
    }

    //--- Joint Creation ---------------------------------------------------

    /// Revolute joint pinning `body` to `anchor` at pixel-space local
    /// offsets. Connected bodies never collide with each other.
    pub fn create_revolute_joint(
        &mut self,
        anchor: PhysBodyHandle,
        body: PhysBodyHandle,
        anchor_offset: IVec2,
        body_offset: IVec2,
        config: &RevoluteJointConfig,
    ) -> Result<ImpulseJointHandle, BuildError> {
        let (anchor_body, target_body) = self.joint_pair(anchor, body)?;

        let mut joint = RevoluteJointBuilder::new()
            .local_anchor1(point![
                pixels_to_meters(anchor_offset.x),
                pixels_to_meters(anchor_offset.y)
            ])
            .local_anchor2(point![
                pixels_to_meters(body_offset.x),
                pixels_to_meters(body_offset.y)
            ])
            .contacts_enabled(false);

        if config.enable_limit {
            joint = joint.limits([config.min_angle.to_radians(), config.max_angle.to_radians()]);
        }
        if config.enable_motor {
            joint = joint
                .motor_velocity(config.motor_speed, 1.0)
                .motor_max_force(config.max_torque);
        }

        Ok(self.impulse_joints.insert(anchor_body, target_body, joint, true))
    }

    /// Prismatic joint sliding `body` vertically against `anchor`.
    pub fn create_prismatic_joint(
        &mut self,
        anchor: PhysBodyHandle,
        body: PhysBodyHandle,
        anchor_offset: IVec2,
        body_offset: IVec2,
        config: &PrismaticJointConfig,
    ) -> Result<ImpulseJointHandle, BuildError> {
        let (anchor_body, target_body) = self.joint_pair(anchor, body)?;

        let mut joint = PrismaticJointBuilder::new(Vector::y_axis())
            .local_anchor1(point![
                pixels_to_meters(anchor_offset.x),
                pixels_to_meters(anchor_offset.y)
            ])
            .local_anchor2(point![
                pixels_to_meters(body_offset.x),
                pixels_to_meters(body_offset.y)
            ])
            .contacts_enabled(false);

        if config.enable_limit {
            joint = joint.limits([
                pixels_to_meters_f(config.lower_translation),
                pixels_to_meters_f(config.upper_translation),
            ]);
        }
        if config.enable_motor {
            joint = joint
                .motor_velocity(pixels_to_meters_f(config.motor_speed), 1.0)
                .motor_max_force(config.max_force);
        }

        Ok(self.impulse_joints.insert(anchor_body, target_body, joint, true))
    }

    //--- Teardown ---------------------------------------------------------

    /// Removes the body, its collider, and any attached joints. The
    /// handle stops resolving; further queries return None.
    pub fn destroy_body(&mut self, handle: PhysBodyHandle) {
        if let Some(pb) = self.phys_bodies.remove(&handle) {
            self.bodies.remove(
                pb.body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    pub fn destroy_joint(&mut self, joint: ImpulseJointHandle) {
        self.impulse_joints.remove(joint, true);
    }

    //--- Internal Helpers -------------------------------------------------

    fn joint_pair(
        &self,
        anchor: PhysBodyHandle,
        body: PhysBodyHandle,
    ) -> Result<(rapier2d::prelude::RigidBodyHandle, rapier2d::prelude::RigidBodyHandle), BuildError>
    {
        let anchor_body = self
            .phys_bodies
            .get(&anchor)
            .map(|pb| pb.body)
            .ok_or_else(|| {
                error!("joint creation: anchor body no longer exists");
                BuildError::MissingBody
            })?;
        let target_body = self
            .phys_bodies
            .get(&body)
            .map(|pb| pb.body)
            .ok_or_else(|| {
                error!("joint creation: target body no longer exists");
                BuildError::MissingBody
            })?;
        Ok((anchor_body, target_body))
    }

    fn register(
        &mut self,
        body: RigidBodyBuilder,
        collider: ColliderBuilder,
        half_extents: Vec2,
    ) -> PhysBodyHandle {
        let key = PhysBodyHandle(self.next_key);
        self.next_key += 1;

        let body_handle = self.bodies.insert(body.user_data(key.to_user_data()).build());
        let collider_handle = self.colliders.insert_with_parent(
            collider.user_data(key.to_user_data()).build(),
            body_handle,
            &mut self.bodies,
        );

        self.phys_bodies
            .insert(key, PhysBody::new(body_handle, collider_handle, half_extents));
        key
    }
}

//=== Free Helpers ========================================================

fn body_builder(kind: BodyKind, operation: &str) -> Result<RigidBodyBuilder, BuildError> {
    match kind {
        BodyKind::Dynamic => Ok(RigidBodyBuilder::dynamic()),
        BodyKind::Static => Ok(RigidBodyBuilder::fixed()),
        BodyKind::Kinematic => Ok(RigidBodyBuilder::kinematic_velocity_based()),
        BodyKind::Unknown => {
            error!("{} received Unknown body kind", operation);
            Err(BuildError::UnknownBodyKind)
        }
    }
}

fn groups(filter: CollisionFilter) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(filter.category),
        Group::from_bits_truncate(filter.mask),
    )
}

/// Flat pixel pairs → local-space simulator points. Needs at least
/// three pairs to describe an area or loop.
fn to_local_points(
    points: &[i32],
) -> Result<Vec<rapier2d::prelude::Point<f32>>, BuildError> {
    if points.len() % 2 != 0 {
        return Err(BuildError::OddCoordinateCount(points.len()));
    }
    if points.len() < 6 {
        return Err(BuildError::TooFewPoints(points.len() / 2));
    }

    Ok(points
        .chunks_exact(2)
        .map(|pair| point![pixels_to_meters(pair[0]), pixels_to_meters(pair[1])])
        .collect())
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::super::tests::physics_harness;
    use super::*;
    use serde_json::json;

    //--- Point List Parsing -----------------------------------------------

    #[test]
    fn parse_accepts_mixed_separators() {
        let points = parse_point_list("10 20,300 4;55\n6").unwrap();
        assert_eq!(points, vec![10, 20, 300, 4, 55, 6]);
    }

    #[test]
    fn parse_rejects_oversized_tokens() {
        assert_eq!(
            parse_point_list("10 1234"),
            Err(BuildError::OversizedToken("1234".into()))
        );
    }

    #[test]
    fn parse_rejects_dangling_coordinate() {
        assert_eq!(
            parse_point_list("10 20 30"),
            Err(BuildError::OddCoordinateCount(3))
        );
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert_eq!(parse_point_list("no digits here"), Err(BuildError::EmptyPointList));
        assert_eq!(parse_point_list(""), Err(BuildError::EmptyPointList));
    }

    //--- Body Construction ------------------------------------------------

    #[test]
    fn unknown_body_kind_creates_nothing() {
        let mut physics = physics_harness();

        let result =
            physics.create_circle(10, 10, 5, BodyKind::Unknown, BodyProps::default());

        assert_eq!(result.unwrap_err(), BuildError::UnknownBodyKind);
        assert_eq!(physics.body_count(), 0);
        assert_eq!(physics.sim_body_count(), 0);
    }

    #[test]
    fn unknown_kind_is_rejected_for_every_shape() {
        let mut physics = physics_harness();
        let props = BodyProps::default();
        let pts = [0, 0, 10, 0, 10, 10];

        assert!(physics.create_rectangle(0, 0, 10, 10, BodyKind::Unknown, props).is_err());
        assert!(physics
            .create_rectangle_sensor(0, 0, 10, 10, BodyKind::Unknown, props)
            .is_err());
        assert!(physics.create_polygon(0, 0, &pts, BodyKind::Unknown, 0, props).is_err());
        assert!(physics.create_chain(0, 0, &pts, BodyKind::Unknown, 0, props).is_err());
        assert_eq!(physics.sim_body_count(), 0);
    }

    #[test]
    fn rectangle_stores_half_extents() {
        let mut physics = physics_harness();
        let block = physics
            .create_rectangle(50, 50, 40, 20, BodyKind::Static, BodyProps::default())
            .unwrap();

        let pb = physics.phys_body(block).unwrap();
        assert_eq!(pb.half_extents(), Vec2::new(20.0, 10.0));
    }

    #[test]
    fn sensor_collider_is_flagged_sensor() {
        let mut physics = physics_harness();
        let sensor = physics
            .create_rectangle_sensor(100, 100, 50, 50, BodyKind::Static, BodyProps::default())
            .unwrap();

        let pb = physics.phys_body(sensor).unwrap();
        let collider = physics.colliders.get(pb.collider).unwrap();
        assert!(collider.is_sensor());
    }

    #[test]
    fn chain_from_text_builds_a_loop() {
        let mut physics = physics_harness();
        let board = physics
            .create_chain_from_text(0, 0, "0 0 100 0 100 200 0 200", BodyKind::Static, BodyProps::default())
            .unwrap();

        assert!(physics.phys_body(board).is_some());
        assert_eq!(physics.sim_body_count(), 1);
    }

    #[test]
    fn chain_needs_three_points() {
        let mut physics = physics_harness();
        let result = physics.create_chain(0, 0, &[0, 0, 10, 10], BodyKind::Static, 0, BodyProps::default());
        assert_eq!(result.unwrap_err(), BuildError::TooFewPoints(2));
    }

    //--- Joint Construction -----------------------------------------------

    #[test]
    fn revolute_joint_requires_live_bodies() {
        let mut physics = physics_harness();
        let anchor = physics
            .create_circle(0, 0, 5, BodyKind::Static, BodyProps::default())
            .unwrap();
        let paddle = physics
            .create_rectangle(10, 0, 20, 5, BodyKind::Dynamic, BodyProps::default())
            .unwrap();

        physics.destroy_body(paddle);

        let result = physics.create_revolute_joint(
            anchor,
            paddle,
            IVec2::ZERO,
            IVec2::new(8, 13),
            &RevoluteJointConfig::default(),
        );
        assert_eq!(result.unwrap_err(), BuildError::MissingBody);
    }

    #[test]
    fn revolute_joint_builds_with_limits_and_motor() {
        let mut physics = physics_harness();
        let anchor = physics
            .create_circle(0, 0, 5, BodyKind::Static, BodyProps::default())
            .unwrap();
        let paddle = physics
            .create_rectangle(10, 0, 20, 5, BodyKind::Dynamic, BodyProps::default())
            .unwrap();

        let config = RevoluteJointConfig {
            enable_limit: true,
            min_angle: -30.0,
            max_angle: 30.0,
            enable_motor: true,
            motor_speed: 10.0,
            max_torque: 300.0,
        };

        let joint = physics
            .create_revolute_joint(anchor, paddle, IVec2::ZERO, IVec2::new(8, 13), &config)
            .unwrap();

        assert!(physics.impulse_joints.get(joint).is_some());
    }

    #[test]
    fn destroyed_body_stops_resolving() {
        let mut physics = physics_harness();
        let ball = physics
            .create_circle(10, 10, 5, BodyKind::Dynamic, BodyProps::default())
            .unwrap();

        assert!(physics.position(ball).is_some());
        physics.destroy_body(ball);
        assert!(physics.position(ball).is_none());
        assert_eq!(physics.sim_body_count(), 0);
    }

    //--- Config Deserialization -------------------------------------------

    #[test]
    fn joint_config_rejects_wrong_types_and_unknown_fields() {
        let wrong_type = serde_json::from_value::<RevoluteJointConfig>(
            json!({ "enable_limit": "yes" }),
        );
        assert!(wrong_type.is_err());

        let unknown_field = serde_json::from_value::<RevoluteJointConfig>(
            json!({ "enable_limits": true }),
        );
        assert!(unknown_field.is_err());
    }

    #[test]
    fn joint_config_defaults_fill_missing_fields() {
        let config: RevoluteJointConfig =
            serde_json::from_value(json!({ "enable_motor": true, "motor_speed": 5.0 })).unwrap();
        assert!(config.enable_motor);
        assert!(!config.enable_limit);
        assert_eq!(config.motor_speed, 5.0);
    }
}
