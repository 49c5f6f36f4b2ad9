//=========================================================================
// Debug Draw & Mouse Drag
//=========================================================================
//
// PostUpdate-only debug tooling: outlines every live shape in a fixed
// per-shape color, and lets the developer grab a body with the mouse.
//
// Colors: circles white, polygons yellow, chain loops green, lone
// segments blue — one color per shape type so a glance tells what the
// simulator actually contains.
//
// Dragging: left-press hit-tests shapes under the cursor; the picked
// body is tied to a persistent kinematic anchor through a transient
// spring joint tuned like a Box2D mouse joint (frequency / damping
// ratio converted to stiffness / damping against the body's mass). The
// anchor chases the cursor while the button is held; release destroys
// the joint. One dragged body at a time. While dragging, other shapes
// are only drawn if the secondary toggle says so.
//
//=========================================================================

//=== External Crates =====================================================

use glam::Vec2;
use rapier2d::parry::query::PointQuery;
use rapier2d::parry::shape::TypedShape;
use rapier2d::prelude::{
    point, vector, Collider, Isometry, Point, RigidBodyBuilder, RigidBodyHandle,
    SpringJointBuilder, Vector,
};

//=== Internal Imports ====================================================

use super::units::{meters_to_pixels_f, pixels_to_meters_f};
use super::Physics;
use crate::core::input::{KeyState, MouseButton};
use crate::core::render::{Color, Render};

//=== Drag Tuning =========================================================

/// Box2D-style mouse joint response: k = m·(2πf)², c = 2·m·ζ·(2πf).
const DRAG_FREQUENCY_HZ: f32 = 2.0;
const DRAG_DAMPING_RATIO: f32 = 0.7;

//=== Shape Colors ========================================================

const CIRCLE_COLOR: Color = Color::WHITE;
const POLYGON_COLOR: Color = Color::YELLOW;
const CHAIN_COLOR: Color = Color::rgb(100, 255, 100);
const SEGMENT_COLOR: Color = Color::rgb(100, 100, 255);
const DRAG_LINE_COLOR: Color = Color::CYAN;

//=== Physics: Debug Draw / Drag ==========================================

impl Physics {
    /// Creates the persistent kinematic body the drag spring anchors to.
    pub(crate) fn create_drag_anchor(&mut self) {
        let anchor = RigidBodyBuilder::kinematic_position_based().build();
        self.drag_anchor = Some(self.bodies.insert(anchor));
    }

    /// Walks live colliders: picks on a fresh left-press, outlines the
    /// rest. Once something is selected and `draw_while_dragging` is
    /// off, drawing stops entirely (the drag line stays visible).
    pub(crate) fn draw_shapes_and_pick(&mut self, draw_while_dragging: bool) {
        let (mouse, pick_edge) = {
            let input = self.input.borrow();
            (
                input.mouse_position(),
                input.is_button_pressed(MouseButton::Left),
            )
        };
        let cursor = point![pixels_to_meters_f(mouse.0), pixels_to_meters_f(mouse.1)];

        let mut render = self.render.borrow_mut();
        let mut selected = self.selected;

        for (_handle, collider) in self.colliders.iter() {
            if selected.is_some() && !draw_while_dragging {
                break;
            }

            if pick_edge
                && selected.is_none()
                && collider.shape().contains_point(collider.position(), &cursor)
            {
                selected = collider.parent();
                continue;
            }

            draw_collider(&mut render, collider);
        }

        self.selected = selected;
    }

    /// Per-frame drag state machine, driven by the left button.
    pub(crate) fn drag_selected_object(&mut self) {
        let Some(selected) = self.selected else {
            return;
        };

        let (mouse, button) = {
            let input = self.input.borrow();
            (input.mouse_position(), input.button_state(MouseButton::Left))
        };
        let target = vector![pixels_to_meters_f(mouse.0), pixels_to_meters_f(mouse.1)];

        match button {
            KeyState::Pressed => self.create_drag_joint(selected, target),

            KeyState::Held => {
                if let Some(anchor) = self.drag_anchor {
                    if let Some(body) = self.bodies.get_mut(anchor) {
                        body.set_next_kinematic_translation(target);
                    }
                }

                if let Some(body) = self.bodies.get(selected) {
                    let center = body.translation();
                    self.render.borrow_mut().draw_line(
                        Vec2::new(mouse.0, mouse.1),
                        Vec2::new(meters_to_pixels_f(center.x), meters_to_pixels_f(center.y)),
                        DRAG_LINE_COLOR,
                    );
                }
            }

            KeyState::Released => self.release_drag(),

            KeyState::Idle => {}
        }
    }

    fn create_drag_joint(&mut self, selected: RigidBodyHandle, target: Vector<f32>) {
        let Some(anchor) = self.drag_anchor else {
            return;
        };

        if let Some(anchor_body) = self.bodies.get_mut(anchor) {
            anchor_body.set_translation(target, true);
            anchor_body.set_next_kinematic_translation(target);
        }

        let mass = self.bodies.get(selected).map(|b| b.mass()).unwrap_or(1.0).max(0.01);
        let omega = std::f32::consts::TAU * DRAG_FREQUENCY_HZ;
        let stiffness = mass * omega * omega;
        let damping = 2.0 * mass * DRAG_DAMPING_RATIO * omega;

        let joint = SpringJointBuilder::new(0.0, stiffness, damping);
        self.drag_joint = Some(self.impulse_joints.insert(anchor, selected, joint, true));
    }

    /// Destroys the transient drag joint and clears the selection.
    pub(crate) fn release_drag(&mut self) {
        if let Some(joint) = self.drag_joint.take() {
            self.impulse_joints.remove(joint, true);
        }
        self.selected = None;
    }
}

//=== Shape Outlines ======================================================

fn draw_collider(render: &mut Render, collider: &Collider) {
    let pos = collider.position();

    match collider.shape().as_typed_shape() {
        TypedShape::Ball(ball) => {
            render.draw_circle(
                world_px(pos, &Point::origin()),
                meters_to_pixels_f(ball.radius),
                CIRCLE_COLOR,
            );
        }

        TypedShape::Cuboid(cuboid) => {
            let he = cuboid.half_extents;
            let corners = [
                point![-he.x, -he.y],
                point![he.x, -he.y],
                point![he.x, he.y],
                point![-he.x, he.y],
            ];
            draw_loop(render, pos, &corners, POLYGON_COLOR);
        }

        TypedShape::ConvexPolygon(polygon) => {
            draw_loop(render, pos, polygon.points(), POLYGON_COLOR);
        }

        TypedShape::Polyline(polyline) => {
            for segment in polyline.segments() {
                render.draw_line(
                    world_px(pos, &segment.a),
                    world_px(pos, &segment.b),
                    CHAIN_COLOR,
                );
            }
        }

        TypedShape::Segment(segment) => {
            render.draw_line(
                world_px(pos, &segment.a),
                world_px(pos, &segment.b),
                SEGMENT_COLOR,
            );
        }

        _ => {}
    }
}

fn draw_loop(render: &mut Render, pos: &Isometry<f32>, points: &[Point<f32>], color: Color) {
    for i in 0..points.len() {
        let next = (i + 1) % points.len();
        render.draw_line(world_px(pos, &points[i]), world_px(pos, &points[next]), color);
    }
}

fn world_px(pos: &Isometry<f32>, local: &Point<f32>) -> Vec2 {
    let world = pos * local;
    Vec2::new(meters_to_pixels_f(world.x), meters_to_pixels_f(world.y))
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::super::body::BodyKind;
    use super::super::factory::BodyProps;
    use super::super::Physics;
    use crate::core::app::AppSignals;
    use crate::core::input::{Input, InputEvent, Modifiers, MouseButton as EngineMouseButton};
    use crate::core::module::Module;
    use crate::core::platform_bridge::PlatformEvent;
    use crate::core::render::{NullSink, Render};
    use crate::core::window::Window;
    use crossbeam_channel::Sender;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn drag_harness() -> (Physics, Rc<RefCell<Input>>, Sender<PlatformEvent>) {
        let signals = AppSignals::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = Rc::new(RefCell::new(Input::new(rx, signals)));
        let window = Rc::new(RefCell::new(Window::new()));
        let render = Rc::new(RefCell::new(Render::new(Box::new(NullSink), window)));
        let mut physics = Physics::new(input.clone(), render);
        physics.start().unwrap();
        (physics, input, tx)
    }

    fn pump(input: &Rc<RefCell<Input>>, tx: &Sender<PlatformEvent>, events: Vec<InputEvent>) {
        tx.send(PlatformEvent::Inputs { discrete: events, continuous: vec![] }).unwrap();
        input.borrow_mut().pre_update().unwrap();
    }

    #[test]
    fn debug_draw_outlines_every_shape_kind() {
        let (mut physics, input, tx) = drag_harness();

        physics
            .create_circle(100, 100, 10, BodyKind::Static, BodyProps::default())
            .unwrap();
        physics
            .create_rectangle(200, 100, 40, 20, BodyKind::Static, BodyProps::default())
            .unwrap();
        physics
            .create_chain(0, 0, &[0, 0, 50, 0, 50, 50], BodyKind::Static, 0, BodyProps::default())
            .unwrap();

        pump(&input, &tx, vec![]);
        physics.draw_shapes_and_pick(false);

        // 1 circle + 4 cuboid edges + 3 chain segments.
        let render = physics.render.borrow();
        assert_eq!(render.queued().len(), 8);
    }

    #[test]
    fn press_over_body_selects_and_creates_drag_joint() {
        let (mut physics, input, tx) = drag_harness();

        physics
            .create_circle(100, 100, 20, BodyKind::Dynamic, BodyProps::default())
            .unwrap();

        pump(
            &input,
            &tx,
            vec![
                InputEvent::MouseMoved { x: 100.0, y: 100.0 },
                InputEvent::MouseButtonDown {
                    button: EngineMouseButton::Left,
                    modifiers: Modifiers::NONE,
                },
            ],
        );

        physics.draw_shapes_and_pick(false);
        physics.drag_selected_object();

        assert!(physics.selected.is_some());
        assert!(physics.drag_joint.is_some());
    }

    #[test]
    fn release_destroys_joint_and_clears_selection() {
        let (mut physics, input, tx) = drag_harness();

        physics
            .create_circle(100, 100, 20, BodyKind::Dynamic, BodyProps::default())
            .unwrap();

        pump(
            &input,
            &tx,
            vec![
                InputEvent::MouseMoved { x: 100.0, y: 100.0 },
                InputEvent::MouseButtonDown {
                    button: EngineMouseButton::Left,
                    modifiers: Modifiers::NONE,
                },
            ],
        );
        physics.draw_shapes_and_pick(false);
        physics.drag_selected_object();

        pump(
            &input,
            &tx,
            vec![InputEvent::MouseButtonUp {
                button: EngineMouseButton::Left,
                modifiers: Modifiers::NONE,
            }],
        );
        physics.drag_selected_object();

        assert!(physics.selected.is_none());
        assert!(physics.drag_joint.is_none());
        assert_eq!(physics.impulse_joints.len(), 0);
    }

    #[test]
    fn press_over_empty_space_selects_nothing() {
        let (mut physics, input, tx) = drag_harness();

        physics
            .create_circle(100, 100, 20, BodyKind::Dynamic, BodyProps::default())
            .unwrap();

        pump(
            &input,
            &tx,
            vec![
                InputEvent::MouseMoved { x: 400.0, y: 400.0 },
                InputEvent::MouseButtonDown {
                    button: EngineMouseButton::Left,
                    modifiers: Modifiers::NONE,
                },
            ],
        );

        physics.draw_shapes_and_pick(false);
        physics.drag_selected_object();

        assert!(physics.selected.is_none());
        assert!(physics.drag_joint.is_none());
    }
}
