//! # Render Gather Boundary
//!
//! The renderer owns no entity knowledge. Each frame it broadcasts
//! [`Render3DDefaultPassGatherRenderUnitsEvent`] and every renderer system
//! pushes the units it wants drawn.
//!
//! Draw order:
//! - Ascending render queue index
//! - Opaque queues near to far, transparent queues far to near

use std::cmp::Ordering;

use tessera_core::{EcsWorld, EntityId, Event};

/// Queue index at which units are drawn back to front.
pub const TRANSPARENT_QUEUE_INDEX: i32 = 3000;

/// One draw submission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderUnit {
    /// Entity the unit was gathered from.
    pub entity: EntityId,
    /// Backend mesh handle.
    pub mesh: u32,
    /// Backend material handle.
    pub material: u32,
    /// Render queue index of the material's pass.
    pub render_queue_index: i32,
    /// World-space position used for depth sorting.
    pub world_position: [f32; 3],
    /// Filled in by [`sort_render_units`].
    pub sqr_distance_to_camera: f32,
}

impl RenderUnit {
    /// A unit with no distance computed yet.
    #[must_use]
    pub fn new(
        entity: EntityId,
        mesh: u32,
        material: u32,
        render_queue_index: i32,
        world_position: [f32; 3],
    ) -> Self {
        Self {
            entity,
            mesh,
            material,
            render_queue_index,
            world_position,
            sqr_distance_to_camera: 0.0,
        }
    }
}

/// Broadcast by [`gather_render_units`]. Handlers append to `units`.
#[derive(Debug, Default)]
pub struct Render3DDefaultPassGatherRenderUnitsEvent {
    /// Units gathered so far.
    pub units: Vec<RenderUnit>,
}

impl Event for Render3DDefaultPassGatherRenderUnitsEvent {}

/// Collects the render units of every renderer system in `world`.
///
/// The event is delivered immediately; units come back in handler order.
#[must_use]
pub fn gather_render_units(world: &mut EcsWorld) -> Vec<RenderUnit> {
    let mut event = Render3DDefaultPassGatherRenderUnitsEvent::default();
    world.broadcast_event_immediate(&mut event);
    tracing::trace!(world = %world.name(), units = event.units.len(), "render units gathered");
    event.units
}

/// Computes camera distances and sorts `units` into draw order.
pub fn sort_render_units(units: &mut [RenderUnit], camera_position: [f32; 3]) {
    for unit in units.iter_mut() {
        unit.sqr_distance_to_camera = unit
            .world_position
            .iter()
            .zip(camera_position)
            .map(|(p, c)| (p - c) * (p - c))
            .sum();
    }
    units.sort_by(draw_order);
}

fn draw_order(a: &RenderUnit, b: &RenderUnit) -> Ordering {
    a.render_queue_index
        .cmp(&b.render_queue_index)
        .then_with(|| {
            if a.render_queue_index < TRANSPARENT_QUEUE_INDEX {
                a.sqr_distance_to_camera.total_cmp(&b.sqr_distance_to_camera)
            } else {
                b.sqr_distance_to_camera.total_cmp(&a.sqr_distance_to_camera)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(queue: i32, z: f32) -> RenderUnit {
        RenderUnit::new(EntityId::NULL, 0, 0, queue, [0.0, 0.0, z])
    }

    #[test]
    fn test_opaque_near_first_transparent_far_first() {
        let mut units = vec![
            unit(TRANSPARENT_QUEUE_INDEX, 1.0),
            unit(2000, 10.0),
            unit(TRANSPARENT_QUEUE_INDEX, 5.0),
            unit(2000, 2.0),
        ];
        sort_render_units(&mut units, [0.0; 3]);

        let order: Vec<(i32, f32)> = units
            .iter()
            .map(|u| (u.render_queue_index, u.world_position[2]))
            .collect();
        assert_eq!(
            order,
            vec![
                (2000, 2.0),
                (2000, 10.0),
                (TRANSPARENT_QUEUE_INDEX, 5.0),
                (TRANSPARENT_QUEUE_INDEX, 1.0),
            ]
        );
        assert!((units[0].sqr_distance_to_camera - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_gather_on_empty_world() {
        let mut world = EcsWorld::new("empty").unwrap();
        assert!(gather_render_units(&mut world).is_empty());
    }
}
