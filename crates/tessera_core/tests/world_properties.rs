//! Integration tests for entity identity, sample consistency and event delivery.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tessera_core::{
    Component, EcsWorld, Entity, EntityAspect, EntityId, Event, HandlerOptions, SampleFlags,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct A(u32);
impl Component for A {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct B;
impl Component for B {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct C;
impl Component for C {}

struct Tick;
impl Event for Tick {}

fn members(ids: &[EntityId]) -> HashSet<EntityId> {
    ids.iter().copied().collect()
}

#[test]
fn test_scenario_inclusive_sample_tracks_adds_and_removes() {
    let mut world = EcsWorld::new("W").unwrap();

    let e1 = world.add_entity(Entity::new().with_component(A(1))).unwrap();
    let e2 = world.create_entity().unwrap();
    let e3 = world.add_entity(Entity::new().with_component(A(3))).unwrap();
    let e4 = world.create_entity().unwrap();
    let e5 = world.add_entity(Entity::new().with_component(A(5))).unwrap();
    assert_eq!(world.entities_count(), 5);
    assert!(world.contains_entity(e2) && world.contains_entity(e4));

    let sample = world.request_inclusive_sample::<(A,)>(SampleFlags::NONE);
    assert_eq!(members(&sample.entity_ids()), members(&[e1, e3, e5]));

    assert!(world.remove_entity(e3));
    assert_eq!(members(&sample.entity_ids()), members(&[e1, e5]));

    let e6 = world.add_entity(Entity::new().with_component(A(6))).unwrap();
    assert_eq!(members(&sample.entity_ids()), members(&[e1, e5, e6]));
}

#[test]
fn test_live_ids_never_collide() {
    let mut world = EcsWorld::new("ids").unwrap();
    let mut live: Vec<EntityId> = Vec::new();

    for round in 0..50u32 {
        live.push(world.create_entity().unwrap());
        live.push(world.create_entity().unwrap());
        if round % 3 == 0 {
            let victim = live.remove((round as usize * 7) % live.len());
            assert!(world.remove_entity(victim));
        }
        let unique: HashSet<EntityId> = live.iter().copied().collect();
        assert_eq!(unique.len(), live.len());
        assert_eq!(world.entities_count(), live.len());
    }
}

#[test]
fn test_freed_indices_are_reused_lifo() {
    let mut world = EcsWorld::new("lifo").unwrap();
    let ids: Vec<EntityId> = (0..4).map(|_| world.create_entity().unwrap()).collect();

    assert!(world.remove_entity(ids[1]));
    assert!(world.remove_entity(ids[3]));

    let first = world.create_entity().unwrap();
    let second = world.create_entity().unwrap();
    let third = world.create_entity().unwrap();

    assert_eq!(first.index(), ids[3].index());
    assert_eq!(second.index(), ids[1].index());
    assert_eq!(third.index(), 4);
}

#[test]
fn test_stale_id_does_not_reach_new_occupant() {
    let mut world = EcsWorld::new("stale").unwrap();
    let old = world.add_entity(Entity::new().with_component(A(1))).unwrap();
    assert!(world.remove_entity(old));

    let new = world.add_entity(Entity::new().with_component(A(2))).unwrap();
    assert_eq!(new.index(), old.index());

    assert!(world.component::<A>(old).is_none());
    assert!(!world.remove_entity(old));
    assert_eq!(world.component::<A>(new), Some(&A(2)));
}

#[test]
fn test_sample_caching_is_per_signature() {
    let mut world = EcsWorld::new("cache").unwrap();
    let ab = world.request_inclusive_sample::<(A, B)>(SampleFlags::NONE);
    let ab_again = world.request_inclusive_sample::<(A, B)>(SampleFlags::NONE);
    let ab_inactive = world.request_inclusive_sample::<(A, B)>(SampleFlags::INCLUDE_INACTIVE);
    let a = world.request_inclusive_sample::<(A,)>(SampleFlags::NONE);

    assert!(ab.ptr_eq(&ab_again));
    assert!(!ab.ptr_eq(&ab_inactive));
    assert!(!ab.ptr_eq(&a));
}

#[test]
fn test_sample_consistency_after_every_mutation() {
    let mut world = EcsWorld::new("consistency").unwrap();
    let a = world.component_registry_mut().register::<A>();
    let b = world.component_registry_mut().register::<B>();
    let c = world.component_registry_mut().register::<C>();

    let samples = [
        (
            EntityAspect::all_of([a, b]),
            world.request_sample(EntityAspect::all_of([a, b]), SampleFlags::NONE),
        ),
        (
            EntityAspect::any_of([b, c]),
            world.request_sample(EntityAspect::any_of([b, c]), SampleFlags::NONE),
        ),
        (
            EntityAspect::all_of([a]).with_none_of([c]),
            world.request_sample(EntityAspect::all_of([a]).with_none_of([c]), SampleFlags::NONE),
        ),
    ];

    let check = |world: &EcsWorld| {
        for (aspect, sample) in &samples {
            for id in world.entity_ids() {
                let mask = world.component_ids(id).into_iter().collect();
                assert_eq!(sample.contains(id), aspect.matches(&mask), "entity {id}");
            }
            assert!(sample.entity_ids().iter().all(|&id| world.contains_entity(id)));
        }
    };

    let x = world.add_entity(Entity::new().with_component(A(0))).unwrap();
    check(&world);
    let y = world.add_entity(Entity::new().with_component(B).with_component(C)).unwrap();
    check(&world);
    world.add_component(x, B).unwrap();
    check(&world);
    world.add_component(x, C).unwrap();
    check(&world);
    world.remove_component::<B>(y);
    check(&world);
    world.remove_entity(y);
    check(&world);
    world.remove_component::<C>(x);
    check(&world);
}

#[test]
fn test_sample_created_late_is_backfilled() {
    let mut world = EcsWorld::new("backfill").unwrap();
    let ids: Vec<EntityId> = (0..10)
        .map(|i| {
            let entity = if i % 2 == 0 {
                Entity::new().with_component(A(i))
            } else {
                Entity::new()
            };
            world.add_entity(entity).unwrap()
        })
        .collect();

    let sample = world.request_inclusive_sample::<(A,)>(SampleFlags::NONE);
    assert_eq!(sample.len(), 5);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(sample.contains(*id), i % 2 == 0);
    }
}

#[test]
fn test_registration_order_is_dispatch_order() {
    let mut world = EcsWorld::new("order").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    for name in ["h1", "h2", "h3"] {
        let sink = Rc::clone(&log);
        world
            .add_system_event_handler_global::<Tick>(
                name,
                move |_, _| sink.borrow_mut().push(name),
                HandlerOptions::new(),
            )
            .unwrap();
    }

    world.broadcast_event_immediate(&mut Tick);
    assert_eq!(*log.borrow(), vec!["h1", "h2", "h3"]);
}

#[test]
fn test_broadcast_reaches_each_member_once() {
    let mut world = EcsWorld::new("broadcast").unwrap();
    let visited = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&visited);
    world
        .add_system_event_handler::<Tick, (A,)>(
            "collect",
            move |world, id, _| {
                let value = world.component::<A>(id).map_or(0, |a| a.0);
                sink.borrow_mut().push(value);
            },
            HandlerOptions::new(),
        )
        .unwrap();

    for i in 0..4 {
        world.add_entity(Entity::new().with_component(A(i))).unwrap();
    }
    world.create_entity().unwrap();

    world.broadcast_event_immediate(&mut Tick);
    let mut seen = visited.borrow().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[test]
fn test_capability_queries() {
    struct MeshRenderer;
    impl Component for MeshRenderer {
        const CAPABILITIES: &'static [&'static str] = &["renderable"];
    }
    struct SpriteRenderer;
    impl Component for SpriteRenderer {
        const CAPABILITIES: &'static [&'static str] = &["renderable"];
    }

    let mut world = EcsWorld::new("caps").unwrap();
    let mesh = world.add_entity(Entity::new().with_component(MeshRenderer)).unwrap();
    let sprite = world.add_entity(Entity::new().with_component(SpriteRenderer)).unwrap();
    let plain = world.add_entity(Entity::new().with_component(B)).unwrap();

    let renderable = world.component_registry().ids_with_capability("renderable");
    assert_eq!(renderable.len(), 2);

    let sample = world.request_sample(EntityAspect::any_of(renderable), SampleFlags::NONE);
    assert!(sample.contains(mesh));
    assert!(sample.contains(sprite));
    assert!(!sample.contains(plain));
}
