//! Integration tests for config-driven contexts, render gathering and scene blocks.

use std::cell::Cell;
use std::rc::Rc;

use tessera::core::serialization::{
    deserialize_entity_id_from_data_block, serialize_entity_id_to_data_block,
};
use tessera::core::{Component, Entity, EntitySerializationMap, HandlerOptions, UpdateEvent};
use tessera::{
    gather_render_units, sort_render_units, EngineConfig, EngineContext,
    Render3DDefaultPassGatherRenderUnitsEvent, RenderUnit, SystemDescriptor, SystemRegistry,
    TomlDataBlock,
};

const CONFIG: &str = r#"
default_world = "game"

[[worlds]]
name = "game"
tags = ["render"]
reserve_entities = 64

[[worlds]]
name = "loading"
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MeshRenderer {
    mesh: u32,
    material: u32,
    queue: i32,
    position: [f32; 3],
}
impl Component for MeshRenderer {
    const CAPABILITIES: &'static [&'static str] = &["renderable"];
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transform;
impl Component for Transform {}

fn engine_systems(ticks: Rc<Cell<u32>>) -> SystemRegistry {
    let mut systems = SystemRegistry::new();
    systems
        .register(SystemDescriptor::for_entities::<
            Render3DDefaultPassGatherRenderUnitsEvent,
            (MeshRenderer,),
            _,
        >(
            "mesh-renderer-gather",
            |world, id, event| {
                if let Some(renderer) = world.component::<MeshRenderer>(id) {
                    event.units.push(RenderUnit::new(
                        id,
                        renderer.mesh,
                        renderer.material,
                        renderer.queue,
                        renderer.position,
                    ));
                }
            },
            HandlerOptions::new().with_tag("render"),
        ))
        .register(SystemDescriptor::global::<UpdateEvent, _>(
            "tick",
            move |_, _| ticks.set(ticks.get() + 1),
            HandlerOptions::new(),
        ));
    systems
}

#[test]
fn test_context_from_config_attaches_tagged_systems() {
    let ticks = Rc::new(Cell::new(0));
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let mut context = EngineContext::from_config(&config, engine_systems(Rc::clone(&ticks))).unwrap();

    assert_eq!(context.world_names(), vec!["game", "loading"]);
    assert_eq!(context.world("game").unwrap().system_count(), 2);
    assert_eq!(context.world("loading").unwrap().system_count(), 1);

    context.update(0.016).unwrap();
    context.update(0.016).unwrap();
    assert_eq!(ticks.get(), 4);
}

#[test]
fn test_gather_and_sort_render_units() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let mut context =
        EngineContext::from_config(&config, engine_systems(Rc::new(Cell::new(0)))).unwrap();
    let world = context.default_world_mut().unwrap();

    let far = world
        .add_entity(Entity::new().with_component(MeshRenderer {
            mesh: 1,
            material: 1,
            queue: 2000,
            position: [0.0, 0.0, 20.0],
        }))
        .unwrap();
    let near = world
        .add_entity(Entity::new().with_component(MeshRenderer {
            mesh: 2,
            material: 1,
            queue: 2000,
            position: [0.0, 0.0, 2.0],
        }))
        .unwrap();
    world
        .add_entity(Entity::new().with_component(Transform))
        .unwrap();

    let mut units = gather_render_units(world);
    assert_eq!(units.len(), 2);

    sort_render_units(&mut units, [0.0; 3]);
    assert_eq!(units[0].entity, near);
    assert_eq!(units[1].entity, far);

    world.set_entity_active(near, false);
    let units = gather_render_units(world);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].entity, far);
}

#[test]
fn test_entity_references_survive_save_and_load() {
    let mut context = EngineContext::default();
    let source = context.create_world::<&str>("save", false, &[]).unwrap();
    let parent = source.create_entity().unwrap();
    let child = source.create_entity().unwrap();

    let mut save_map = EntitySerializationMap::new();
    let mut block = TomlDataBlock::new();
    serialize_entity_id_to_data_block(&mut save_map, parent, &mut block, "parent").unwrap();
    serialize_entity_id_to_data_block(&mut save_map, child, &mut block, "child").unwrap();
    let saved_parent = save_map.serial_id(parent).unwrap();
    let saved_child = save_map.serial_id(child).unwrap();
    let text = block.into_table().to_string();

    let target = context.create_world::<&str>("load", false, &[]).unwrap();
    let loaded_child = target.create_entity().unwrap();
    let loaded_parent = target.create_entity().unwrap();
    let mut load_map = EntitySerializationMap::new();
    load_map.bind(saved_parent, loaded_parent);
    load_map.bind(saved_child, loaded_child);

    let block = TomlDataBlock::parse(&text).unwrap();
    assert_eq!(
        deserialize_entity_id_from_data_block(&load_map, &block, "parent"),
        loaded_parent
    );
    assert_eq!(
        deserialize_entity_id_from_data_block(&load_map, &block, "child"),
        loaded_child
    );
    assert!(target.contains_entity(loaded_parent));
}
