//! Headless demo: crates falling onto a floor through a trigger volume

use gaia::prelude::*;
use std::collections::HashMap;
use tracing::info;

/// What a scene object does when it is touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Prop,
    /// Removes its own body on the first solid hit
    Fragile,
}

struct SceneObject {
    name: &'static str,
    transform: Transform,
    behaviour: Behaviour,
}

impl SceneObject {
    fn new(name: &'static str, position: Vector3) -> Self {
        Self {
            name,
            transform: Transform::from_position(position),
            behaviour: Behaviour::Prop,
        }
    }
}

impl GameObject for SceneObject {
    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn transform_mut(&mut self) -> Option<&mut Transform> {
        Some(&mut self.transform)
    }

    fn on_collision_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        info!(object = self.name, ?other, "collision enter");
        if self.behaviour == Behaviour::Fragile {
            let this = ctx.this_body();
            ctx.destroy_body(this);
            info!(object = self.name, "shattered");
        }
    }

    fn on_collision_exit(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        info!(object = self.name, ?other, "collision exit");
    }

    fn on_trigger_enter(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        info!(object = self.name, zone = ?other, "entered trigger zone");
    }

    fn on_trigger_exit(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        info!(object = self.name, zone = ?other, "left trigger zone");
    }

    fn on_object_enter(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        info!(zone = self.name, ?other, "zone noticed an object");
    }
}

fn spawn(
    world: &mut CollisionWorld,
    scene: &mut HashMap<EntityId, SceneObject>,
    id: u64,
    object: SceneObject,
    properties: &[(&str, &str)],
) -> Option<BodyId> {
    let owner = EntityId(id);
    let desc = RigidBodyDesc::from_properties(properties.iter().copied());
    let body = world.spawn(owner, &object.transform, &desc);
    scene.insert(owner, object);
    body
}

fn main() -> Result<(), PhysicsError> {
    gaia::init_logging();
    info!("Starting headless physics demo");

    let mut world = CollisionWorld::new(PhysicsConfig::default());
    world.init()?;

    let mut scene: HashMap<EntityId, SceneObject> = HashMap::new();
    spawn(
        &mut world,
        &mut scene,
        1,
        SceneObject::new("floor", Vector3::new(0.0, -0.5, 0.0)),
        &[("mass", "0"), ("scale", "20 1 20"), ("friction", "0.8")],
    );
    spawn(
        &mut world,
        &mut scene,
        2,
        SceneObject::new("checkpoint", Vector3::new(0.0, 3.0, 0.0)),
        &[("mass", "0"), ("scale", "6 1 6"), ("trigger", "1")],
    );
    for (i, x) in [-1.5, 0.0, 1.5].into_iter().enumerate() {
        spawn(
            &mut world,
            &mut scene,
            10 + i as u64,
            SceneObject::new("crate", Vector3::new(x, 6.0 + i as f64, 0.0)),
            &[("mass", "2"), ("friction", "0.8"), ("angularDamping", "0.1")],
        );
    }
    let mut vase = SceneObject::new("vase", Vector3::new(4.0, 5.0, 0.0));
    vase.behaviour = Behaviour::Fragile;
    spawn(
        &mut world,
        &mut scene,
        20,
        vase,
        &[("shape", "Cylinder"), ("mass", "0.5"), ("scale", "0.5 1 0.5")],
    );

    // Five seconds of frames at a slightly uneven rate
    let frames = [1.0 / 60.0, 1.0 / 55.0, 1.0 / 65.0];
    for dt in frames.iter().cycle().take(300) {
        world.update(*dt, &mut scene);
        world.post_update(&mut scene);
    }

    let mut ids: Vec<_> = scene.keys().copied().collect();
    ids.sort();
    for id in ids {
        let object = &scene[&id];
        info!(object = object.name, position = %object.transform.position, "final position");
    }

    if let Some(hit) = world.raycast(
        Vector3::new(0.0, 20.0, 0.0),
        Vector3::new(0.0, -20.0, 0.0),
        layers::ALL,
    ) {
        info!(owner = ?hit.owner, distance = hit.distance, "ray from above hit");
    }
    info!(bodies = world.body_count(), contacts = world.contact_pairs().len(), "Demo finished");

    world.close();
    Ok(())
}
