//! Ray and segment queries

use gaia::prelude::*;

fn running_world() -> CollisionWorld {
    let mut world = CollisionWorld::new(PhysicsConfig::default());
    world.init().expect("world should start");
    world
}

fn wall(world: &mut CollisionWorld, owner: u64, x: f64, properties: &[(&str, &str)]) -> BodyId {
    let mut block = vec![("mass", "0"), ("scale", "1 4 4")];
    block.extend_from_slice(properties);
    world
        .spawn(
            EntityId(owner),
            &Transform::from_position(Vector3::new(x, 0.0, 0.0)),
            &RigidBodyDesc::from_properties(block),
        )
        .unwrap()
}

#[test]
fn test_empty_world_has_no_hits() {
    let world = running_world();
    let from = Vector3::ZERO;
    let to = Vector3::new(0.0, 0.0, 100.0);
    assert!(world.raycast(from, to, layers::ALL).is_none());
    assert!(!world.raycast_hit(from, to, layers::ALL));
    assert!(world.raycast_all(from, to, layers::ALL).is_empty());
}

#[test]
fn test_closed_world_has_no_hits() {
    let mut world = running_world();
    wall(&mut world, 1, 5.0, &[]);
    world.close();
    assert!(world
        .raycast(Vector3::ZERO, Vector3::new(10.0, 0.0, 0.0), layers::ALL)
        .is_none());
}

#[test]
fn test_all_hits_in_order() {
    let mut world = running_world();
    let far = wall(&mut world, 1, 9.0, &[]);
    let near = wall(&mut world, 2, 3.0, &[]);
    let middle = wall(&mut world, 3, 6.0, &[]);

    let hits = world.raycast_all(Vector3::ZERO, Vector3::new(20.0, 0.0, 0.0), layers::ALL);
    let bodies: Vec<BodyId> = hits.iter().map(|hit| hit.body).collect();
    assert_eq!(bodies, vec![near, middle, far]);

    let first = hits[0];
    assert_eq!(first.owner, EntityId(2));
    assert!((first.distance - 2.5).abs() < 1e-4, "got {}", first.distance);
    assert!((first.position - Vector3::new(2.5, 0.0, 0.0)).magnitude() < 1e-4);
    assert!((first.normal - Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-4);
}

#[test]
fn test_ignore_raycast_layer_is_always_skipped() {
    let mut world = running_world();
    wall(&mut world, 1, 3.0, &[("collisionGroup", "IgnoreRaycast")]);
    let visible = wall(&mut world, 2, 6.0, &[]);

    let hit = world
        .raycast(Vector3::ZERO, Vector3::new(10.0, 0.0, 0.0), layers::ALL)
        .expect("the second wall should be hit");
    assert_eq!(hit.body, visible);

    let only_ignored = world.raycast_all(
        Vector3::ZERO,
        Vector3::new(10.0, 0.0, 0.0),
        layers::IGNORE_RAYCAST,
    );
    assert!(only_ignored.is_empty());
}

#[test]
fn test_body_mask_must_accept_rays() {
    let mut world = running_world();
    wall(&mut world, 1, 3.0, &[("collidesWith", "None")]);
    assert!(!world.raycast_hit(Vector3::ZERO, Vector3::new(10.0, 0.0, 0.0), layers::ALL));
}

#[test]
fn test_direction_and_distance() {
    let mut world = running_world();
    let target = wall(&mut world, 1, 5.0, &[]);

    // Direction does not need to be normalized
    let hit = world
        .raycast_dir(Vector3::ZERO, Vector3::new(0.1, 0.0, 0.0), 10.0, layers::ALL)
        .unwrap();
    assert_eq!(hit.body, target);
    assert!((hit.distance - 4.5).abs() < 1e-4);

    assert!(world
        .raycast_dir(Vector3::ZERO, Vector3::RIGHT, 4.0, layers::ALL)
        .is_none());
    assert!(world
        .raycast_dir(Vector3::ZERO, Vector3::RIGHT, 0.0, layers::ALL)
        .is_none());
    assert!(world
        .raycast_all_dir(Vector3::ZERO, Vector3::RIGHT, -3.0, layers::ALL)
        .is_empty());
}

#[test]
fn test_every_shape_can_be_hit() {
    let mut world = running_world();
    for (i, shape) in ["Box", "Sphere", "Capsule", "Cylinder", "Cone"].iter().enumerate() {
        let x = i as f64 * 10.0;
        let id = world
            .spawn(
                EntityId(i as u64),
                &Transform::from_position(Vector3::new(x, 0.0, 0.0)),
                &RigidBodyDesc::from_properties([("shape", *shape), ("mass", "0")]),
            )
            .unwrap();

        // Straight down, slightly off the axis so the cone apex is not hit
        let hit = world
            .raycast(
                Vector3::new(x + 0.1, 10.0, 0.0),
                Vector3::new(x + 0.1, -10.0, 0.0),
                layers::ALL,
            )
            .unwrap_or_else(|| panic!("{shape} was not hit"));
        assert_eq!(hit.body, id);
        assert!(hit.normal.y > 0.4, "{shape} normal {}", hit.normal);
        assert!(
            hit.position.y > 0.0 && hit.position.y <= 1.0 + 1e-4,
            "{shape} hit at {}",
            hit.position
        );
    }
}

#[test]
fn test_ray_hits_mesh_from_both_sides() {
    let mut world = running_world();
    let vertices = [
        Vector3::new(-1.0, 0.0, -1.0),
        Vector3::new(1.0, 0.0, -1.0),
        Vector3::new(1.0, 0.0, 1.0),
        Vector3::new(-1.0, 0.0, 1.0),
    ];
    let mesh = TriangleMesh::from_indexed(&vertices, &[[0, 2, 1], [0, 3, 2]]);
    let transform = Transform::from_position(Vector3::new(0.0, 1.0, 0.0))
        .with_scale(Vector3::new(3.0, 1.0, 3.0));
    let ground = world
        .configure_mesh(
            EntityId(1),
            &transform,
            std::sync::Arc::new(mesh),
            layers::DEFAULT,
            layers::ALL,
        )
        .unwrap();

    let hit = world
        .raycast(Vector3::new(2.0, 5.0, 0.5), Vector3::new(2.0, -5.0, 0.5), layers::ALL)
        .expect("scaled mesh covers x = 2");
    assert_eq!(hit.body, ground);
    assert!((hit.distance - 4.0).abs() < 1e-4, "got {}", hit.distance);
    assert!((hit.normal - Vector3::new(0.0, 1.0, 0.0)).magnitude() < 1e-4);

    let below = world
        .raycast(Vector3::new(0.0, -3.0, 0.0), Vector3::new(0.0, 3.0, 0.0), layers::ALL)
        .expect("meshes are hit from underneath too");
    assert!((below.normal - Vector3::new(0.0, -1.0, 0.0)).magnitude() < 1e-4);

    assert!(world
        .raycast(Vector3::new(4.0, 5.0, 0.0), Vector3::new(4.0, -5.0, 0.0), layers::ALL)
        .is_none());
}
