//! Enter/stay/exit event delivery from the collision world

use gaia::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(EntityId, &'static str, EntityId)>>>;

/// Game object that records every hook it receives
struct Recorder {
    id: EntityId,
    log: Log,
    active: bool,
    destroy_other_on_enter: bool,
    step_world_on_enter: bool,
}

impl Recorder {
    fn new(id: EntityId, log: &Log) -> Self {
        Self {
            id,
            log: log.clone(),
            active: true,
            destroy_other_on_enter: false,
            step_world_on_enter: false,
        }
    }

    fn record(&self, event: &'static str, other: EntityId) {
        self.log.borrow_mut().push((self.id, event, other));
    }
}

impl GameObject for Recorder {
    fn is_active(&self) -> bool {
        self.active
    }

    fn on_collision_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        self.record("collision_enter", other);
        if self.destroy_other_on_enter {
            let other_body = ctx.other_body();
            assert!(ctx.destroy_body(other_body));
        }
        if self.step_world_on_enter {
            ctx.world_mut().update(1.0, &mut ());
        }
    }
    fn on_collision_stay(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("collision_stay", other);
    }
    fn on_collision_exit(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("collision_exit", other);
    }
    fn on_trigger_enter(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("trigger_enter", other);
    }
    fn on_trigger_stay(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("trigger_stay", other);
    }
    fn on_trigger_exit(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("trigger_exit", other);
    }
    fn on_object_enter(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("object_enter", other);
    }
    fn on_object_stay(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("object_stay", other);
    }
    fn on_object_exit(&mut self, other: EntityId, _ctx: &mut CollisionContext<'_>) {
        self.record("object_exit", other);
    }
}

const GROUND: EntityId = EntityId(1);
const BALL: EntityId = EntityId(2);

struct Fixture {
    world: CollisionWorld,
    scene: HashMap<EntityId, Recorder>,
    log: Log,
    ground: BodyId,
    ball: BodyId,
}

impl Fixture {
    /// Static 2x2x2 box at the origin and a dynamic ball of radius 0.5
    /// resting 0.1 deep in its top face, with gravity off.
    fn new(ground_props: &[(&str, &str)], ball_props: &[(&str, &str)]) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut world = CollisionWorld::new(PhysicsConfig {
            gravity: Vector3::ZERO,
            ..Default::default()
        });
        world.init().expect("world should start");

        let mut ground_desc = vec![("mass", "0"), ("scale", "2 2 2")];
        ground_desc.extend_from_slice(ground_props);
        let mut ball_desc = vec![("shape", "Sphere"), ("mass", "1")];
        ball_desc.extend_from_slice(ball_props);

        let ground = world
            .spawn(
                GROUND,
                &Transform::default(),
                &RigidBodyDesc::from_properties(ground_desc),
            )
            .unwrap();
        let ball = world
            .spawn(
                BALL,
                &Transform::from_position(Vector3::new(0.0, 1.4, 0.0)),
                &RigidBodyDesc::from_properties(ball_desc),
            )
            .unwrap();

        let log = Log::default();
        let mut scene = HashMap::new();
        scene.insert(GROUND, Recorder::new(GROUND, &log));
        scene.insert(BALL, Recorder::new(BALL, &log));

        Self {
            world,
            scene,
            log,
            ground,
            ball,
        }
    }

    fn step(&mut self, steps: u32) {
        for _ in 0..steps {
            let dt = self.world.fixed_timestep() + 1e-9;
            self.world.update(dt, &mut self.scene);
        }
    }

    fn events_of(&self, id: EntityId) -> Vec<&'static str> {
        self.log
            .borrow()
            .iter()
            .filter(|(who, _, _)| *who == id)
            .map(|(_, event, _)| *event)
            .collect()
    }

    fn count(&self, event: &str) -> usize {
        self.log.borrow().iter().filter(|(_, e, _)| *e == event).count()
    }
}

#[test]
fn test_enter_stay_exit_sequence() {
    let mut fx = Fixture::new(&[], &[]);

    fx.step(5);
    assert!(fx.world.is_in_contact(fx.ground, fx.ball));

    // Move the ball away and keep stepping well past the separation
    fx.world
        .body_mut(fx.ball)
        .unwrap()
        .set_linear_velocity(Vector3::new(0.0, 5.0, 0.0));
    fx.step(20);
    assert!(!fx.world.is_in_contact(fx.ground, fx.ball));

    for id in [GROUND, BALL] {
        let events = fx.events_of(id);
        println!("{id:?}: {events:?}");
        assert_eq!(events.first(), Some(&"collision_enter"), "first event must be an enter");
        assert_eq!(events.last(), Some(&"collision_exit"), "last event must be an exit");
        assert_eq!(events.iter().filter(|e| **e == "collision_enter").count(), 1);
        assert_eq!(events.iter().filter(|e| **e == "collision_exit").count(), 1);
        assert!(
            events.iter().filter(|e| **e == "collision_stay").count() >= 4,
            "expected a stay on every step while touching, got {events:?}"
        );
        assert!(events[1..events.len() - 1].iter().all(|e| *e == "collision_stay"));
    }

    // Each object hears about the other one
    for (who, _, other) in fx.log.borrow().iter() {
        assert_ne!(who, other);
    }
}

#[test]
fn test_one_stay_per_step() {
    let mut fx = Fixture::new(&[], &[]);
    fx.step(1);
    assert_eq!(fx.events_of(BALL), vec!["collision_enter"]);
    fx.step(3);
    assert_eq!(
        fx.events_of(BALL),
        vec!["collision_enter", "collision_stay", "collision_stay", "collision_stay"]
    );
}

#[test]
fn test_trigger_and_solid() {
    let mut fx = Fixture::new(&[], &[("trigger", "1")]);
    fx.step(3);

    assert_eq!(fx.count("collision_enter") + fx.count("collision_stay"), 0);
    assert_eq!(fx.events_of(GROUND), vec!["trigger_enter", "trigger_stay", "trigger_stay"]);
    assert_eq!(fx.events_of(BALL), vec!["object_enter", "object_stay", "object_stay"]);

    // The solid side hears first
    let log = fx.log.borrow();
    assert_eq!(log[0], (GROUND, "trigger_enter", BALL));
    assert_eq!(log[1], (BALL, "object_enter", GROUND));
}

#[test]
fn test_trigger_exit() {
    let mut fx = Fixture::new(&[("trigger", "true")], &[]);
    fx.step(2);
    fx.world
        .body_mut(fx.ball)
        .unwrap()
        .set_linear_velocity(Vector3::new(0.0, 5.0, 0.0));
    fx.step(10);

    assert_eq!(fx.count("trigger_exit"), 1);
    assert_eq!(fx.count("object_exit"), 1);
    assert_eq!(fx.events_of(BALL).last(), Some(&"trigger_exit"));
    assert_eq!(fx.events_of(GROUND).last(), Some(&"object_exit"));
}

#[test]
fn test_two_triggers_only_exit() {
    let mut fx = Fixture::new(&[("trigger", "1")], &[("trigger", "1")]);
    fx.step(3);
    assert!(fx.log.borrow().is_empty(), "two triggers must not get enter or stay events");
    assert!(fx.world.is_in_contact(fx.ground, fx.ball));

    fx.world
        .body_mut(fx.ball)
        .unwrap()
        .set_linear_velocity(Vector3::new(0.0, 5.0, 0.0));
    fx.step(10);

    assert_eq!(fx.events_of(GROUND), vec!["object_exit"]);
    assert_eq!(fx.events_of(BALL), vec!["object_exit"]);
}

#[test]
fn test_destroy_inside_callback() {
    let mut fx = Fixture::new(&[], &[]);
    fx.scene.get_mut(&GROUND).unwrap().destroy_other_on_enter = true;

    fx.step(10);

    assert_eq!(fx.world.body_count(), 1);
    assert!(fx.world.body(fx.ball).is_none());
    assert!(fx.world.contact_pairs().is_empty());
    assert_eq!(fx.count("collision_stay"), 0);
    assert_eq!(fx.count("collision_exit"), 0, "destroyed bodies get no exit");
    assert_eq!(fx.events_of(GROUND), vec!["collision_enter"]);
}

#[test]
fn test_destroy_between_steps() {
    let mut fx = Fixture::new(&[], &[]);
    fx.step(3);
    assert!(fx.world.destroy_body(fx.ground));
    fx.step(3);

    assert_eq!(fx.count("collision_exit"), 0);
    assert_eq!(fx.events_of(BALL).len(), 3);
}

#[test]
fn test_inactive_objects_are_ignored() {
    let mut fx = Fixture::new(&[], &[]);
    fx.scene.get_mut(&BALL).unwrap().active = false;
    fx.step(3);
    assert!(fx.log.borrow().is_empty());
    assert!(fx.world.contact_pairs().is_empty());

    // Reactivating starts a fresh enter
    fx.scene.get_mut(&BALL).unwrap().active = true;
    fx.step(1);
    assert_eq!(fx.events_of(BALL), vec!["collision_enter"]);
}

#[test]
fn test_inactive_body_is_ignored() {
    let mut fx = Fixture::new(&[], &[]);
    fx.world.body_mut(fx.ball).unwrap().set_active(false);
    fx.step(3);
    assert!(fx.log.borrow().is_empty());
}

#[test]
fn test_update_from_callback_is_ignored() {
    let mut fx = Fixture::new(&[], &[]);
    fx.scene.get_mut(&GROUND).unwrap().step_world_on_enter = true;
    fx.step(1);

    assert_eq!(fx.count("collision_enter"), 2);
    assert_eq!(fx.count("collision_stay"), 0, "nested update must not step the world");
    assert!(fx.world.accumulator().accumulated_time() < fx.world.fixed_timestep());
}

#[test]
fn test_close_from_callback_stops_stepping() {
    struct Closer;
    impl GameObject for Closer {
        fn on_collision_enter(&mut self, _other: EntityId, ctx: &mut CollisionContext<'_>) {
            ctx.world_mut().close();
        }
    }

    let mut world = CollisionWorld::new(PhysicsConfig {
        gravity: Vector3::ZERO,
        ..Default::default()
    });
    world.init().unwrap();
    let sphere = |mass: &str| {
        RigidBodyDesc::from_properties([("shape", "Sphere"), ("mass", mass)])
    };
    world
        .spawn(EntityId(1), &Transform::default(), &sphere("0"))
        .unwrap();
    world
        .spawn(
            EntityId(2),
            &Transform::from_position(Vector3::new(0.9, 0.0, 0.0)),
            &sphere("1"),
        )
        .unwrap();

    let mut scene: HashMap<EntityId, Closer> = HashMap::new();
    scene.insert(EntityId(1), Closer);
    scene.insert(EntityId(2), Closer);
    world.update(world.fixed_timestep() * 4.0, &mut scene);

    assert!(!world.is_running());
    assert_eq!(world.body_count(), 0);
}
