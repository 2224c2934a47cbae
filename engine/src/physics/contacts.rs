//! Contact pair bookkeeping and event dispatch rules
//!
//! Which hook a body receives depends only on the roles of the two bodies and
//! on the transition the pair went through this step. That mapping is a pure
//! function so it can be checked case by case.

use crate::physics::components::BodyId;

/// Unordered pair of bodies in contact, stored with the lower id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactPair {
    first: BodyId,
    second: BodyId,
}

impl ContactPair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> BodyId {
        self.first
    }

    pub fn second(&self) -> BodyId {
        self.second
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.first == body || self.second == body
    }

    /// The body paired with `body`, if `body` is part of this pair
    pub fn other(&self, body: BodyId) -> Option<BodyId> {
        if self.first == body {
            Some(self.second)
        } else if self.second == body {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Whether a body responds to contact or only observes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Solid,
    Trigger,
}

impl Role {
    pub fn from_trigger(is_trigger: bool) -> Self {
        if is_trigger {
            Role::Trigger
        } else {
            Role::Solid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enter,
    Stay,
    Exit,
}

/// Hook family delivered to a game object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `on_collision_*`: both bodies are solid
    Collision,
    /// `on_trigger_*`: a solid body touched a trigger
    Trigger,
    /// `on_object_*`: a trigger noticed another body
    Object,
}

/// Which side of the pair receives a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub target: Side,
    pub kind: EventKind,
}

/// Up to two deliveries, in the order they must be made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchPlan(pub [Option<Delivery>; 2]);

impl DispatchPlan {
    const EMPTY: DispatchPlan = DispatchPlan([None, None]);

    fn pair(first: Delivery, second: Delivery) -> Self {
        DispatchPlan([Some(first), Some(second)])
    }

    pub fn deliveries(&self) -> impl Iterator<Item = Delivery> + '_ {
        self.0.iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Map the roles of a pair and its transition to the hooks that fire.
///
/// Two triggers only ever hear about each other on exit, as an object event.
pub fn dispatch_plan(a: Role, b: Role, transition: Transition) -> DispatchPlan {
    let to = |target, kind| Delivery { target, kind };
    match (a, b) {
        (Role::Solid, Role::Solid) => DispatchPlan::pair(
            to(Side::A, EventKind::Collision),
            to(Side::B, EventKind::Collision),
        ),
        (Role::Solid, Role::Trigger) => DispatchPlan::pair(
            to(Side::A, EventKind::Trigger),
            to(Side::B, EventKind::Object),
        ),
        (Role::Trigger, Role::Solid) => DispatchPlan::pair(
            to(Side::B, EventKind::Trigger),
            to(Side::A, EventKind::Object),
        ),
        (Role::Trigger, Role::Trigger) => match transition {
            Transition::Exit => DispatchPlan::pair(
                to(Side::A, EventKind::Object),
                to(Side::B, EventKind::Object),
            ),
            Transition::Enter | Transition::Stay => DispatchPlan::EMPTY,
        },
    }
}
