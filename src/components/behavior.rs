//! Autonomous behaviors and the gate they share.
//!
//! Behaviors (`Chase`, `Patrol`, `Wander`, `ReturnHome`) are ordinary
//! components. They exclude each other without any central scheduler: each
//! one carries a [`BehaviorGate`], and each behavior type listens to the
//! entity's [`BehaviorChanged`](crate::events::behavior::BehaviorChanged)
//! broadcast through its own observer
//! ([`arbitrate`](crate::systems::behavior::arbitrate)).
//!
//! - every behavior broadcasts `active: true` when it starts and
//!   `active: false` when it stops
//! - every other behavior on the entity suppresses itself on `true` and lifts
//!   the suppression on `false`
//! - a sensing behavior (`Chase`, `ReturnHome`) keeps watching its condition
//!   while suppressed and takes over when the condition newly becomes true

use bevy_ecs::component::Mutable;
use bevy_ecs::prelude::Component;
use std::fmt;

/// Identity of a behavior kind, used as the broadcast source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviorId {
    Chase,
    Patrol,
    Wander,
    ReturnHome,
}

impl BehaviorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorId::Chase => "chase",
            BehaviorId::Patrol => "patrol",
            BehaviorId::Wander => "wander",
            BehaviorId::ReturnHome => "return_home",
        }
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arbitration state carried by every behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BehaviorGate {
    /// Set while a peer behavior is active.
    pub suppressed: bool,
    /// True while this behavior is steering.
    pub active: bool,
    /// Whether the activation condition held on the previous tick.
    pub sensed: bool,
}

impl BehaviorGate {
    pub fn new() -> Self {
        Self {
            suppressed: false,
            active: false,
            sensed: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.suppressed
    }

    /// Record this tick's condition; true when it just became true.
    pub fn sense(&mut self, condition: bool) -> bool {
        let rising = condition && !self.sensed;
        self.sensed = condition;
        rising
    }
}

impl Default for BehaviorGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Common capability of every autonomous behavior component.
pub trait AutonomousBehavior: Component<Mutability = Mutable> {
    const ID: BehaviorId;
    fn gate(&self) -> &BehaviorGate;
    fn gate_mut(&mut self) -> &mut BehaviorGate;
}

macro_rules! impl_behavior {
    ($ty:ty, $id:expr) => {
        impl AutonomousBehavior for $ty {
            const ID: BehaviorId = $id;
            fn gate(&self) -> &BehaviorGate {
                &self.gate
            }
            fn gate_mut(&mut self) -> &mut BehaviorGate {
                &mut self.gate
            }
        }
    };
}

/// Move toward the `player` while it is within sight.
#[derive(Component, Clone, Debug)]
pub struct Chase {
    pub gate: BehaviorGate,
    /// Start chasing when the player is closer than this.
    pub sight_radius: f32,
    /// Give up when the player is farther than this.
    pub lose_radius: f32,
    pub speed: f32,
}

impl Chase {
    pub fn new(sight_radius: f32, speed: f32) -> Self {
        Self {
            gate: BehaviorGate::new(),
            sight_radius,
            lose_radius: sight_radius * 1.5,
            speed,
        }
    }
}

/// Walk a loop of waypoints.
#[derive(Component, Clone, Debug)]
pub struct Patrol {
    pub gate: BehaviorGate,
    pub waypoints: Vec<(f32, f32)>,
    pub current: usize,
    pub speed: f32,
    pub arrive_radius: f32,
}

impl Patrol {
    pub fn new(waypoints: Vec<(f32, f32)>, speed: f32) -> Self {
        Self {
            gate: BehaviorGate::new(),
            waypoints,
            current: 0,
            speed,
            arrive_radius: 2.0,
        }
    }
}

/// Pick a random heading every `interval` seconds.
#[derive(Component, Clone, Debug)]
pub struct Wander {
    pub gate: BehaviorGate,
    pub speed: f32,
    pub interval: f32,
    /// Seconds until the next heading change.
    pub remaining: f32,
    pub heading: (f32, f32),
}

impl Wander {
    pub fn new(speed: f32, interval: f32) -> Self {
        Self {
            gate: BehaviorGate::new(),
            speed,
            interval,
            remaining: 0.0,
            heading: (0.0, 0.0),
        }
    }
}

/// Walk back to `home` after straying farther than `leash`.
#[derive(Component, Clone, Debug)]
pub struct ReturnHome {
    pub gate: BehaviorGate,
    pub home: (f32, f32),
    pub leash: f32,
    pub arrive_radius: f32,
    pub speed: f32,
}

impl ReturnHome {
    pub fn new(home: (f32, f32), leash: f32, speed: f32) -> Self {
        Self {
            gate: BehaviorGate::new(),
            home,
            leash,
            arrive_radius: 2.0,
            speed,
        }
    }
}

impl_behavior!(Chase, BehaviorId::Chase);
impl_behavior!(Patrol, BehaviorId::Patrol);
impl_behavior!(Wander, BehaviorId::Wander);
impl_behavior!(ReturnHome, BehaviorId::ReturnHome);
