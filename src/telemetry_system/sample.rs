use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{GRAVITY, PROPELLANT_EPSILON};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    LiquidFuel,
    Oxidizer,
    MonoPropellant,
    ElectricCharge,
    Other(String),
}

impl ResourceKind {
    /// Whether the resource feeds an engine. Electric charge never does.
    pub fn is_propellant(&self) -> bool {
        !matches!(self, ResourceKind::ElectricCharge)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::LiquidFuel => write!(f, "LiquidFuel"),
            ResourceKind::Oxidizer => write!(f, "Oxidizer"),
            ResourceKind::MonoPropellant => write!(f, "MonoPropellant"),
            ResourceKind::ElectricCharge => write!(f, "ElectricCharge"),
            ResourceKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One snapshot of the vehicle, taken once per control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub thrust: f64,
    pub altitude: f64,
    pub apoapsis: f64,
    pub vertical_speed: f64,
    pub heading: Option<f64>,
    pub stage_resources: BTreeMap<ResourceKind, f64>,
    pub mass: f64,
    pub surface_gravity: f64,
    pub universal_time: Option<f64>, // s on the vehicle clock
}

impl TelemetrySample {
    pub fn new(thrust: f64, altitude: f64, apoapsis: f64) -> Self {
        TelemetrySample {
            thrust: thrust.max(0.0),
            altitude,
            apoapsis,
            vertical_speed: 0.0,
            heading: None,
            stage_resources: BTreeMap::new(),
            mass: 0.0,
            surface_gravity: GRAVITY,
            universal_time: None,
        }
    }

    pub fn with_vertical_speed(mut self, vertical_speed: f64) -> Self {
        self.vertical_speed = vertical_speed;
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_universal_time(mut self, universal_time: f64) -> Self {
        self.universal_time = Some(universal_time);
        self
    }

    pub fn with_resource(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.stage_resources.insert(kind, amount);
        self
    }

    pub fn with_mass(mut self, mass: f64, surface_gravity: f64) -> Self {
        self.mass = mass;
        self.surface_gravity = surface_gravity;
        self
    }

    pub fn total_propellant(&self) -> f64 {
        self.stage_resources
            .iter()
            .filter(|(kind, _)| kind.is_propellant())
            .map(|(_, amount)| amount.max(0.0))
            .sum()
    }

    /// True when the stage has no propellant left. A stage that reports no
    /// propellant at all counts as empty.
    pub fn is_stage_depleted(&self) -> bool {
        self.total_propellant() <= PROPELLANT_EPSILON
    }

    /// Thrust-to-weight ratio, `None` when the weight is not positive.
    pub fn thrust_to_weight(&self) -> Option<f64> {
        let weight = self.mass * self.surface_gravity;
        if weight > 0.0 && weight.is_finite() {
            Some(self.thrust / weight)
        } else {
            None
        }
    }
}
