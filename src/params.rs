//! Behavioural parameters of a driver.

use crate::units::{Acceleration, Duration, Length, Scalar};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// A constraint on the value of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// Any finite value.
    None,
    /// Strictly greater than zero.
    Positive,
    /// Greater than or equal to zero.
    NonNegative,
}

impl Constraint {
    fn accepts(self, value: f64) -> bool {
        match self {
            Constraint::None => value.is_finite(),
            Constraint::Positive => value.is_finite() && value > 0.0,
            Constraint::NonNegative => value.is_finite() && value >= 0.0,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::None => write!(f, "finite"),
            Constraint::Positive => write!(f, "> 0"),
            Constraint::NonNegative => write!(f, ">= 0"),
        }
    }
}

/// An error reading or writing a behavioural parameter.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("required parameter `{id}` is not set")]
    Missing { id: &'static str },

    #[error("parameter `{id}` = {value} violates constraint {constraint}")]
    OutOfRange {
        id: &'static str,
        value: f64,
        constraint: Constraint,
    },
}

/// A typed key into a [Parameters] set.
pub struct ParameterType<T> {
    id: &'static str,
    description: &'static str,
    default: f64,
    constraint: Constraint,
    _unit: PhantomData<T>,
}

impl<T> ParameterType<T> {
    const fn new(
        id: &'static str,
        description: &'static str,
        default: f64,
        constraint: Constraint,
    ) -> Self {
        Self {
            id,
            description,
            default,
            constraint,
            _unit: PhantomData,
        }
    }

    /// The unique identifier of the parameter.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// A human readable description.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// The constraint its values must satisfy.
    pub fn constraint(&self) -> Constraint {
        self.constraint
    }
}

impl<T: Scalar> ParameterType<T> {
    /// The default value of the parameter.
    pub fn default_value(&self) -> T {
        T::from_si(self.default)
    }
}

/// Maximum (desired) acceleration.
pub const A: ParameterType<Acceleration> =
    ParameterType::new("a", "Maximum (desired) car-following acceleration", 1.25, Constraint::Positive);

/// Comfortable deceleration, also the bound used to screen lane changes.
pub const B: ParameterType<Acceleration> =
    ParameterType::new("b", "Maximum comfortable car-following deceleration", 2.09, Constraint::Positive);

/// Stopping distance.
pub const S0: ParameterType<Length> =
    ParameterType::new("s0", "Separation at stand-still", 3.0, Constraint::Positive);

/// Desired time headway.
pub const T: ParameterType<Duration> =
    ParameterType::new("T", "Desired time headway", 1.2, Constraint::Positive);

/// Adherence factor to the speed limit.
pub const FSPEED: ParameterType<f64> =
    ParameterType::new("fSpeed", "Speed limit adherence factor", 1.0, Constraint::Positive);

/// Exponent of the free-road term.
pub const DELTA: ParameterType<f64> =
    ParameterType::new("delta", "Acceleration flattening exponent", 4.0, Constraint::Positive);

/// Length of a planning step, i.e. how long a decision stays valid.
pub const DT: ParameterType<Duration> =
    ParameterType::new("dt", "Planning step duration", 0.5, Constraint::Positive);

/// Perception range ahead.
pub const LOOKAHEAD: ParameterType<Length> =
    ParameterType::new("Look-ahead", "Look-ahead distance", 295.0, Constraint::Positive);

/// Anticipation distance.
pub const X0: ParameterType<Length> =
    ParameterType::new("x0", "Look-ahead distance for speed anticipation", 295.0, Constraint::Positive);

/// Braking applied when the car-following law has no defined answer.
pub const EMERGENCY_DECELERATION: ParameterType<Acceleration> = ParameterType::new(
    "bEmergency",
    "Deceleration applied in an undefined car-following regime",
    6.0,
    Constraint::Positive,
);

static DEFAULT_SET: Lazy<Parameters> = Lazy::new(|| {
    let mut params = Parameters::new();
    params.set_default(&A);
    params.set_default(&B);
    params.set_default(&S0);
    params.set_default(&T);
    params.set_default(&FSPEED);
    params.set_default(&DELTA);
    params.set_default(&DT);
    params.set_default(&LOOKAHEAD);
    params.set_default(&X0);
    params.set_default(&EMERGENCY_DECELERATION);
    params
});

/// A set of behavioural parameters, owned by a driver profile.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    values: HashMap<String, f64>,
}

impl Parameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a parameter set holding the default value of every known parameter.
    pub fn default_set() -> Self {
        DEFAULT_SET.clone()
    }

    /// Sets a parameter, checking its constraint.
    pub fn set<T: Scalar>(&mut self, param: &ParameterType<T>, value: T) -> Result<(), ParameterError> {
        let value = value.into_si();
        if !param.constraint.accepts(value) {
            return Err(ParameterError::OutOfRange {
                id: param.id,
                value,
                constraint: param.constraint,
            });
        }
        self.values.insert(param.id.to_string(), value);
        Ok(())
    }

    /// Gets a parameter, or an error if it was never set.
    pub fn get<T: Scalar>(&self, param: &ParameterType<T>) -> Result<T, ParameterError> {
        self.values
            .get(param.id)
            .map(|v| T::from_si(*v))
            .ok_or(ParameterError::Missing { id: param.id })
    }

    /// Whether the parameter is set.
    pub fn contains<T>(&self, param: &ParameterType<T>) -> bool {
        self.values.contains_key(param.id)
    }

    /// Removes a parameter.
    pub fn remove<T>(&mut self, param: &ParameterType<T>) {
        self.values.remove(param.id);
    }

    fn set_default<T>(&mut self, param: &ParameterType<T>) {
        self.values.insert(param.id.to_string(), param.default);
    }
}
