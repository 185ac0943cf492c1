//! Physical quantities used by the behavioural models.
//!
//! Every quantity wraps an `f64` in SI units. Values of the same kind can be
//! added and subtracted, any kind can be scaled by a plain `f64`, and the few
//! cross-kind products the models need are spelled out explicitly below.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $unit:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(f64);

        impl $name {
            /// The zero value.
            pub const ZERO: Self = Self(0.0);
            /// Positive infinity.
            pub const INFINITY: Self = Self(f64::INFINITY);
            /// Negative infinity.
            pub const NEG_INFINITY: Self = Self(f64::NEG_INFINITY);

            /// Creates a value from a number in SI units.
            pub const fn new(si: f64) -> Self {
                Self(si)
            }

            /// The value in SI units.
            pub const fn si(self) -> f64 {
                self.0
            }

            /// The smaller of two values.
            pub fn min(self, other: Self) -> Self {
                Self(f64::min(self.0, other.0))
            }

            /// The larger of two values.
            pub fn max(self, other: Self) -> Self {
                Self(f64::max(self.0, other.0))
            }

            /// The absolute value.
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Whether the value is neither infinite nor NaN.
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$name> for f64 {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                $name(self * rhs.0)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;

            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        /// The ratio of two values of the same kind is dimensionless.
        impl Div for $name {
            type Output = f64;

            fn div(self, rhs: Self) -> f64 {
                self.0 / rhs.0
            }
        }

        impl Scalar for $name {
            fn from_si(si: f64) -> Self {
                Self(si)
            }

            fn into_si(self) -> f64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", self.0, $unit)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.3}{}", self.0, $unit)
            }
        }
    };
}

/// A quantity that can be stored as a plain SI number, e.g. in a parameter set.
pub trait Scalar: Copy {
    /// Creates the quantity from a number in SI units.
    fn from_si(si: f64) -> Self;
    /// Converts the quantity into a number in SI units.
    fn into_si(self) -> f64;
}

impl Scalar for f64 {
    fn from_si(si: f64) -> Self {
        si
    }

    fn into_si(self) -> f64 {
        self
    }
}

quantity!(
    /// A length or distance, in m.
    Length,
    "m"
);

quantity!(
    /// A speed, in m/s.
    Speed,
    "m/s"
);

quantity!(
    /// An acceleration, in m/s<sup>2</sup>. Decelerations are negative.
    Acceleration,
    "m/s^2"
);

quantity!(
    /// A relative time span, in s.
    Duration,
    "s"
);

quantity!(
    /// An absolute simulation time, in s since the start of the simulation.
    Time,
    "s"
);

quantity!(
    /// A number of vehicles per unit of road length, in 1/m.
    LinearDensity,
    "/m"
);

impl Mul<Duration> for Speed {
    type Output = Length;

    fn mul(self, rhs: Duration) -> Length {
        Length(self.0 * rhs.0)
    }
}

impl Div<Duration> for Length {
    type Output = Speed;

    fn div(self, rhs: Duration) -> Speed {
        Speed(self.0 / rhs.0)
    }
}

impl Div<Speed> for Length {
    type Output = Duration;

    fn div(self, rhs: Speed) -> Duration {
        Duration(self.0 / rhs.0)
    }
}

impl Div<Duration> for Speed {
    type Output = Acceleration;

    fn div(self, rhs: Duration) -> Acceleration {
        Acceleration(self.0 / rhs.0)
    }
}

impl Mul<Duration> for Acceleration {
    type Output = Speed;

    fn mul(self, rhs: Duration) -> Speed {
        Speed(self.0 * rhs.0)
    }
}

/// Shifting an absolute time by a span gives another absolute time.
impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl LinearDensity {
    /// The density of `count` vehicles spread over `length`.
    pub fn from_count(count: usize, length: Length) -> Self {
        if count == 0 || length.0 <= 0.0 {
            Self::ZERO
        } else {
            Self(count as f64 / length.0)
        }
    }

    /// The density in vehicles per km.
    pub fn per_km(self) -> f64 {
        1000.0 * self.0
    }
}

impl Speed {
    /// Creates a speed from a value in km/h.
    pub fn from_kmh(kmh: f64) -> Self {
        Self(kmh / 3.6)
    }
}
