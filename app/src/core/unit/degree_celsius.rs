use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

// Absorbs float noise like 21.500000000000004 before snapping to half degrees
const HALF_DEGREE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DegreeCelsius(pub f64);

impl DegreeCelsius {
    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    pub fn round_up_to_half(self) -> Self {
        Self(((self.0 * 2.0) - HALF_DEGREE_TOLERANCE).ceil() / 2.0)
    }

    pub fn round_down_to_half(self) -> Self {
        Self(((self.0 * 2.0) + HALF_DEGREE_TOLERANCE).floor() / 2.0)
    }

    pub fn clamp(self, min: DegreeCelsius, max: DegreeCelsius) -> Self {
        Self(self.0.clamp(min.0, max.0))
    }

    pub fn max(self, other: DegreeCelsius) -> Self {
        Self(self.0.max(other.0))
    }

    pub fn min(self, other: DegreeCelsius) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn mean(values: impl IntoIterator<Item = DegreeCelsius>) -> Option<DegreeCelsius> {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), value| (sum + value.0, count + 1));

        if count == 0 {
            None
        } else {
            Some(DegreeCelsius(sum / count as f64))
        }
    }
}

impl From<&DegreeCelsius> for f64 {
    fn from(value: &DegreeCelsius) -> Self {
        value.0
    }
}

impl From<f64> for DegreeCelsius {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<DegreeCelsius> for f64 {
    fn from(value: DegreeCelsius) -> Self {
        value.0
    }
}

impl Display for DegreeCelsius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

impl std::ops::Add for DegreeCelsius {
    type Output = DegreeCelsius;

    fn add(self, rhs: Self) -> Self::Output {
        DegreeCelsius(self.0 + rhs.0)
    }
}

impl std::ops::Sub for DegreeCelsius {
    type Output = DegreeCelsius;

    fn sub(self, rhs: Self) -> Self::Output {
        DegreeCelsius(self.0 - rhs.0)
    }
}

impl std::ops::Neg for DegreeCelsius {
    type Output = DegreeCelsius;

    fn neg(self) -> Self::Output {
        DegreeCelsius(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_to_half() {
        assert_eq!(DegreeCelsius(20.1).round_up_to_half(), DegreeCelsius(20.5));
        assert_eq!(DegreeCelsius(20.5).round_up_to_half(), DegreeCelsius(20.5));
        assert_eq!(DegreeCelsius(20.6).round_up_to_half(), DegreeCelsius(21.0));
    }

    #[test]
    fn round_down_to_half() {
        assert_eq!(DegreeCelsius(20.9).round_down_to_half(), DegreeCelsius(20.5));
        assert_eq!(DegreeCelsius(20.5).round_down_to_half(), DegreeCelsius(20.5));
        assert_eq!(DegreeCelsius(20.4).round_down_to_half(), DegreeCelsius(20.0));
    }

    #[test]
    fn rounding_ignores_float_noise() {
        let noisy = DegreeCelsius(20.0) + (DegreeCelsius(21.3) - DegreeCelsius(19.8));

        assert_eq!(noisy.round_up_to_half(), DegreeCelsius(21.5));
        assert_eq!(noisy.round_down_to_half(), DegreeCelsius(21.5));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(DegreeCelsius::mean(vec![]), None);
        assert_eq!(
            DegreeCelsius::mean(vec![DegreeCelsius(19.0), DegreeCelsius(21.0)]),
            Some(DegreeCelsius(20.0))
        );
    }
}
