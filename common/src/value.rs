// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// A measured quantity, or the marker that it could not be measured.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    #[default]
    Unavailable,
}

impl Value {
    pub fn number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Unavailable, Value::Number)
    }
}

/// Renders like the dashboard table: one decimal, or `Error`.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v:.1}"),
            Value::Unavailable => f.write_str("Error"),
        }
    }
}

/// Rounds to one decimal place.
///
/// Ties are rounded half away from zero (`f64::round`), so `20.25` becomes `20.3`
/// and `-0.25` becomes `-0.3`. Inputs that are already binary approximations of a
/// tie (most of them) round to whichever side the approximation lies on.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean of the values, rounded to one decimal. `None` for no values.
pub fn mean1(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let sum: f64 = values.iter().sum();
    Some(round1(sum / values.len() as f64))
}
