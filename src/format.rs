//! Unit-scaled number formatting for dashboard metrics

use crate::error::{PipelineError, Result};

/// Ordered unit names, one per power of 1000
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitScale {
    units: Vec<String>,
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(["", "thousand", "million"])
    }
}

impl UnitScale {
    /// Build a scale from unit names; the first entry is the unscaled unit.
    /// An empty list falls back to a single unscaled unit.
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut units: Vec<String> = units.into_iter().map(Into::into).collect();
        if units.is_empty() {
            units.push(String::new());
        }
        Self { units }
    }

    /// Render `value` with two decimals in the first unit where it drops
    /// below 1000, or in the largest unit when it never does.
    pub fn format(&self, value: f64, prefix: &str) -> Result<String> {
        if !value.is_finite() || value < 0.0 {
            return Err(PipelineError::InvalidMagnitude(value));
        }

        let last = self.units.len() - 1;
        let mut scaled = value;
        let mut unit = &self.units[last];
        for (i, name) in self.units.iter().enumerate() {
            if scaled < 1000.0 || i == last {
                unit = name;
                break;
            }
            scaled /= 1000.0;
        }

        let mut parts = Vec::with_capacity(3);
        if !prefix.is_empty() {
            parts.push(prefix.to_string());
        }
        parts.push(format!("{scaled:.2}"));
        if !unit.is_empty() {
            parts.push(unit.clone());
        }
        Ok(parts.join(" "))
    }
}

/// Format with the default `["", "thousand", "million"]` scale
pub fn format_number(value: f64, prefix: &str) -> Result<String> {
    UnitScale::default().format(value, prefix)
}
