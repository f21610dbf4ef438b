use serde::{Deserialize, Serialize};

use super::Axis;

/// Well-known names for the kind of sub-axis a modulo describes.
pub mod modulo_type {
    pub const CHANNEL: &str = "channel";
    pub const SPECTRA: &str = "spectra";
    pub const LIFETIME: &str = "lifetime";
    pub const POLARIZATION: &str = "polarization";
    pub const PHASE: &str = "phase";
    pub const FREQUENCY: &str = "frequency";
    pub const ROTATION: &str = "rotation";
    pub const ILLUMINATION: &str = "illumination";
}

/// A sub-axis multiplexed within Z, C or T.
///
/// For example, 16 lifetime bins of 2 channels stored as `sizeC = 32` carry a
/// C modulo of length 16. The sub-axis is either a numeric range
/// (`start..=end` by `step`) or an explicit list of labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modulo {
    pub parent_dimension: Axis,
    pub start: f64,
    pub step: f64,
    pub end: f64,
    pub parent_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_description: String,
    pub unit: Option<String>,
    pub labels: Option<Vec<String>>,
}

impl Modulo {
    /// A trivial modulo (length 1) along `parent`.
    pub fn new(parent: Axis) -> Self {
        let parent_type = match parent {
            Axis::Z => "Z",
            Axis::C => "C",
            Axis::T => "T",
            Axis::X => "X",
            Axis::Y => "Y",
        };
        Self {
            parent_dimension: parent,
            start: 0.0,
            step: 1.0,
            end: 0.0,
            parent_type: parent_type.to_string(),
            kind: String::new(),
            type_description: String::new(),
            unit: None,
            labels: None,
        }
    }

    /// A numeric sub-axis of `length` steps starting at 0.
    pub fn with_length(parent: Axis, kind: &str, length: usize) -> Self {
        Self {
            end: length.saturating_sub(1) as f64,
            kind: kind.to_string(),
            ..Self::new(parent)
        }
    }

    /// Number of positions along the sub-axis.
    ///
    /// An explicit label list is taken as is, so an empty one has length 0.
    /// Degenerate numeric ranges count as a single position.
    pub fn length(&self) -> usize {
        if let Some(labels) = &self.labels {
            return labels.len();
        }
        let steps = ((self.end - self.start) / self.step).round();
        if !steps.is_finite() || steps < 0.0 {
            return 1;
        }
        (steps as usize).saturating_add(1).max(1)
    }

    /// Whether the modulo actually splits its parent axis.
    pub fn is_split(&self) -> bool {
        self.length() > 1
    }

    /// Collapse back to a trivial range, keeping the descriptive strings.
    pub fn reset(&mut self) {
        self.start = 0.0;
        self.step = 1.0;
        self.end = 0.0;
        self.labels = None;
    }

    /// Compact text form recorded in a metadata store.
    pub fn annotation(&self) -> String {
        let mut text = format!(
            "ModuloAlong{} type={} start={} step={} end={}",
            self.parent_dimension, self.kind, self.start, self.step, self.end
        );
        if let Some(unit) = &self.unit {
            text.push_str(&format!(" unit={}", unit));
        }
        if let Some(labels) = &self.labels {
            text.push_str(&format!(" labels={}", labels.join(",")));
        }
        text
    }
}
