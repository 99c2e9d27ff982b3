//! Plating configuration.
//!
//! All knobs default to the constants the bed-plating engine has always used:
//! 2 units of clearance on every side of a part, 64 probe angles per spiral ring
//! and a bed at `z = 0` centered on the origin.

use crate::errors::PlateError;
use crate::float_types::{Real, tolerance};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// How faces with more than three vertices are turned into triangles for picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceTriangulation {
    /// Fan from the first vertex. Non-convex faces are logged and fanned anyway.
    #[default]
    Fan,
    /// Fan from the first vertex, failing on any face that is not convex and planar.
    RequireConvex,
}

/// Settings shared by placement, cleaning and picking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatingConfig {
    /// Gap kept around every part footprint, per side, in X and Y
    pub clearance: Real,
    /// Number of angular probes per ring of the spiral search
    pub angle_steps: u32,
    /// Lower bound on the spiral ring distance so zero-size footprints still make progress
    pub min_ring_distance: Real,
    /// Height of the bed surface parts are dropped onto
    pub bed_height: Real,
    /// Where auto-arrange centers the whole group
    pub bed_center: Vector2<Real>,
    /// Distance below which clean-and-merge welds two vertices
    pub weld_tolerance: Real,
    /// Face triangulation policy for pick indices
    pub face_triangulation: FaceTriangulation,
}

impl Default for PlatingConfig {
    fn default() -> Self {
        Self {
            clearance: 2.0,
            angle_steps: 64,
            min_ring_distance: 1.0,
            bed_height: 0.0,
            bed_center: Vector2::zeros(),
            weld_tolerance: tolerance(),
            face_triangulation: FaceTriangulation::Fan,
        }
    }
}

impl PlatingConfig {
    /// Parse and [validate](Self::validate) a config from JSON; missing fields
    /// keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, PlateError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every distance is finite and in range: clearance and bed
    /// coordinates finite, clearance non-negative, weld tolerance, minimum ring
    /// distance and angle steps positive.
    pub fn validate(&self) -> Result<(), PlateError> {
        let invalid = |field: &'static str, value: Real| PlateError::InvalidConfig { field, value };

        if !(self.clearance.is_finite() && self.clearance >= 0.0) {
            return Err(invalid("clearance", self.clearance));
        }
        if !(self.weld_tolerance.is_finite() && self.weld_tolerance > 0.0) {
            return Err(invalid("weld_tolerance", self.weld_tolerance));
        }
        if !(self.min_ring_distance.is_finite() && self.min_ring_distance > 0.0) {
            return Err(invalid("min_ring_distance", self.min_ring_distance));
        }
        if self.angle_steps == 0 {
            return Err(invalid("angle_steps", 0.0));
        }
        if !self.bed_height.is_finite() {
            return Err(invalid("bed_height", self.bed_height));
        }
        if let Some(&c) = self.bed_center.iter().find(|c| !c.is_finite()) {
            return Err(invalid("bed_center", c));
        }
        Ok(())
    }

    /// Serialize this config to pretty JSON.
    pub fn to_json(&self) -> Result<String, PlateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Ring distance actually used by the spiral search for a footprint of this size.
    pub fn ring_distance(&self, x_size: Real, y_size: Real) -> Real {
        let ring = x_size.min(y_size);
        if x_size.is_finite() && y_size.is_finite() && ring > self.min_ring_distance {
            ring
        } else {
            self.min_ring_distance.max(Real::EPSILON)
        }
    }
}
