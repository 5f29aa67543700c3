//! Parameters controlling contact construction.

use crate::error::InputError;
use crate::geometry::{DEFAULT_EPSILON, Tolerance};
use crate::types::PeriodicBox;

/// Number of vertices of the seed polygon that starts every clipped contour.
pub const DEFAULT_SEED_VERTICES: usize = 6;

/// Seed polygon circumradius relative to the intersection circle radius.
///
/// Slightly above `1/cos(30°)`, so the default hexagon encloses the circle.
pub const DEFAULT_SEED_SCALE: f64 = 1.19;

/// Settings for a contact computation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct Settings {
    /// Solvent probe radius added to every ball.
    pub probe: f64,

    /// Epsilon used by every fuzzy comparison.
    pub epsilon: f64,

    /// Vertex count of the seed polygon (at least 3).
    ///
    /// Empirical default; dense neighborhoods may need validation when changed.
    pub seed_vertices: usize,

    /// Seed polygon circumradius as a multiple of the circle radius.
    ///
    /// Must keep the polygon enclosing the circle, i.e. exceed `1/cos(π/seed_vertices)`.
    pub seed_scale: f64,

    /// Restriction of the intersection circle radius.
    ///
    /// Positive values cap the radius, negative values shrink it by the given amount,
    /// zero disables the restriction.
    pub max_circle_radius: f64,

    /// Abort on the first invalid ball instead of skipping it.
    pub strict: bool,

    /// Skip spheres fully buried inside another sphere.
    pub exclude_hidden: bool,

    /// Treat the balls as one cell of an infinite lattice repeating this box.
    ///
    /// Every edge of the box should be longer than the largest expanded ball diameter.
    pub periodic_box: Option<PeriodicBox>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe: 1.4,
            epsilon: DEFAULT_EPSILON,
            seed_vertices: DEFAULT_SEED_VERTICES,
            seed_scale: DEFAULT_SEED_SCALE,
            max_circle_radius: 0.0,
            strict: false,
            exclude_hidden: true,
            periodic_box: None,
        }
    }
}

impl Settings {
    /// Settings with the given probe and defaults elsewhere.
    #[must_use]
    pub fn with_probe(probe: f64) -> Self {
        Self {
            probe,
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.epsilon)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns [`InputError`] for a non-finite or negative probe, a non-positive epsilon,
    /// a seed polygon that cannot enclose the circle, or a flat periodic box.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.probe.is_finite() || self.probe < 0.0 {
            return Err(InputError::InvalidProbe(self.probe));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(InputError::InvalidSetting {
                name: "epsilon",
                reason: format!("{} is not a positive finite number", self.epsilon),
            });
        }
        if self.seed_vertices < 3 {
            return Err(InputError::InvalidSetting {
                name: "seed_vertices",
                reason: format!("{} vertices cannot form a polygon", self.seed_vertices),
            });
        }
        let min_scale = 1.0 / (std::f64::consts::PI / self.seed_vertices as f64).cos();
        if !self.seed_scale.is_finite() || self.seed_scale <= min_scale {
            return Err(InputError::InvalidSetting {
                name: "seed_scale",
                reason: format!(
                    "{} does not enclose the circle with {} vertices (needs > {min_scale:.4})",
                    self.seed_scale, self.seed_vertices
                ),
            });
        }
        if !self.max_circle_radius.is_finite() {
            return Err(InputError::InvalidSetting {
                name: "max_circle_radius",
                reason: "must be finite".to_string(),
            });
        }
        if let Some(periodic_box) = &self.periodic_box {
            let lengths = periodic_box.lengths();
            if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
                return Err(InputError::InvalidSetting {
                    name: "periodic_box",
                    reason: format!(
                        "edges {:?} must all be positive and finite",
                        [lengths.x, lengths.y, lengths.z]
                    ),
                });
            }
        }
        Ok(())
    }
}
