//! Per-sphere cell summaries derived from contact solid angles and pyramid volumes.

use std::f64::consts::PI;

use crate::types::{Cell, ContactSummary, Sphere};

/// Solid angles below this difference are treated as a fully explained sphere.
const SOLID_ANGLE_EPSILON: f64 = 1e-10;

/// Running totals of one sphere's contacts.
#[derive(Debug, Clone, Copy, Default)]
struct CellAccumulator {
    count: usize,
    arc_length: f64,
    solid_angle_positive: f64,
    solid_angle_negative: f64,
    pyramid_volume_positive: f64,
    pyramid_volume_negative: f64,
}

impl CellAccumulator {
    fn add(&mut self, solid_angle: f64, pyramid_volume: f64, arc_length: f64) {
        self.count += 1;
        self.arc_length += arc_length;
        self.solid_angle_positive += solid_angle.max(0.0);
        self.solid_angle_negative -= solid_angle.min(0.0);
        self.pyramid_volume_positive += pyramid_volume.max(0.0);
        self.pyramid_volume_negative -= pyramid_volume.min(0.0);
    }

    fn pyramid_volume(&self) -> f64 {
        self.pyramid_volume_positive - self.pyramid_volume_negative
    }

    /// Exposed surface and cell volume of a sphere of radius `r` bounded by the
    /// accumulated contacts.
    ///
    /// Without any arc the cell is closed by its faces and only the pyramids count.
    fn finish(&self, index: usize, r: f64) -> Cell {
        let explained = self.solid_angle_positive - self.solid_angle_negative;
        if self.arc_length <= 0.0 || explained.abs() <= SOLID_ANGLE_EPSILON {
            return Cell {
                index,
                sas_area: 0.0,
                volume: self.pyramid_volume(),
            };
        }

        let sas_area = if explained > 0.0 {
            4.0f64.mul_add(PI, -explained) * r * r
        } else {
            -explained * r * r
        };
        let volume = sas_area * r / 3.0 + self.pyramid_volume();

        if volume > 4.0 / 3.0 * PI * r * r * r {
            return Cell {
                index,
                sas_area: 0.0,
                volume: self.pyramid_volume(),
            };
        }
        Cell {
            index,
            sas_area,
            volume,
        }
    }
}

/// A sphere that touches nothing: its whole surface is exposed.
fn detached_cell(index: usize, r: f64) -> Cell {
    let sas_area = 4.0 * PI * r * r;
    Cell {
        index,
        sas_area,
        volume: sas_area * r / 3.0,
    }
}

/// Cells of all spheres from the valid contacts of a complete run.
///
/// `has_overlaps(i)` tells whether sphere `i` overlaps any other sphere; such a sphere
/// with no valid contact is buried and gets no cell, as do spheres flagged by `skip`.
/// A contact with `id_a == id_b`, between a sphere and its own periodic image, adds both
/// of its sides to that sphere.
pub fn summarize_cells(
    spheres: &[Sphere],
    contacts: &[ContactSummary],
    has_overlaps: impl Fn(usize) -> bool,
    skip: impl Fn(usize) -> bool,
) -> Vec<Cell> {
    let mut accumulators = vec![CellAccumulator::default(); spheres.len()];
    for c in contacts.iter().filter(|c| c.area > 0.0) {
        if let Some(acc) = accumulators.get_mut(c.id_a) {
            acc.add(c.solid_angle_a, c.pyramid_volume_a, c.arc_length);
        }
        if let Some(acc) = accumulators.get_mut(c.id_b) {
            acc.add(c.solid_angle_b, c.pyramid_volume_b, c.arc_length);
        }
    }

    accumulators
        .iter()
        .zip(spheres)
        .enumerate()
        .filter(|(i, _)| !skip(*i))
        .filter_map(|(i, (acc, sphere))| {
            if acc.count > 0 {
                Some(acc.finish(i, sphere.r))
            } else if !has_overlaps(i) {
                Some(detached_cell(i, sphere.r))
            } else {
                None
            }
        })
        .collect()
}
