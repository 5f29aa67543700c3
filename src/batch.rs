//! Contacts of every overlapping pair in a ball set.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::cells::summarize_cells;
use crate::config::Settings;
use crate::contact::{ContactDescriptor, assemble};
use crate::error::InputError;
use crate::spatial_index::SpatialIndex;
use crate::types::{Ball, BatchSummary, ContactSummary, ContactsResult, Sphere};

/// Compute all contacts and cells of `balls`.
///
/// # Errors
/// Returns [`InputError`] for invalid settings, or for an invalid ball in strict mode.
///
/// # Example
///
/// ```
/// use voronota_contacts::{Ball, Settings, compute_contacts};
///
/// let balls = [Ball::new(0.0, 0.0, 0.0, 2.0), Ball::new(3.0, 0.0, 0.0, 2.0)];
/// let result = compute_contacts(&balls, &Settings::with_probe(0.0)).unwrap();
/// assert_eq!(result.contacts.len(), 1);
/// assert!((result.contacts[0].area - 5.4978).abs() < 1e-4);
/// ```
pub fn compute_contacts(
    balls: &[Ball],
    settings: &Settings,
) -> Result<ContactsResult, InputError> {
    Ok(ContactComputation::new(balls, settings)?.run(true))
}

/// Aggregate totals only, without keeping per-contact records.
///
/// # Errors
/// Same as [`compute_contacts`].
pub fn compute_summary(balls: &[Ball], settings: &Settings) -> Result<BatchSummary, InputError> {
    Ok(ContactComputation::new(balls, settings)?.summary())
}

/// A validated ball set with its spatial index, ready to produce contacts.
#[derive(Debug, Clone)]
pub struct ContactComputation {
    index: SpatialIndex,
    settings: Settings,
    groups: Option<Vec<usize>>,
}

impl ContactComputation {
    /// Validate `balls`, expand them by the probe and index them.
    ///
    /// In lenient mode an invalid ball is reported with a warning and kept as an
    /// excluded zero-radius sphere, so ids stay aligned with the input.
    ///
    /// # Errors
    /// Returns [`InputError`] for invalid settings, or for an invalid ball in strict mode.
    pub fn new(balls: &[Ball], settings: &Settings) -> Result<Self, InputError> {
        settings.validate()?;

        let mut spheres = Vec::with_capacity(balls.len());
        let mut excluded = Vec::with_capacity(balls.len());
        for (index, ball) in balls.iter().enumerate() {
            match checked_sphere(index, ball, settings.probe) {
                Ok(sphere) => {
                    spheres.push(sphere);
                    excluded.push(false);
                }
                Err(err) if settings.strict => return Err(err),
                Err(err) => {
                    warn!("Skipping ball: {err}");
                    spheres.push(Sphere::from_coords(0.0, 0.0, 0.0, 0.0));
                    excluded.push(true);
                }
            }
        }

        let mut index = match &settings.periodic_box {
            Some(periodic_box) => {
                debug!("Periodic box with edges {:?}", periodic_box.lengths().as_slice());
                SpatialIndex::periodic(spheres, excluded, periodic_box, settings.tolerance())
            }
            None => SpatialIndex::with_excluded(spheres, excluded, settings.tolerance()),
        };
        if settings.exclude_hidden {
            let hidden = index.exclude_hidden();
            if hidden > 0 {
                debug!("Excluded {hidden} spheres buried inside others");
            }
        }
        debug!(
            "Indexed {} spheres, cell size {:.3}, {} storage",
            index.spheres().len(),
            index.cell_size(),
            if index.is_dense() { "dense" } else { "sparse" }
        );

        Ok(Self {
            index,
            settings: settings.clone(),
            groups: None,
        })
    }

    /// Skip pairs whose spheres carry the same group label.
    ///
    /// # Errors
    /// Returns [`InputError::GroupCount`] unless there is one label per ball.
    pub fn with_groups(mut self, groups: Vec<usize>) -> Result<Self, InputError> {
        let expected = self.index.canonical_count();
        if groups.len() != expected {
            return Err(InputError::GroupCount {
                expected,
                actual: groups.len(),
            });
        }
        self.groups = Some(groups);
        Ok(self)
    }

    #[must_use]
    pub const fn index(&self) -> &SpatialIndex {
        &self.index
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    fn same_group(&self, a: usize, b: usize) -> bool {
        self.groups.as_ref().is_some_and(|g| g[a] == g[b])
    }

    /// Partners of sphere `i` that pass the group filter, so that each pair is listed once.
    ///
    /// A pair goes to its lower canonical id. A sphere touching its own periodic image
    /// is listed for one of the two opposite shifts only.
    fn partners(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.index.candidates(i).iter().copied().filter(move |&j| {
            let c = self.index.canonical_id(j);
            let forward =
                c > i || (c == i && self.index.image_shift(j).is_some_and(|s| s > [0, 0, 0]));
            forward && !self.same_group(i, c)
        })
    }

    /// Same record with periodic image ids replaced by the ids of their input balls.
    fn fold(&self, mut summary: ContactSummary) -> ContactSummary {
        summary.id_a = self.index.canonical_id(summary.id_a);
        summary.id_b = self.index.canonical_id(summary.id_b);
        summary.ensure_ids_ordered();
        summary
    }

    /// Valid contact descriptors of all pairs, ordered by `(id_a, id_b)`.
    ///
    /// Ids refer to [`Self::index`]; with a periodic box `id_b` may be an image,
    /// see [`SpatialIndex::canonical_id`].
    #[must_use]
    pub fn descriptors(&self) -> Vec<ContactDescriptor> {
        let mut descriptors: Vec<ContactDescriptor> = (0..self.index.canonical_count())
            .into_par_iter()
            .flat_map_iter(|i| {
                self.partners(i)
                    .map(move |j| assemble(&self.index, i, j, &self.settings))
            })
            .filter(|cd| cd.valid)
            .collect();
        descriptors.sort_unstable_by_key(|cd| (cd.id_a, cd.id_b));
        descriptors
    }

    /// Totals over all pairs by parallel map-reduce.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        (0..self.index.canonical_count())
            .into_par_iter()
            .map(|i| {
                self.partners(i)
                    .map(|j| assemble(&self.index, i, j, &self.settings))
                    .filter(|cd| cd.valid)
                    .fold(BatchSummary::default(), |acc, cd| acc.merge(tally(&cd)))
            })
            .reduce(BatchSummary::default, BatchSummary::merge)
    }

    /// Contacts, totals and, when requested and no grouping is set, cells.
    #[must_use]
    pub fn run(&self, with_cells: bool) -> ContactsResult {
        self.collect(&self.descriptors(), with_cells)
    }

    /// Build the result from descriptors already produced by [`Self::descriptors`].
    #[must_use]
    pub fn collect(&self, descriptors: &[ContactDescriptor], with_cells: bool) -> ContactsResult {
        let summary = descriptors
            .iter()
            .fold(BatchSummary::default(), |acc, cd| acc.merge(tally(cd)));
        let mut contacts: Vec<ContactSummary> = descriptors
            .iter()
            .map(|cd| self.fold(cd.summary()))
            .collect();
        if self.index.is_periodic() {
            contacts.sort_by_key(|c| (c.id_a, c.id_b));
        }
        info!(
            "{} contacts, total area {:.3}",
            summary.valid_count, summary.total_area
        );

        let cells = if !with_cells {
            Vec::new()
        } else if self.groups.is_some() {
            debug!("Cells are not summarized when pairs are filtered by group");
            Vec::new()
        } else {
            summarize_cells(
                &self.index.spheres()[..self.index.canonical_count()],
                &contacts,
                |i| !self.index.candidates(i).is_empty(),
                |i| self.index.is_excluded(i),
            )
        };

        ContactsResult {
            summary,
            contacts,
            cells,
        }
    }
}

fn tally(cd: &ContactDescriptor) -> BatchSummary {
    BatchSummary {
        valid_count: 1,
        total_area: cd.area,
        total_complexity: cd.complexity(),
    }
}

fn checked_sphere(index: usize, ball: &Ball, probe: f64) -> Result<Sphere, InputError> {
    for (field, value) in [("x", ball.x), ("y", ball.y), ("z", ball.z), ("r", ball.r)] {
        if !value.is_finite() {
            return Err(InputError::NonFinite {
                index,
                field,
                value,
            });
        }
    }
    let sphere = Sphere::from_ball(ball, probe);
    if sphere.r < 0.0 {
        return Err(InputError::NegativeRadius {
            index,
            radius: sphere.r,
        });
    }
    Ok(sphere)
}
