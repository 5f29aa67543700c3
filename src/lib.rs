//! Contact patches between overlapping spheres, after voronota-lt.
//!
//! For every pair of overlapping spheres (atoms expanded by a solvent probe) the
//! library computes the face the two share in the radical Voronoi tessellation,
//! without building the tessellation itself. Each face starts as the disk where the
//! two sphere surfaces meet and is clipped by the radical planes of all neighbors.
//! Faces carry their area, the solid angle they subtend at each sphere center and the
//! signed volume of the cone they bound, from which per-sphere exposed surface areas
//! and volumes follow.
//!
//! With [`Settings::periodic_box`] set, the input is one cell of a periodic lattice
//! and contacts across box faces are reported between the input spheres.
//!
//! # Example
//!
//! ```
//! use voronota_contacts::{Ball, Settings, compute_contacts};
//!
//! let balls = vec![
//!     Ball::new(0.0, 0.0, 0.0, 1.5),
//!     Ball::new(3.0, 0.0, 0.0, 1.5),
//!     Ball::new(1.5, 2.5, 0.0, 1.5),
//! ];
//!
//! let result = compute_contacts(&balls, &Settings::default()).unwrap();
//!
//! for contact in &result.contacts {
//!     println!("Contact {}-{}: area={:.2}", contact.id_a, contact.id_b, contact.area);
//! }
//!
//! for cell in &result.cells {
//!     println!("Cell {}: SAS area={:.2}, volume={:.2}", cell.index, cell.sas_area, cell.volume);
//! }
//! ```

mod batch;
mod cells;
pub mod config;
pub mod contact;
pub mod contour;
pub mod error;
pub mod geometry;
pub mod graphics;
pub mod input;
pub mod spatial_index;
mod types;

pub use batch::{ContactComputation, compute_contacts, compute_summary};
pub use cells::summarize_cells;
pub use config::Settings;
pub use contact::{ContactDescriptor, assemble};
pub use error::InputError;
pub use geometry::Tolerance;
pub use spatial_index::SpatialIndex;
pub use types::{
    Ball, BatchSummary, Cell, ContactSummary, ContactsResult, IntersectionCircle, PeriodicBox,
    Sphere,
};
