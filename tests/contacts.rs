//! End-to-end properties of contact construction.

mod common;

use std::f64::consts::{PI, TAU};

use approx::assert_relative_eq;
use common::{jittered, lattice_balls, random_balls};
use voronota_contacts::{
    Ball, ContactsResult, InputError, PeriodicBox, Settings, SpatialIndex, Sphere, Tolerance,
    assemble, compute_contacts, compute_summary,
};

fn spheres_of(balls: &[Ball]) -> Vec<Sphere> {
    balls.iter().map(|b| Sphere::from_ball(b, 0.0)).collect()
}

/// Totals over the faces of ball `id`: area, solid angle, pyramid volume and arc length.
///
/// A contact of a ball with its own periodic image contributes both of its sides.
fn faces_of(result: &ContactsResult, id: usize) -> (f64, f64, f64, f64) {
    let mut totals = (0.0, 0.0, 0.0, 0.0);
    for c in &result.contacts {
        for (side, solid_angle, pyramid) in [
            (c.id_a, c.solid_angle_a, c.pyramid_volume_a),
            (c.id_b, c.solid_angle_b, c.pyramid_volume_b),
        ] {
            if side == id {
                totals.0 += c.area;
                totals.1 += solid_angle;
                totals.2 += pyramid;
                totals.3 += c.arc_length;
            }
        }
    }
    totals
}

fn periodic(probe: f64, min: [f64; 3], max: [f64; 3]) -> Settings {
    Settings {
        periodic_box: Some(PeriodicBox::from_corners(min, max)),
        ..Settings::with_probe(probe)
    }
}

fn assert_index_complete(spheres: Vec<Sphere>) {
    let tol = Tolerance::default();
    let index = SpatialIndex::new(spheres, tol);
    let candidates: Vec<Vec<usize>> = (0..index.spheres().len())
        .map(|i| index.candidates(i).to_vec())
        .collect();
    let spheres = index.spheres();

    let mut overlapping = 0;
    for i in 0..spheres.len() {
        for j in (i + 1)..spheres.len() {
            if tol.sphere_intersects_sphere(&spheres[i], &spheres[j]) {
                overlapping += 1;
                assert!(
                    candidates[i].contains(&j) || candidates[j].contains(&i),
                    "pair ({i}, {j}) missing from grid candidates"
                );
            }
        }
    }
    assert!(overlapping > 0);
}

#[test]
fn grid_candidates_cover_every_overlapping_pair() {
    assert_index_complete(spheres_of(&random_balls(7, 1000, 15.0, (0.5, 2.5))));
}

#[test]
fn sparse_grid_candidates_cover_every_overlapping_pair() {
    // A few tight clusters far apart leave the bounding grid mostly empty.
    let mut balls = Vec::new();
    for (k, offset) in [-900.0, 0.0, 700.0].into_iter().enumerate() {
        balls.extend(
            random_balls(100 + k as u64, 200, 6.0, (0.8, 2.0))
                .into_iter()
                .map(|b| Ball::new(b.x + offset, b.y - offset, b.z, b.r)),
        );
    }
    let spheres = spheres_of(&balls);
    assert!(!SpatialIndex::new(spheres.clone(), Tolerance::default()).is_dense());
    assert_index_complete(spheres);
}

#[test]
fn two_spheres_without_neighbors() {
    let balls = [Ball::new(0.0, 0.0, 0.0, 2.0), Ball::new(3.0, 0.0, 0.0, 2.0)];
    let result = compute_contacts(&balls, &Settings::with_probe(0.0)).unwrap();

    assert_eq!(result.contacts.len(), 1);
    let contact = &result.contacts[0];
    let radius = (4.0_f64 - 2.25).sqrt();
    assert_relative_eq!(radius, 1.3229, epsilon = 1e-4);
    assert_relative_eq!(contact.area, PI * radius * radius, epsilon = 1e-10);
    assert_relative_eq!(contact.area, 5.4978, epsilon = 1e-4);
    assert_relative_eq!(contact.arc_length, TAU * radius, epsilon = 1e-10);
}

#[test]
fn third_sphere_reduces_patch() {
    let spheres = vec![
        Sphere::from_coords(0.0, 0.0, 0.0, 2.0),
        Sphere::from_coords(3.0, 0.0, 0.0, 2.0),
        Sphere::from_coords(1.5, 1.0, 0.0, 2.0),
    ];
    let index = SpatialIndex::new(spheres, Tolerance::default());
    let cd = assemble(&index, 0, 1, &Settings::default());

    assert!(cd.valid);
    assert!(cd.area > 0.0 && cd.area < 5.4978);
    assert!(cd.sum_of_arc_angles < TAU);
}

#[test]
fn swapping_pair_members_mirrors_descriptor() {
    let balls = random_balls(11, 150, 7.0, (1.0, 2.2));
    let index = SpatialIndex::new(spheres_of(&balls), Tolerance::default());
    let settings = Settings::with_probe(0.0);

    let mut compared = 0;
    for a in 0..index.spheres().len() {
        for b in index.candidates(a).iter().copied().filter(|&b| b > a) {
            let ab = assemble(&index, a, b, &settings);
            let ba = assemble(&index, b, a, &settings);
            if ab.valid != ba.valid {
                assert!(ab.area.max(ba.area) < 1e-6, "pair ({a}, {b}) validity differs");
                continue;
            }
            if !ab.valid {
                continue;
            }
            compared += 1;
            assert_relative_eq!(ab.area, ba.area, epsilon = 1e-7, max_relative = 1e-6);
            assert_relative_eq!(ab.circle.center, ba.circle.center, epsilon = 1e-9);
            assert_relative_eq!(ab.circle.radius, ba.circle.radius, epsilon = 1e-9);
            assert_relative_eq!(ab.circle.axis, -ba.circle.axis, epsilon = 1e-9);
            assert_relative_eq!(ab.solid_angle_a, ba.solid_angle_b, epsilon = 1e-6);
            assert_relative_eq!(ab.solid_angle_b, ba.solid_angle_a, epsilon = 1e-6);
        }
    }
    assert!(compared > 100);
}

#[test]
fn patches_stay_inside_their_circles() {
    let balls = random_balls(3, 300, 8.0, (1.0, 2.0));
    let result = compute_contacts(&balls, &Settings::with_probe(0.5)).unwrap();
    assert!(!result.contacts.is_empty());

    for contact in &result.contacts {
        assert!(contact.id_a < contact.id_b);
        let a = &balls[contact.id_a];
        let b = &balls[contact.id_b];
        let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt();
        let (ra, rb) = (a.r + 0.5, b.r + 0.5);
        let h = (d * d + ra * ra - rb * rb) / (2.0 * d);
        let circle_radius = (ra * ra - h * h).sqrt();
        assert!(contact.area > 0.0);
        assert!(contact.area <= PI * circle_radius * circle_radius + 1e-9);
        assert!(contact.arc_length <= TAU * circle_radius + 1e-9);
    }
}

#[test]
fn summary_entry_point_agrees_with_contacts() {
    let balls = random_balls(5, 200, 7.0, (1.0, 2.0));
    let settings = Settings::with_probe(0.7);
    let result = compute_contacts(&balls, &settings).unwrap();
    let summary = compute_summary(&balls, &settings).unwrap();

    assert_eq!(summary.valid_count, result.contacts.len());
    assert_eq!(summary.total_complexity, result.summary.total_complexity);
    assert_relative_eq!(
        summary.total_area,
        result.contacts.iter().map(|c| c.area).sum::<f64>(),
        epsilon = 1e-8,
        max_relative = 1e-12
    );
}

#[test]
fn isolated_ball_cell_is_whole_sphere() {
    let balls = [Ball::new(0.0, 0.0, 0.0, 1.5), Ball::new(20.0, 0.0, 0.0, 1.0)];
    let result = compute_contacts(&balls, &Settings::default()).unwrap();

    assert!(result.contacts.is_empty());
    assert_eq!(result.cells.len(), 2);
    let r = 1.5 + 1.4;
    assert_relative_eq!(result.cells[0].sas_area, 4.0 * PI * r * r, epsilon = 1e-9);
    assert_relative_eq!(result.cells[0].volume, 4.0 / 3.0 * PI * r * r * r, epsilon = 1e-9);
}

#[test]
fn cells_are_bounded_by_their_spheres() {
    let balls = random_balls(9, 120, 6.0, (1.2, 1.8));
    let probe = 1.0;
    let result = compute_contacts(&balls, &Settings::with_probe(probe)).unwrap();
    assert!(!result.cells.is_empty());

    for cell in &result.cells {
        let r = balls[cell.index].r + probe;
        assert!(cell.sas_area >= -1e-6);
        assert!(cell.sas_area <= 4.0 * PI * r * r + 1e-9);
        assert!(cell.volume <= 4.0 / 3.0 * PI * r * r * r + 1e-9);
    }
    assert!(result.total_sas_area() > 0.0);
}

#[test]
fn strict_mode_reports_offending_ball() {
    let mut balls = random_balls(1, 10, 3.0, (1.0, 1.5));
    balls[4].r = f64::INFINITY;
    let strict = Settings {
        strict: true,
        ..Settings::default()
    };

    let err = compute_contacts(&balls, &strict).unwrap_err();
    assert!(matches!(err, InputError::NonFinite { index: 4, field: "r", .. }));
    assert_eq!(err.to_string(), "ball 4 has a non-finite r: inf");

    let lenient = compute_contacts(&balls, &Settings::default()).unwrap();
    assert!(lenient.contacts.iter().all(|c| c.id_a != 4 && c.id_b != 4));
}

#[test]
fn pairs_far_from_origin_still_touch() {
    for x in [-1e10, 1e10] {
        let balls = [Ball::new(x, 0.0, 0.0, 1.0), Ball::new(x + 1.0, 0.0, 0.0, 1.0)];
        let result = compute_contacts(&balls, &Settings::with_probe(0.0)).unwrap();
        assert_eq!(result.contacts.len(), 1, "x = {x}");
        assert_relative_eq!(result.contacts[0].area, 0.75 * PI, max_relative = 1e-4);
    }

    let scattered = [
        Ball::new(-1e10, 0.0, 0.0, 1.0),
        Ball::new(1e10, 0.0, 0.0, 1.0),
        Ball::new(1e10, 1.5, 0.0, 1.0),
    ];
    let result = compute_contacts(&scattered, &Settings::with_probe(0.0)).unwrap();
    assert_eq!(result.contacts.len(), 1);
    assert_eq!((result.contacts[0].id_a, result.contacts[0].id_b), (1, 2));
}

#[test]
fn buried_lattice_ball_is_closed_cube() {
    // Spacing 2 and radius 2: the cell of the center ball is the cube [3, 5]³.
    let balls = lattice_balls(5, 2.0, 2.0);
    let center = (2 * 5 + 2) * 5 + 2;
    assert_relative_eq!(balls[center].x, 4.0);
    let result = compute_contacts(&balls, &Settings::with_probe(0.0)).unwrap();

    let (area, solid_angle, pyramid, _) = faces_of(&result, center);
    assert_relative_eq!(area, 24.0, epsilon = 1e-9);
    assert_relative_eq!(solid_angle, 4.0 * PI, epsilon = 1e-9);
    assert_relative_eq!(pyramid, 8.0, epsilon = 1e-9);

    let cell = result.cells.iter().find(|c| c.index == center).unwrap();
    assert_relative_eq!(cell.sas_area, 0.0, epsilon = 1e-9);
    assert_relative_eq!(cell.volume, 8.0, epsilon = 1e-9);
}

#[test]
fn closed_cells_of_jittered_cloud_span_full_solid_angle() {
    let balls = jittered(&lattice_balls(6, 2.0, 2.5), 17, 0.3);
    let result = compute_contacts(&balls, &Settings::with_probe(0.0)).unwrap();

    let mut closed = 0;
    for id in 0..balls.len() {
        let (area, solid_angle, pyramid, arc) = faces_of(&result, id);
        if area <= 0.0 || arc > 1e-12 {
            continue;
        }
        closed += 1;
        assert_relative_eq!(solid_angle, 4.0 * PI, epsilon = 1e-8);
        let cell = result.cells.iter().find(|c| c.index == id).unwrap();
        assert_relative_eq!(cell.sas_area, 0.0, epsilon = 1e-8);
        assert_relative_eq!(cell.volume, pyramid, epsilon = 1e-8);
    }
    // At least the 4x4x4 interior is enclosed by neighbors.
    assert!(closed >= 64, "only {closed} closed cells");
}

#[test]
fn periodic_contact_across_box_face() {
    let balls = [Ball::new(0.5, 5.0, 5.0, 1.5), Ball::new(9.5, 5.0, 5.0, 1.5)];
    assert!(
        compute_contacts(&balls, &Settings::with_probe(0.0))
            .unwrap()
            .contacts
            .is_empty()
    );

    let result = compute_contacts(&balls, &periodic(0.0, [0.0; 3], [10.0; 3])).unwrap();
    assert_eq!(result.contacts.len(), 1);
    let contact = &result.contacts[0];
    assert_eq!((contact.id_a, contact.id_b), (0, 1));
    assert_relative_eq!(contact.area, 2.0 * PI, epsilon = 1e-10);
    assert_relative_eq!(contact.arc_length, TAU * 2.0_f64.sqrt(), epsilon = 1e-10);
    assert_relative_eq!(contact.distance, 1.0, epsilon = 1e-12);

    // Each ball loses a cap with cos θ = 1/3.
    assert_eq!(result.cells.len(), 2);
    for cell in &result.cells {
        assert_relative_eq!(cell.sas_area, 6.0 * PI, epsilon = 1e-9);
    }
}

#[test]
fn periodic_ball_touches_its_own_images() {
    // Box edge 3, radius 2: the six face images cut equal caps.
    let balls = [Ball::new(1.5, 1.5, 1.5, 2.0)];
    let result = compute_contacts(&balls, &periodic(0.0, [0.0; 3], [3.0; 3])).unwrap();

    assert_eq!(result.contacts.len(), 3);
    for contact in &result.contacts {
        assert_eq!((contact.id_a, contact.id_b), (0, 0));
        assert_relative_eq!(contact.area, 1.75 * PI, epsilon = 1e-10);
        assert!(contact.central);
    }
    assert_eq!(result.summary.valid_count, 3);

    let [cell] = result.cells.as_slice() else {
        panic!("expected one cell, got {:?}", result.cells);
    };
    assert_relative_eq!(cell.sas_area, 4.0 * PI, epsilon = 1e-9);
    assert_relative_eq!(cell.volume, 95.0 * PI / 12.0, epsilon = 1e-9);
}

#[test]
fn periodic_ball_filling_its_box() {
    let balls = [Ball::new(1.0, 1.0, 1.0, 2.0)];
    let result = compute_contacts(&balls, &periodic(0.0, [0.0; 3], [2.0; 3])).unwrap();

    let faces: Vec<_> = result.contacts.iter().filter(|c| c.area > 1e-9).collect();
    assert_eq!(faces.len(), 3);
    assert!(result.contacts.iter().all(|c| (c.id_a, c.id_b) == (0, 0)));
    let (area, solid_angle, _, _) = faces_of(&result, 0);
    assert_relative_eq!(area, 24.0, epsilon = 1e-9);
    assert_relative_eq!(solid_angle, 4.0 * PI, epsilon = 1e-9);

    assert_eq!(result.cells.len(), 1);
    assert_relative_eq!(result.cells[0].sas_area, 0.0, epsilon = 1e-9);
    assert_relative_eq!(result.cells[0].volume, 8.0, epsilon = 1e-9);
}

#[test]
fn periodic_cells_tile_the_box() {
    let balls = jittered(&lattice_balls(4, 2.0, 2.5), 23, 0.3);
    let settings = periodic(0.0, [-1.0; 3], [7.0; 3]);
    let result = compute_contacts(&balls, &settings).unwrap();

    assert_eq!(result.cells.len(), balls.len());
    assert!(result.contacts.iter().all(|c| c.id_a <= c.id_b && c.id_b < balls.len()));
    assert_relative_eq!(result.total_sas_area(), 0.0, epsilon = 1e-6);
    assert_relative_eq!(result.total_volume(), 512.0, epsilon = 1e-6);

    let summary = compute_summary(&balls, &settings).unwrap();
    assert_eq!(summary.valid_count, result.contacts.len());
    assert_relative_eq!(summary.total_area, result.summary.total_area, epsilon = 1e-9);
}
