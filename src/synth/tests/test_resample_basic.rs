use std::f64::consts::{FRAC_PI_3, FRAC_PI_6, PI, TAU};

use crate::geom::{Point3, Tolerance};
use crate::synth::{
    RayCaster, ResampleOptions, Resampling, SamplerOptions, SynthError, resample_curve,
    resample_node, resample_sheet,
};
use crate::synth::sampler::PlaneSide;

use super::fixtures::{box_index, curve_box, flat_sheet, loose_bbox, sheet_slab, z_curve};

fn small_options() -> ResampleOptions {
    ResampleOptions {
        time_res: 5,
        theta_res: 8,
        phi_res: 4,
        u_res: 4,
        v_res: 3,
        ..ResampleOptions::default()
    }
}

fn close(a: Point3, b: Point3) -> bool {
    Tolerance::LOOSE.approx_eq_point3(a, b)
}

#[test]
fn curve_resampling_has_a_cylinder_and_two_caps() {
    let (min, max) = curve_box();
    let index = box_index(min, max);
    let caster = RayCaster::new(&index);
    let node = z_curve(0, 2.0);

    let curve = resample_curve(&node, &caster, 5, 8, 4, &SamplerOptions::default())
        .expect("curve resampling");
    assert_eq!((curve.cylinder.rows(), curve.cylinder.cols()), (5, 8));
    assert_eq!((curve.start_cap.rows(), curve.start_cap.cols()), (4, 8));
    assert_eq!((curve.end_cap.rows(), curve.end_cap.cols()), (4, 8));
    // 40 cylinder rays, then 1 + 3 * 8 per cap.
    assert_eq!(curve.stats.rays_cast, 40 + 2 * 25);
    assert_eq!(curve.stats.misses, 0);

    let bounds = loose_bbox(curve_box());
    for grid in [&curve.cylinder, &curve.start_cap, &curve.end_cap] {
        assert!(grid.positions().all(|p| bounds.contains_point(p)));
    }

    let start_pole = curve.start_cap.get(0, 0).expect("start pole").position;
    let end_pole = curve.end_cap.get(0, 0).expect("end pole").position;
    assert!(close(start_pole, Point3::new(0.0, 0.0, -1.0)));
    assert!(close(end_pole, Point3::new(0.0, 0.0, 3.0)));
    assert!(curve.start_cap.row(0).expect("pole row").iter().all(|s| s.position == start_pole));
}

#[test]
fn cap_columns_follow_the_cylinder_seam() {
    let (min, max) = curve_box();
    let index = box_index(min, max);
    let caster = RayCaster::new(&index);
    let curve = resample_curve(&z_curve(0, 2.0), &caster, 5, 8, 4, &SamplerOptions::default())
        .expect("curve resampling");

    for j in 0..8 {
        let azimuth = curve.end_cap.get(1, j).expect("cap").u;
        let angle = curve.cylinder.get(0, j).expect("ring").v;
        assert!((azimuth - angle).abs() < 1e-12);
        assert!((angle - TAU * j as f64 / 8.0).abs() < 1e-12);
    }

    // The seam starts along -x, so ring column 2 points along -y. The end
    // cap agrees on the same column; the start cap turns the other way and
    // meets it at column 6.
    let ring = curve.cylinder.get(0, 2).expect("ring").position;
    let end = curve.end_cap.get(1, 2).expect("end").position;
    let start_same = curve.start_cap.get(1, 2).expect("start").position;
    let start_mirrored = curve.start_cap.get(1, 6).expect("start").position;
    assert!(ring.y < -0.9);
    assert!(end.y < 0.0);
    assert!(start_same.y > 0.0);
    assert!(start_mirrored.y < 0.0);
}

#[test]
fn wrong_kind_is_reported_as_degenerate() {
    let (min, max) = sheet_slab();
    let index = box_index(min, max);
    let caster = RayCaster::new(&index);
    let options = SamplerOptions::default();

    let sheet = flat_sheet(1, 2.0);
    let curve = z_curve(0, 2.0);
    assert!(matches!(
        resample_curve(&sheet, &caster, 5, 8, 4, &options),
        Err(SynthError::DegenerateGrid(_))
    ));
    assert!(matches!(
        resample_sheet(&curve, &caster, 4, 3, 8, 4, &options),
        Err(SynthError::DegenerateGrid(_))
    ));
}

#[test]
fn sheet_resampling_surrounds_the_patch() {
    let (min, max) = sheet_slab();
    let index = box_index(min, max);
    let caster = RayCaster::new(&index);

    let sheet = resample_sheet(&flat_sheet(1, 2.0), &caster, 4, 3, 6, 3, &SamplerOptions::default())
        .expect("sheet resampling");

    let sides: Vec<PlaneSide> = sheet.planes.iter().map(|plane| plane.side).collect();
    assert_eq!(sides, vec![PlaneSide::Front, PlaneSide::Back]);
    assert!(sheet.planes.iter().all(|plane| (plane.grid.rows(), plane.grid.cols()) == (4, 3)));

    let edge_sizes: Vec<(usize, usize)> = sheet.edges.iter().map(|e| (e.rows(), e.cols())).collect();
    assert_eq!(edge_sizes, vec![(4, 5), (3, 5), (4, 5), (3, 5)]);
    assert_eq!(sheet.corners.len(), 4);
    assert!(sheet.corners.iter().all(|c| (c.rows(), c.cols()) == (2, 5)));

    // Planes 2 * 12, edges 14 * 5, corners 4 * 2 * 5: the plane samples are
    // never cast twice.
    assert_eq!(sheet.stats.rays_cast, 24 + 70 + 40);
    assert_eq!(sheet.stats.misses, 0);

    // Strips start one step past the sheet normal.
    let first = sheet.edges[0].get(0, 0).expect("edge").position;
    assert!(close(first, Point3::new(0.0, -0.5 * (PI / 6.0).tan(), 0.5)));

    // The bottom edge bulges towards -y.
    let outward = sheet.edges[0].get(1, 2).expect("edge").position;
    assert!(close(outward, Point3::new(2.0 / 3.0, -1.0, 0.0)));

    // The lune at (2, 0) opens a quarter turn from -y towards +x.
    let meridian = sheet.corners[0].get(0, 2).expect("corner");
    assert!((meridian.u - FRAC_PI_6).abs() < 1e-9);
    assert!(meridian.position.x > 2.0);
    assert!((meridian.position.y + 1.0).abs() < 1e-9);
    let last = sheet.corners[0].get(1, 0).expect("corner");
    assert!((last.u - FRAC_PI_3).abs() < 1e-9);

    let bounds = loose_bbox(sheet_slab());
    assert!(sheet.edges.iter().all(|e| e.positions().all(|p| bounds.contains_point(p))));
    assert!(sheet.corners.iter().all(|c| c.positions().all(|p| bounds.contains_point(p))));
}

#[test]
fn sheet_rim_needs_three_angular_steps() {
    let (min, max) = sheet_slab();
    let index = box_index(min, max);
    let caster = RayCaster::new(&index);

    let result = resample_sheet(&flat_sheet(1, 2.0), &caster, 4, 3, 2, 3, &SamplerOptions::default());
    assert!(matches!(result, Err(SynthError::DegenerateGrid(_))));
}

#[test]
fn resample_node_dispatches_on_kind() {
    let (min, max) = curve_box();
    let index = box_index(min, max);
    let caster = RayCaster::new(&index);

    let resampled = resample_node(&z_curve(0, 2.0), &caster, &small_options()).expect("resample");
    let Resampling::Curve(curve) = &resampled else {
        panic!("expected a curve resampling");
    };
    assert_eq!(curve.cylinder.rows(), 5);
    assert_eq!(resampled.stats(), curve.stats);
}

#[test]
fn time_resolution_grows_with_elongation() {
    let short = z_curve(0, 2.0);
    assert_eq!(ResampleOptions::for_nodes(&short, &z_curve(1, 2.0)).time_res, 20);
    assert_eq!(ResampleOptions::for_nodes(&short, &z_curve(1, 8.0)).time_res, 40);
    assert_eq!(ResampleOptions::for_nodes(&z_curve(1, 8.0), &short).time_res, 40);
    assert_eq!(ResampleOptions::for_nodes(&short, &z_curve(1, 2000.0)).time_res, 80);
}
