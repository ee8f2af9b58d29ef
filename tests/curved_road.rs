//! Tests on a road whose reference line is a circular arc given point by point.

mod common;

use assert_approx_eq::assert_approx_eq;
use common::{arc, RoadFile};
use crg_engine::{CurvatureMode, OptionId};
use rand::{rngs::StdRng, Rng, SeedableRng};

const RADIUS: f64 = 200.0;
const STEP: f64 = 1.0;
const CROSS_SECTIONS: usize = 151;

/// An arc turning left over 150 m, with unevenly spaced long sections.
fn curved() -> RoadFile {
    let mut road = RoadFile::new(CROSS_SECTIONS, STEP, &[-3.0, -1.0, 0.5, 2.0, 3.5], |u, v| {
        0.01 * u - 0.05 * v
    });
    road.xy = Some(arc(RADIUS, STEP, CROSS_SECTIONS));
    road.mods = "grid_nan_mode = 2\n".into();
    road
}

/// Test that the reference line follows the given points.
#[test]
fn follows_the_arc() {
    let (mut engine, ds, cp) = curved().load();
    let (inc, v_inc) = engine.increments(ds).unwrap();
    assert_approx_eq!(inc, STEP, 1e-4);
    assert!(v_inc.is_none());
    let v = engine.v_range(ds).unwrap();
    assert_eq!((v.min, v.max), (-3.0, 3.5));

    let u = 75.0 * inc;
    let angle = 75.0 * STEP / RADIUS;
    let (x, y) = engine.uv2xy(cp, u, 0.0).unwrap();
    assert_approx_eq!(x, RADIUS * angle.sin(), 1e-3);
    assert_approx_eq!(y, RADIUS * (1.0 - angle.cos()), 1e-3);

    // positive v lies towards the centre of the arc
    let (x, y) = engine.uv2xy(cp, u, 2.0).unwrap();
    assert_approx_eq!(x, (RADIUS - 2.0) * angle.sin(), 1e-3);
    assert_approx_eq!(y, RADIUS - (RADIUS - 2.0) * angle.cos(), 1e-3);
}

/// Test heading and curvature along the arc and across it.
#[test]
fn heading_and_curvature() {
    let (mut engine, ds, cp) = curved().load();
    let (inc, _) = engine.increments(ds).unwrap();

    let (phi, curv) = engine.uv2pk(cp, 60.5 * inc, 0.0).unwrap();
    assert_approx_eq!(phi, 60.5 * STEP / RADIUS, 1e-3);
    assert_approx_eq!(curv, 1.0 / RADIUS, 1e-4);

    let (_, curv) = engine.uv2pk(cp, 60.0 * inc, 3.0).unwrap();
    assert_approx_eq!(curv, 1.0 / (RADIUS - 3.0), 1e-4);

    engine
        .set_option(cp, OptionId::CurvMode, CurvatureMode::RefLine)
        .unwrap();
    let (_, curv) = engine.uv2pk(cp, 60.0 * inc, 3.0).unwrap();
    assert_approx_eq!(curv, 1.0 / RADIUS, 1e-4);

    // straight continuation beyond the end
    let (_, curv) = engine.uv2pk(cp, 200.0, 0.0).unwrap();
    assert_eq!(curv, 0.0);
}

/// Test that world and road coordinates convert back and forth.
#[test]
fn coordinates_round_trip() {
    let (mut engine, ds, cp) = curved().load();
    let range = engine.u_range(ds).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..500 {
        let u = rng.gen_range(range.min..range.max);
        let v = rng.gen_range(-3.0..3.5);
        let (x, y) = engine.uv2xy(cp, u, v).unwrap();
        let (u2, v2) = engine.xy2uv(cp, x, y).unwrap();
        assert_approx_eq!(u2, u, 1e-6);
        assert_approx_eq!(v2, v, 1e-6);
    }
}

/// Test elevations between unevenly spaced long sections.
#[test]
fn irregular_long_sections() {
    let (mut engine, _, cp) = curved().load();
    // the surface is linear, so interpolation is exact up to storage precision
    for (u, v) in [(10.0, -2.0), (40.25, 0.0), (99.5, 1.25), (120.0, 3.5), (3.0, -3.0)] {
        let expected = 0.01 * u - 0.05 * v;
        assert_approx_eq!(engine.uv2z(cp, u, v).unwrap(), expected, 1e-3);
    }
    // keep the last value across the border
    assert_approx_eq!(
        engine.uv2z(cp, 50.0, 5.0).unwrap(),
        engine.uv2z(cp, 50.0, 3.5).unwrap(),
        1e-9
    );
}
