//! Tests on straight roads, driven through the engine's public interface.

mod common;

use assert_approx_eq::assert_approx_eq;
use common::RoadFile;
use crg_engine::{BorderMode, CrgError, OptionId, Value, ValueKind};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A wavy surface, kept in place by an explicit modifiers section.
fn wavy() -> RoadFile {
    let mut road = RoadFile::straight(|u, v| 0.05 * (0.3 * u).sin() + 0.02 * v + 0.001 * u * v);
    road.mods = "grid_nan_mode = 2\n".into();
    road
}

/// Test the documented behaviour of a flat 100 m by 8 m road.
#[test]
fn concrete_scenario() {
    let (mut engine, _, cp) = RoadFile::straight(|_, _| 0.0).load();

    let (x, y) = engine.uv2xy(cp, 50.0, 0.0).unwrap();
    assert_approx_eq!(x, 50.0);
    assert_approx_eq!(y, 0.0);
    assert_approx_eq!(engine.uv2z(cp, 50.0, 0.0).unwrap(), 0.0);
    let (phi, curv) = engine.uv2pk(cp, 50.0, 0.0).unwrap();
    assert_approx_eq!(phi, 0.0);
    assert_approx_eq!(curv, 0.0);
    let (u, v) = engine.xy2uv(cp, 50.0, 4.0).unwrap();
    assert_approx_eq!(u, 50.0);
    assert_approx_eq!(v, 4.0);

    engine
        .set_option(cp, OptionId::BorderModeU, BorderMode::ExtrapolateZero)
        .unwrap();
    engine.set_option(cp, OptionId::BorderOffsetU, -1.0).unwrap();
    assert_eq!(engine.uv2z(cp, 150.0, 0.0).unwrap(), -1.0);
}

/// Test that grid nodes are reproduced exactly, whatever the border mode.
#[test]
fn grid_nodes_are_exact() {
    let road = wavy();
    let (mut engine, ds, cp) = road.load();
    let rows = engine.data_set(ds).unwrap().z_rows().to_vec();
    for mode in [
        BorderMode::ExtrapolateZero,
        BorderMode::ExtrapolateKeep,
        BorderMode::Repeat,
        BorderMode::Reflect,
    ] {
        engine.set_option(cp, OptionId::BorderModeU, mode).unwrap();
        engine.set_option(cp, OptionId::BorderModeV, mode).unwrap();
        for iu in (0..=100).step_by(7) {
            for (iv, row) in rows.iter().enumerate() {
                let v = -4.0 + 2.0 * iv as f64;
                let z = engine.uv2z(cp, iu as f64, v).unwrap();
                assert_approx_eq!(z, row.get(iu), 1e-12);
                assert_approx_eq!(z, road.z[iu][iv], 1e-6);
            }
        }
    }
}

/// Test the laws of the periodic and mirrored border modes.
#[test]
fn border_mode_laws() {
    let (mut engine, _, cp) = wavy().load();
    let mut rng = StdRng::seed_from_u64(7);

    engine.set_option(cp, OptionId::BorderModeU, BorderMode::Repeat).unwrap();
    for _ in 0..200 {
        let u = rng.gen_range(0.0..100.0);
        let v = rng.gen_range(-4.0..4.0);
        let k = rng.gen_range(-3..=3) as f64;
        let z = engine.uv2z(cp, u, v).unwrap();
        assert_approx_eq!(engine.uv2z(cp, u + 100.0 * k, v).unwrap(), z, 1e-9);
    }

    engine.set_option(cp, OptionId::BorderModeU, BorderMode::Reflect).unwrap();
    engine.set_option(cp, OptionId::BorderModeV, BorderMode::Reflect).unwrap();
    for _ in 0..200 {
        let d = rng.gen_range(0.0..8.0);
        let u = rng.gen_range(0.0..100.0);
        let v = rng.gen_range(-4.0..4.0);
        assert_approx_eq!(
            engine.uv2z(cp, -d, v).unwrap(),
            engine.uv2z(cp, d, v).unwrap(),
            1e-9
        );
        assert_approx_eq!(
            engine.uv2z(cp, 100.0 + d, v).unwrap(),
            engine.uv2z(cp, 100.0 - d, v).unwrap(),
            1e-9
        );
        assert_approx_eq!(
            engine.uv2z(cp, u, 4.0 + d).unwrap(),
            engine.uv2z(cp, u, 4.0 - d).unwrap(),
            1e-9
        );
    }

    // the laws hold inside the smoothing zones too
    engine.set_option(cp, OptionId::SmoothUBegin, 10.0).unwrap();
    engine.set_option(cp, OptionId::SmoothUEnd, 10.0).unwrap();
    for _ in 0..100 {
        let d = rng.gen_range(0.0..10.0);
        let v = rng.gen_range(-4.0..4.0);
        assert_approx_eq!(
            engine.uv2z(cp, -d, v).unwrap(),
            engine.uv2z(cp, d, v).unwrap(),
            1e-9
        );
        assert_approx_eq!(
            engine.uv2z(cp, 100.0 + d, v).unwrap(),
            engine.uv2z(cp, 100.0 - d, v).unwrap(),
            1e-9
        );
    }
    engine.set_option(cp, OptionId::BorderModeU, BorderMode::Repeat).unwrap();
    for _ in 0..100 {
        let u = rng.gen_range(0.0..10.0);
        let v = rng.gen_range(-4.0..4.0);
        let z = engine.uv2z(cp, u, v).unwrap();
        assert_approx_eq!(engine.uv2z(cp, u - 100.0, v).unwrap(), z, 1e-9);
        assert_approx_eq!(
            engine.uv2z(cp, 300.0 - u, v).unwrap(),
            engine.uv2z(cp, 100.0 - u, v).unwrap(),
            1e-9
        );
    }
    engine.remove_option(cp, OptionId::SmoothUBegin).unwrap();
    engine.remove_option(cp, OptionId::SmoothUEnd).unwrap();

    engine
        .set_option(cp, OptionId::BorderModeU, BorderMode::ExtrapolateZero)
        .unwrap();
    engine
        .set_option(cp, OptionId::BorderModeV, BorderMode::ExtrapolateZero)
        .unwrap();
    engine.set_option(cp, OptionId::BorderOffsetU, 0.75).unwrap();
    engine.set_option(cp, OptionId::BorderOffsetV, -0.5).unwrap();
    assert_eq!(engine.uv2z(cp, -12.0, 1.0).unwrap(), 0.75);
    assert_eq!(engine.uv2z(cp, 50.0, 9.0).unwrap(), -0.5);

    engine.set_option(cp, OptionId::BorderModeU, BorderMode::None).unwrap();
    assert!(matches!(
        engine.uv2z(cp, 101.0, 0.0),
        Err(CrgError::OutOfRange { axis: 'u', .. })
    ));
}

/// Test that the search history changes nothing but the speed of a query.
#[test]
fn history_is_transparent() {
    let (mut engine, ds, cached) = wavy().load();
    let fresh = engine.create_contact_point(ds).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let (mut x, mut y) = (0.0, 0.0);
    for _ in 0..300 {
        x = (x + rng.gen_range(-0.5..2.0f64)).clamp(-5.0, 105.0);
        y = (y + rng.gen_range(-0.3..0.3f64)).clamp(-4.0, 4.0);
        let expected = engine.xy2uv(cached, x, y).unwrap();
        engine.set_history(fresh, 0).unwrap();
        let (u, v) = engine.xy2uv(fresh, x, y).unwrap();
        assert_approx_eq!(u, expected.0, 1e-9);
        assert_approx_eq!(v, expected.1, 1e-9);
        assert_approx_eq!(
            engine.xy2z(fresh, x, y).unwrap(),
            engine.xy2z(cached, x, y).unwrap(),
            1e-9
        );
    }
}

/// Test that world and road coordinates convert back and forth.
#[test]
fn coordinates_round_trip() {
    let (mut engine, _, cp) = wavy().load();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let u = rng.gen_range(-20.0..120.0);
        let v = rng.gen_range(-6.0..6.0);
        let (x, y) = engine.uv2xy(cp, u, v).unwrap();
        let (u2, v2) = engine.xy2uv(cp, x, y).unwrap();
        assert_approx_eq!(u2, u, 1e-6);
        assert_approx_eq!(v2, v, 1e-6);
    }
}

/// Test that an option cannot be read or written as the wrong kind of value.
#[test]
fn option_type_safety() {
    let (mut engine, _, cp) = wavy().load();
    engine.set_option(cp, OptionId::BorderOffsetU, 0.5).unwrap();

    let options = engine.contact_point(cp).unwrap().options();
    assert!(matches!(
        options.get_int(OptionId::BorderOffsetU),
        Err(CrgError::TypeMismatch {
            expected: ValueKind::Double,
            ..
        })
    ));
    assert_eq!(options.get_double(OptionId::BorderOffsetU).unwrap(), Some(0.5));

    assert!(engine.set_option(cp, OptionId::BorderOffsetU, 3).is_err());
    assert!(engine.set_option(cp, OptionId::BorderModeU, 2.0).is_err());
    assert_eq!(
        engine.get_option(cp, OptionId::BorderOffsetU).unwrap(),
        Some(Value::Double(0.5))
    );
}

/// Test that a data set outlives the contact points bound to it.
#[test]
fn release_order() {
    let (mut engine, ds, cp) = wavy().load();
    assert!(matches!(
        engine.release_data_set(ds),
        Err(CrgError::DataSetInUse(1))
    ));
    engine.delete_contact_point(cp).unwrap();
    assert!(matches!(
        engine.uv2z(cp, 0.0, 0.0),
        Err(CrgError::UnknownContactPoint)
    ));
    engine.release_data_set(ds).unwrap();
    assert!(matches!(
        engine.create_contact_point(ds),
        Err(CrgError::UnknownDataSet)
    ));
}

/// Test that a vehicle creeping along the road keeps hitting its history.
#[test]
fn history_hits_are_counted() {
    let (mut engine, _, cp) = wavy().load();
    engine.activate_stats(cp).unwrap();
    for i in 0..100 {
        engine.xy2z(cp, 20.0 + 0.1 * i as f64, 1.5).unwrap();
    }
    let stats = engine.stats(cp).unwrap().unwrap();
    assert_eq!(stats.search.queries, 100);
    assert_eq!(stats.search.misses, 1);
    assert_eq!(stats.search.close_hits, 99);
    assert_eq!(stats.eval.queries, 100);
    assert_eq!(stats.eval.border_u + stats.eval.border_v, 0);
    engine.log_history(cp, 30.0, 1.5).unwrap();

    // a jump across the road is a miss again
    engine.xy2uv(cp, 80.0, -2.0).unwrap();
    let stats = engine.stats(cp).unwrap().unwrap();
    assert_eq!(stats.search.misses, 2);
}
