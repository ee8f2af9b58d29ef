use crate::dataset::DataSet;
use crate::error::Result;
use crate::options::{CurvatureMode, Options};

/// Largest magnitude of a reported curvature.
const CURVATURE_LIMIT: f64 = 1.0e10; // 1/m

/// Evaluates the heading and curvature at reference-line coordinates.
///
/// The heading is that of the reference-line segment containing `u`, or the
/// end heading beyond either end. In lateral curvature mode the curvature is
/// that of the curve running parallel to the reference line at offset `v`.
pub(crate) fn uv2pk(ds: &DataSet, options: &Options, u: f64, v: f64) -> Result<(f64, f64)> {
    if u.is_nan() || v.is_nan() {
        return Ok((f64::NAN, f64::NAN));
    }
    let n = ds.cross_sections();
    let range = ds.u_range();
    let mut u = u;

    let (phi, curv) = match ds.closed_range(options) {
        Some(closed) if closed.wrap(u) > range.max => {
            let gap = ds.point(0) - ds.point(n - 1);
            let phi = if gap.x == 0.0 && gap.y == 0.0 {
                ds.util.phi_last_sin.atan2(ds.util.phi_last_cos)
            } else {
                gap.y.atan2(gap.x)
            };
            (phi, 0.0)
        }
        Some(closed) => {
            u = closed.wrap(u);
            heading_and_curvature(ds, u)
        }
        None if u < range.min => (ds.util.phi_first_sin.atan2(ds.util.phi_first_cos), 0.0),
        None if u > range.max => (ds.util.phi_last_sin.atan2(ds.util.phi_last_cos), 0.0),
        None => heading_and_curvature(ds, u),
    };

    let curv = match options.curvature_mode() {
        CurvatureMode::RefLine => curv,
        CurvatureMode::Lateral if curv == 0.0 => 0.0,
        CurvatureMode::Lateral => {
            let radius = 1.0 / curv - v;
            if radius == 0.0 {
                CURVATURE_LIMIT.copysign(curv)
            } else {
                (1.0 / radius).clamp(-CURVATURE_LIMIT, CURVATURE_LIMIT)
            }
        }
    };
    Ok((phi, curv))
}

fn heading_and_curvature(ds: &DataSet, u: f64) -> (f64, f64) {
    let (index, f) = ds.locate_u(u);
    let node = if f < 0.5 { index } else { index + 1 };
    (ds.phi.get(index + 1), ds.curvature_at(node))
}

#[cfg(test)]
mod test {
    use super::uv2pk;
    use crate::fixtures::{flat_road, FlatRoad};
    use crate::options::{CurvatureMode, OptionId};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn straight_road_is_flat() {
        let ds = flat_road(&FlatRoad::default());
        let (phi, curv) = uv2pk(&ds, ds.options(), 50.0, 0.0).unwrap();
        assert_approx_eq!(phi, 0.0);
        assert_approx_eq!(curv, 0.0);
        let (phi, curv) = uv2pk(&ds, ds.options(), 150.0, 3.0).unwrap();
        assert_approx_eq!(phi, 0.0);
        assert_approx_eq!(curv, 0.0);
    }

    #[test]
    fn constant_curvature() {
        // heading grows by 0.001 rad per metre: radius 1000 m
        let road = FlatRoad {
            phi: Some(|u| 0.001 * u),
            mods: "grid_nan_mode = 2\n".into(),
            ..Default::default()
        };
        let ds = flat_road(&road);

        let (phi, curv) = uv2pk(&ds, ds.options(), 50.2, 0.0).unwrap();
        assert_approx_eq!(phi, 0.051, 1e-9);
        assert_approx_eq!(curv, 0.001, 1e-6);

        let (_, curv) = uv2pk(&ds, ds.options(), 50.0, 500.0).unwrap();
        assert_approx_eq!(curv, 0.002, 1e-6);

        let mut options = ds.options().clone();
        options.set(OptionId::CurvMode, CurvatureMode::RefLine).unwrap();
        let (_, curv) = uv2pk(&ds, &options, 50.0, 500.0).unwrap();
        assert_approx_eq!(curv, 0.001, 1e-6);
    }
}
