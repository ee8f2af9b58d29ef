use super::Span;
use crate::dataset::DataSet;
use crate::error::Result;
use crate::math::{rot90, Point2d};
use crate::options::Options;

/// Converts reference-line coordinates to a world position.
///
/// Outside the valid range of `u` the reference line is extended as a
/// straight line along its end heading. On a closed track the gap between
/// the last and the first cross section is bridged.
pub(crate) fn uv2xy(ds: &DataSet, options: &Options, u: f64, v: f64) -> Result<Point2d> {
    if u.is_nan() || v.is_nan() {
        return Ok(Point2d::new(f64::NAN, f64::NAN));
    }
    let range = ds.u_range();
    let mut u = u;
    if let Some(closed) = ds.closed_range(options) {
        u = closed.wrap(u);
        if u > range.max {
            let f = (u - range.max) / (closed.max - range.max);
            return Ok(Span::closing_gap(ds).sample(f, v));
        }
    }

    let n = ds.cross_sections();
    if u < range.min {
        let dir = ds.first_dir();
        return Ok(ds.point(0) + dir * (u - range.min) + rot90(dir) * v);
    }
    if u > range.max {
        let dir = ds.last_dir();
        return Ok(ds.point(n - 1) + dir * (u - range.max) + rot90(dir) * v);
    }

    let (index, f) = ds.locate_u(u);
    Ok(Span::of_segment(ds, index).sample(f, v))
}
