use super::Span;
use crate::contact::{Hit, History, Stats};
use crate::dataset::DataSet;
use crate::error::Result;
use crate::math::{project_local, rot90, Point2d};
use crate::options::Options;
use cgmath::prelude::*;

/// Spacing of the cross sections tried by the coarse search.
const COARSE_SEARCH_STEP: usize = 10;

/// Where a point lies relative to one segment of the reference line.
enum Local {
    Inside { index: usize, f: f64, v: f64 },
    BeforeStart,
    PastEnd,
}

/// Converts a world position to reference-line coordinates.
///
/// The search starts at a remembered nearby result or, failing that, at the
/// nearest of every tenth cross section, then walks along the reference line
/// until the point lies between the normals of two neighbouring cross
/// sections.
pub(crate) fn xy2uv(
    ds: &DataSet,
    options: &Options,
    history: &mut History,
    x: f64,
    y: f64,
    stats: &mut Stats,
) -> Result<(f64, f64)> {
    if x.is_nan() || y.is_nan() {
        return Ok((f64::NAN, f64::NAN));
    }
    let q = Point2d::new(x, y);
    let n = ds.cross_sections();
    let range = ds.u_range();
    let closed = ds.closed_range(options);
    let stats = &mut stats.search;
    stats.queries += 1;

    let seed = match history.find(q) {
        Some((index, Hit::Close)) => {
            stats.close_hits += 1;
            index
        }
        Some((index, Hit::Far)) => {
            stats.far_hits += 1;
            index
        }
        None => {
            stats.misses += 1;
            stats.coarse_searches += 1;
            coarse_search(ds, q, closed.is_some())
        }
    };
    let mut index = walk(ds, q, seed.min(n - 2), &mut stats.steps);
    let mut local = locate(ds, q, index);

    if let Some(closed) = closed {
        let gap = closed.max - range.max;
        if !matches!(local, Local::Inside { .. }) {
            let span = Span::closing_gap(ds);
            let ahead = (q - span.a).dot(span.ta) >= 0.0;
            let behind = (span.b - q).dot(span.tb) >= 0.0;
            if gap > 0.0 && ahead && behind {
                let (f, v) = span.invert(q);
                history.push(q, n - 2);
                return Ok((range.max + f * gap, v));
            }
            stats.restarts += 1;
            index = match local {
                Local::PastEnd => walk(ds, q, 0, &mut stats.steps),
                _ => walk(ds, q, n - 2, &mut stats.steps),
            };
            local = locate(ds, q, index);
        }
    }

    let (u, v) = match local {
        Local::Inside { index: i, f, v } => (range.min + (i as f64 + f) * ds.u.inc, v),
        Local::BeforeStart => {
            let dir = ds.first_dir();
            let p = project_local(q, ds.point(0), dir, rot90(dir));
            (range.min + p.x, p.y)
        }
        Local::PastEnd => {
            let dir = ds.last_dir();
            let p = project_local(q, ds.point(n - 1), dir, rot90(dir));
            (range.max + p.x, p.y)
        }
    };
    history.push(q, index);
    Ok((u, v))
}

/// Returns the cross section nearest to `q` among every tenth one. On a
/// closed track the last cross section is always tried as well.
fn coarse_search(ds: &DataSet, q: Point2d, closed: bool) -> usize {
    let n = ds.cross_sections();
    let last = closed.then_some(n - 1);
    let mut best = (f64::INFINITY, 0);
    for index in (0..n).step_by(COARSE_SEARCH_STEP).chain(last) {
        let dist2 = (ds.point(index) - q).magnitude2();
        if dist2 < best.0 {
            best = (dist2, index);
        }
    }
    best.1
}

/// Returns true if `q` lies ahead of the normal through cross section `index`.
fn ahead_of(ds: &DataSet, q: Point2d, index: usize) -> bool {
    (q - ds.point(index)).dot(ds.node_tangent(index)) > 0.0
}

/// Walks from segment `index` to the segment whose end normals enclose `q`,
/// counting the steps taken.
fn walk(ds: &DataSet, q: Point2d, mut index: usize, steps: &mut usize) -> usize {
    let n = ds.cross_sections();
    while index + 2 < n && ahead_of(ds, q, index + 1) {
        index += 1;
        *steps += 1;
    }
    while index > 0 && (q - ds.point(index)).dot(ds.node_tangent(index)) < 0.0 {
        index -= 1;
        *steps += 1;
    }
    index
}

fn locate(ds: &DataSet, q: Point2d, index: usize) -> Local {
    let n = ds.cross_sections();
    let span = Span::of_segment(ds, index);
    if index == 0 && (q - span.a).dot(span.ta) < 0.0 {
        return Local::BeforeStart;
    }
    if index == n - 2 && (span.b - q).dot(span.tb) < 0.0 {
        return Local::PastEnd;
    }
    let (f, v) = span.invert(q);
    Local::Inside { index, f, v }
}
