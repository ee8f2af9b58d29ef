//! The coordinate and elevation queries.
//!
//! Every query reads an immutable [DataSet] and an option registry; only the
//! reference-line search of [xy2uv] touches mutable state, the contact
//! point's history cache. Queries count their work into a
//! [Stats](crate::contact::Stats).

use crate::dataset::DataSet;
use crate::math::{rot90, Point2d, Vector2d};
use crate::options::Options;
use crate::util::Interval;
use cgmath::prelude::*;

pub(crate) use uv2pk::uv2pk;
pub(crate) use uv2xy::uv2xy;
pub(crate) use uv2z::{u2ref_z, uv2z};
pub(crate) use xy2uv::xy2uv;

mod uv2pk;
mod uv2xy;
mod uv2z;
mod xy2uv;

impl DataSet {
    /// The closed parametric range, if the track is closed and the options
    /// ask for it to be treated as such.
    pub(crate) fn closed_range(&self, options: &Options) -> Option<Interval<f64>> {
        self.util.closed.filter(|_| options.close_track())
    }

    /// Finds the reference line segment containing `u` and the fraction of
    /// the way along it. `u` is assumed to lie within the valid range.
    pub(crate) fn locate_u(&self, u: f64) -> (usize, f64) {
        let n = self.cross_sections();
        let frac = (u - self.u.first) / self.u.inc;
        let index = frac.max(0.0) as usize;
        if index >= n - 1 {
            (n - 2, 1.0)
        } else {
            (index, frac - index as f64)
        }
    }

    /// The direction of the reference line at its start.
    pub(crate) fn first_dir(&self) -> Vector2d {
        Vector2d::new(self.util.phi_first_cos, self.util.phi_first_sin)
    }

    /// The direction of the reference line at its end.
    pub(crate) fn last_dir(&self) -> Vector2d {
        Vector2d::new(self.util.phi_last_cos, self.util.phi_last_sin)
    }

    fn segment_dir(&self, index: usize) -> Vector2d {
        let d = self.point(index + 1) - self.point(index);
        let len = d.magnitude();
        if len > 0.0 {
            d / len
        } else {
            crate::math::heading_vector(self.phi.get(index + 1))
        }
    }

    /// The tangent at a cross section: the mean direction of the segments
    /// either side of it.
    pub(crate) fn node_tangent(&self, index: usize) -> Vector2d {
        let n = self.cross_sections();
        if index == 0 {
            return self.first_dir();
        }
        if index >= n - 1 {
            return self.last_dir();
        }
        let before = self.segment_dir(index - 1);
        let after = self.segment_dir(index);
        let sum = before + after;
        let len = sum.magnitude();
        if len > 1.0e-12 {
            sum / len
        } else {
            after
        }
    }

    /// The unit normal at a cross section, pointing towards positive `v`.
    pub(crate) fn node_normal(&self, index: usize) -> Vector2d {
        rot90(self.node_tangent(index))
    }
}

/// One stretch of reference line between two cross sections, with the
/// tangents at its ends.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Span {
    pub a: Point2d,
    pub b: Point2d,
    pub ta: Vector2d,
    pub tb: Vector2d,
}

impl Span {
    pub fn of_segment(ds: &DataSet, index: usize) -> Self {
        Self {
            a: ds.point(index),
            b: ds.point(index + 1),
            ta: ds.node_tangent(index),
            tb: ds.node_tangent(index + 1),
        }
    }

    /// The stretch bridging the gap from the end of a closed track back to its start.
    pub fn closing_gap(ds: &DataSet) -> Self {
        let n = ds.cross_sections();
        Self {
            a: ds.point(n - 1),
            b: ds.point(0),
            ta: ds.last_dir(),
            tb: ds.first_dir(),
        }
    }

    /// The point at fraction `f` along the span, offset laterally by `v`.
    /// The lateral direction is blended between the normals at either end.
    pub fn sample(&self, f: f64, v: f64) -> Point2d {
        let a = self.a + rot90(self.ta) * v;
        let b = self.b + rot90(self.tb) * v;
        a + (b - a) * f
    }

    /// Inverts [Self::sample]: finds `(f, v)` such that `sample(f, v) == q`.
    ///
    /// The estimate `ta / (ta + tb)` from the distances of `q` ahead of either
    /// end picks the root of the underlying quadratic and is the fallback if
    /// there is none.
    pub fn invert(&self, q: Point2d) -> (f64, f64) {
        let ta = (q - self.a).dot(self.ta);
        let tb = (self.b - q).dot(self.tb);
        let estimate = if ta + tb > 0.0 { ta / (ta + tb) } else { 0.0 };

        let na = rot90(self.ta);
        let dn = rot90(self.tb) - na;
        let d = self.b - self.a;
        let w = q - self.a;

        // cross(w - f d, na + f dn) = 0
        let qa = -d.perp_dot(dn);
        let qb = w.perp_dot(dn) - d.perp_dot(na);
        let qc = w.perp_dot(na);
        let f = if qa.abs() <= 1.0e-12 * qb.abs() {
            if qb != 0.0 {
                -qc / qb
            } else {
                estimate
            }
        } else {
            let disc = qb * qb - 4.0 * qa * qc;
            if disc < 0.0 {
                estimate
            } else {
                let h = -0.5 * (qb + qb.signum() * disc.sqrt());
                let r1 = h / qa;
                let r2 = if h != 0.0 { qc / h } else { r1 };
                if (r1 - estimate).abs() <= (r2 - estimate).abs() {
                    r1
                } else {
                    r2
                }
            }
        };

        let normal = na + dn * f;
        let v = (w - d * f).dot(normal) / normal.magnitude2();
        (f, v)
    }
}

#[cfg(test)]
mod test {
    use super::Span;
    use crate::math::{Point2d, Vector2d};
    use assert_approx_eq::assert_approx_eq;
    use cgmath::prelude::*;

    #[test]
    fn invert_straight_span() {
        let span = Span {
            a: Point2d::new(0.0, 0.0),
            b: Point2d::new(2.0, 0.0),
            ta: Vector2d::unit_x(),
            tb: Vector2d::unit_x(),
        };
        let (f, v) = span.invert(Point2d::new(0.5, -3.0));
        assert_approx_eq!(f, 0.25);
        assert_approx_eq!(v, -3.0);
    }

    #[test]
    fn invert_bent_span() {
        let span = Span {
            a: Point2d::new(0.0, 0.0),
            b: Point2d::new(1.0, 0.1),
            ta: Vector2d::new(1.0, 0.05).normalize(),
            tb: Vector2d::new(1.0, 0.15).normalize(),
        };
        for (f, v) in [(0.0, 0.0), (0.3, 2.5), (0.9, -4.0), (0.5, 10.0)] {
            let q = span.sample(f, v);
            let (f2, v2) = span.invert(q);
            assert_approx_eq!(f2, f, 1e-9);
            assert_approx_eq!(v2, v, 1e-9);
        }
    }
}
