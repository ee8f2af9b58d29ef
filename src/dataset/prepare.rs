//! Derivation of the reference line, the reference elevation and the
//! utility data once the raw channels have been read.

use super::{DataSet, INDEX_TABLE_SIZE};
use crate::math::{heading_vector, three_point_curvature, LookupTable, Point2d};
use crate::util::Interval;
use cgmath::prelude::*;
use itertools::{Itertools, MinMaxResult};
use log::{debug, warn};

/// Largest accepted mismatch between a straight reference line and its header end.
const STRAIGHT_END_TOLERANCE: f64 = 5.0e-4; // m

/// Largest accepted mismatch between an integrated reference line and its
/// header end, relative to the line length.
const INTEGRATED_END_TOLERANCE: f64 = 1.0e-6;

/// Length over which curvature is estimated.
const CURVATURE_WINDOW: f64 = 0.5; // m

/// Largest gap between the ends of a closed track, in u increments.
const CLOSED_GAP_INCREMENTS: f64 = 2.0;

/// Cosine of the largest angle between the end headings of a closed track.
const CLOSED_MIN_COS: f64 = 0.5; // 60 degrees

impl DataSet {
    /// Derives every quantity that depends on the raw channels. Run after
    /// loading and again whenever a modifier changed the geometry.
    pub(crate) fn prepare(&mut self) {
        self.calc_ref_line();
        self.calc_ref_line_z();
        for row in &mut self.z {
            row.normalize();
        }
        self.calc_statistics();
        if self.x.defined {
            self.smoothen_ref_line();
        }
        self.calc_heading();
        self.calc_utility();
    }

    /// Number of samples spanned by one curvature estimate.
    pub(crate) fn curvature_window(&self) -> usize {
        usize::max(1, (CURVATURE_WINDOW / self.u.inc) as usize)
    }

    /// Estimates the reference-line curvature at cross section `node`,
    /// fading linearly to zero towards either end of the line.
    pub(crate) fn curvature_at(&self, node: usize) -> f64 {
        let n = self.cross_sections();
        let w = self.curvature_window();
        if n <= 2 * w {
            return 0.0;
        }
        let chord = self.u.inc * w as f64;
        let raw = |k: usize| {
            three_point_curvature(self.point(k - w), self.point(k), self.point(k + w), chord)
        };
        let last = n - 1 - w;
        if node < w {
            raw(w) * node as f64 / w as f64
        } else if node > last {
            raw(last) * (n - 1 - node) as f64 / w as f64
        } else {
            raw(node)
        }
    }

    fn calc_ref_line(&mut self) {
        let n = self.cross_sections();
        let inc = self.u.inc;

        if self.x.defined {
            self.x.first = self.x.data[0];
            self.y.first = self.y.data[0];
            self.x.last = self.x.data[n - 1];
            self.y.last = self.y.data[n - 1];
            return;
        }

        let end = Point2d::new(self.x.last, self.y.last);
        let mut xs = vec![self.x.first; n];
        let mut ys = vec![self.y.first; n];

        if self.phi.defined {
            let phi = &self.phi.data;
            if self.defs.x_end && self.defs.y_end {
                let mut xb = vec![end.x; n];
                let mut yb = vec![end.y; n];
                for i in (0..n - 1).rev() {
                    xb[i] = xb[i + 1] - inc * phi[i + 1].cos();
                    yb[i] = yb[i + 1] - inc * phi[i + 1].sin();
                }
                for i in 0..n - 1 {
                    let frac = (i + 1) as f64 / (n - 1) as f64;
                    xs[i + 1] = (1.0 - frac) * (xs[i] + inc * phi[i + 1].cos()) + frac * xb[i + 1];
                    ys[i + 1] = (1.0 - frac) * (ys[i] + inc * phi[i + 1].sin()) + frac * yb[i + 1];
                }
                let drift = (Point2d::new(xb[0], yb[0]) - Point2d::new(self.x.first, self.y.first))
                    .magnitude();
                if drift > INTEGRATED_END_TOLERANCE * inc * (n - 1) as f64 {
                    warn!(
                        "reference line end does not match the integrated headings ({:.6} m apart)",
                        drift
                    );
                }
            } else {
                for i in 0..n - 1 {
                    xs[i + 1] = xs[i] + inc * phi[i + 1].cos();
                    ys[i + 1] = ys[i] + inc * phi[i + 1].sin();
                }
            }
        } else {
            let dir = heading_vector(self.phi.first);
            for i in 1..n {
                xs[i] = self.x.first + (i as f64) * inc * dir.x;
                ys[i] = self.y.first + (i as f64) * inc * dir.y;
            }
            let miss_x = self.defs.x_end && (xs[n - 1] - end.x).abs() > STRAIGHT_END_TOLERANCE;
            let miss_y = self.defs.y_end && (ys[n - 1] - end.y).abs() > STRAIGHT_END_TOLERANCE;
            if miss_x || miss_y {
                warn!(
                    "straight reference line ends at ({:.4}, {:.4}), header gives ({:.4}, {:.4})",
                    xs[n - 1],
                    ys[n - 1],
                    end.x,
                    end.y
                );
            }
        }

        self.x.last = xs[n - 1];
        self.y.last = ys[n - 1];
        self.x.set_data(xs);
        self.y.set_data(ys);
    }

    fn calc_ref_line_z(&mut self) {
        let n = self.cross_sections();
        let inc = self.u.inc;
        if !self.slope.valid && self.slope.first == 0.0 {
            self.ref_z.data.clear();
            self.ref_z.valid = false;
            return;
        }
        let slope: Vec<f64> = if self.slope.valid {
            (0..n).map(|i| self.slope.get(i)).collect()
        } else {
            vec![self.slope.first; n]
        };

        let mut zs = vec![self.ref_z.first; n];
        if self.defs.z_end {
            let mut zb = vec![self.ref_z.last; n];
            for i in (0..n - 1).rev() {
                zb[i] = zb[i + 1] - inc * slope[i + 1];
            }
            for i in 0..n - 1 {
                let frac = (i + 1) as f64 / (n - 1) as f64;
                zs[i + 1] = (1.0 - frac) * (zs[i] + inc * slope[i + 1]) + frac * zb[i + 1];
            }
        } else {
            for i in 0..n - 1 {
                zs[i + 1] = zs[i] + inc * slope[i + 1];
            }
        }
        self.ref_z.last = zs[n - 1];
        self.ref_z.set_data(zs);
    }

    fn calc_statistics(&mut self) {
        let n = self.cross_sections();
        let values = self
            .z
            .iter()
            .flat_map(|row| (0..n).map(move |i| row.get(i)))
            .filter(|z| !z.is_nan());
        let (min, max) = match values.minmax() {
            MinMaxResult::NoElements => (f64::NAN, f64::NAN),
            MinMaxResult::OneElement(z) => (z, z),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        self.util.z_min = min;
        self.util.z_max = max;
        self.util.z_mean_begin = self.cross_section_mean(0);
        self.util.z_mean_end = self.cross_section_mean(n - 1);
    }

    fn cross_section_mean(&self, index: usize) -> f64 {
        let (sum, count) = self
            .z
            .iter()
            .map(|row| row.get(index))
            .filter(|z| !z.is_nan())
            .fold((0.0, 0usize), |(sum, count), z| (sum + z, count + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Removes per-sample noise from a reference line given by explicit
    /// positions: the curvature is estimated, integrated into headings and
    /// the line is re-integrated from both ends.
    fn smoothen_ref_line(&mut self) {
        let n = self.cross_sections();
        let w = self.curvature_window();
        if n <= 2 * w {
            return;
        }
        let inc = self.u.inc;
        let curv: Vec<f64> = (0..n).map(|i| self.curvature_at(i)).collect();

        let start = self.point(0);
        let end = self.point(n - 1);
        let first_dir = self.point(1) - start;

        // hdg[i] is the heading of the segment ending at sample i
        let mut hdg = vec![first_dir.y.atan2(first_dir.x); n];
        for i in 1..n - 1 {
            hdg[i + 1] = hdg[i] + curv[i] * inc;
        }

        let mut forward = vec![start; n];
        for i in 1..n {
            forward[i] = forward[i - 1] + heading_vector(hdg[i]) * inc;
        }
        let mut backward = vec![end; n];
        for i in (1..n).rev() {
            backward[i - 1] = backward[i] - heading_vector(hdg[i]) * inc;
        }

        for i in 0..n {
            let frac = i as f64 / (n - 1) as f64;
            let p = forward[i] + (backward[i] - forward[i]) * frac;
            self.x.data[i] = p.x;
            self.y.data[i] = p.y;
        }
        debug!("smoothed reference line over {} samples", n);
    }

    fn calc_heading(&mut self) {
        let n = self.cross_sections();
        if self.phi.defined {
            self.phi.first = self.phi.data[0];
            self.phi.last = self.phi.data[n - 1];
            return;
        }
        let data = if self.x.defined {
            let mut data = vec![0.0; n];
            for i in 1..n {
                let d = self.point(i) - self.point(i - 1);
                data[i] = d.y.atan2(d.x);
            }
            data[0] = data[1];
            data
        } else {
            vec![self.phi.first; n]
        };
        self.phi.first = data[0];
        self.phi.last = data[n - 1];
        self.phi.set_data(data);
    }

    /// Recomputes the end headings, the closed-track range and the V index table.
    pub(crate) fn calc_utility(&mut self) {
        let n = self.cross_sections();
        let first = (self.point(1) - self.point(0)).normalize();
        let last = (self.point(n - 1) - self.point(n - 2)).normalize();
        self.util.phi_first_sin = first.y;
        self.util.phi_first_cos = first.x;
        self.util.phi_last_sin = last.y;
        self.util.phi_last_cos = last.x;
        self.util.has_bank = self.bank.valid || self.bank.first != 0.0;

        self.util.closed = None;
        let range = self.u_range();
        let gap = self.point(0) - self.point(n - 1);
        let gap_len = gap.magnitude();
        let near = gap_len <= CLOSED_GAP_INCREMENTS * self.u.inc * (1.0 + 1.0e-9);
        let aligned = first.dot(last) >= CLOSED_MIN_COS;
        let towards_start = gap_len <= 1.0e-9 || (gap / gap_len).dot(last) >= CLOSED_MIN_COS;
        if n >= 4 && near && aligned && towards_start {
            self.util.closed = Some(Interval::new(range.min, range.max + gap_len));
            debug!("reference line forms a closed track, gap {:.6} m", gap_len);
        }

        self.build_index_table();
    }

    pub(crate) fn build_index_table(&mut self) {
        let data = &self.v.data;
        let n = data.len();
        self.index_table = LookupTable::from_samples(self.v_range(), INDEX_TABLE_SIZE, |v| {
            data.partition_point(|x| *x <= v).saturating_sub(1).min(n.saturating_sub(2))
        });
    }
}
