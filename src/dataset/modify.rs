//! One-shot modifiers: scaling, missing-sample treatment and repositioning.

use super::DataSet;
use crate::contact::Stats;
use crate::error::Result;
use crate::eval;
use crate::math::{rotate_about, Point2d, Vector2d};
use crate::options::{GridNanMode, OptionId, Options};
use log::{debug, info, warn};

impl DataSet {
    /// Applies the modifiers to the data and clears them, so that each
    /// modifier acts exactly once.
    ///
    /// Scaling is applied first, then missing samples are treated, then the
    /// derived data is recomputed if needed, and finally the surface is
    /// repositioned. Nothing is changed if the modifiers are inconsistent.
    pub fn apply_modifiers(&mut self) -> Result<()> {
        let mut mods = self.modifiers.clone();
        mods.check_modifiers()?;
        let mut reprepare = false;

        if let Some(factor) = mods.double(OptionId::ScaleZ) {
            for row in &mut self.z {
                row.scale(factor, false);
            }
            reprepare = true;
        }
        if let Some(factor) = mods.double(OptionId::ScaleSlope) {
            self.slope.scale(factor, false);
            self.defs.z_end = false;
            reprepare = true;
        }
        if let Some(factor) = mods.double(OptionId::ScaleBank) {
            self.bank.scale(factor, false);
            self.defs.bank_end = false;
            reprepare = true;
        }
        if let Some(factor) = mods.double(OptionId::ScaleLength) {
            self.scale_length(factor);
            reprepare = true;
        }
        if let Some(factor) = mods.double(OptionId::ScaleWidth) {
            self.v.scale(factor, false);
            reprepare = true;
        }
        if let Some(factor) = mods.double(OptionId::ScaleCurvature) {
            self.scale_curvature(factor);
            reprepare = true;
        }
        if let Some(mode) = mods.grid_nan_mode() {
            let offset = mods.double_or(OptionId::GridNanOffset, 0.0);
            if self.handle_nans(mode, offset) > 0 {
                reprepare = true;
            }
        }

        if reprepare {
            self.prepare();
        }
        self.reposition(&mods)?;
        self.modifiers.remove_all();
        Ok(())
    }

    fn scale_length(&mut self, factor: f64) {
        let range = self.u.last - self.u.first;
        self.u.last = self.u.first + factor * range;
        self.u.inc *= factor;
        if self.x.defined {
            let (x0, y0) = (self.x.data[0], self.y.data[0]);
            for (x, y) in self.x.data.iter_mut().zip(self.y.data.iter_mut()) {
                *x = x0 + factor * (*x - x0);
                *y = y0 + factor * (*y - y0);
            }
        }
        self.defs.x_end = false;
        self.defs.y_end = false;
        self.defs.z_end = false;
    }

    /// Scales every heading change along the reference line. A line given by
    /// explicit positions is re-integrated from its scaled headings.
    fn scale_curvature(&mut self, factor: f64) {
        let first = self.phi.first;
        for phi in self.phi.data.iter_mut().skip(1) {
            *phi = first + factor * (*phi - first);
        }
        if let Some(last) = self.phi.data.last() {
            self.phi.last = *last;
        }
        if self.x.defined {
            self.x.first = self.x.data[0];
            self.y.first = self.y.data[0];
            self.x.defined = false;
            self.y.defined = false;
            self.phi.defined = true;
        }
        self.defs.x_end = false;
        self.defs.y_end = false;
    }

    /// Replaces missing elevation samples. Returns the number of missing samples found.
    fn handle_nans(&mut self, mode: GridNanMode, offset: f64) -> usize {
        let missing: usize = self
            .z
            .iter()
            .map(|row| row.data.iter().filter(|z| z.is_nan()).count())
            .sum();
        if missing == 0 {
            return 0;
        }
        info!("{} missing elevation sample(s), treatment {:?}", missing, mode);

        let n_u = self.cross_sections();
        match mode {
            GridNanMode::Keep => {}
            GridNanMode::SetZero => {
                for row in &mut self.z {
                    let value = (offset - row.mean) as f32;
                    for z in row.data.iter_mut().filter(|z| z.is_nan()) {
                        *z = value;
                    }
                }
            }
            GridNanMode::KeepLast => {
                for iu in 0..n_u {
                    let mut last = None;
                    for iv in 0..self.z.len() {
                        match (self.z[iv].get(iu), last) {
                            (z, _) if !z.is_nan() => last = Some(z),
                            (_, Some(valid)) => self.set_z(iv, iu, valid + offset),
                            _ => {}
                        }
                    }
                    let mut next = None;
                    for iv in (0..self.z.len()).rev() {
                        match (self.z[iv].get(iu), next) {
                            (z, _) if !z.is_nan() => next = Some(z),
                            (_, Some(valid)) => self.set_z(iv, iu, valid + offset),
                            _ => {}
                        }
                    }
                    if next.is_none() {
                        warn!("cross section {} has no valid elevation sample", iu);
                    }
                }
            }
        }
        missing
    }

    fn set_z(&mut self, iv: usize, iu: usize, value: f64) {
        let row = &mut self.z[iv];
        row.data[iu] = (value - row.mean) as f32;
    }

    /// Moves and rotates the surface, either so that a reference point lands
    /// on a target position and heading, or by a plain offset.
    fn reposition(&mut self, mods: &Options) -> Result<()> {
        let (centre, from, to, rotation, dz) = if let Some(x) = mods.double(OptionId::RefPointX) {
            let u_range = self.u_range();
            let v_range = self.v_range();
            let u = mods
                .double(OptionId::RefPointU)
                .unwrap_or_else(|| u_range.lerp(mods.double_or(OptionId::RefPointUFrac, 0.0)))
                + mods.double_or(OptionId::RefPointUOffset, 0.0);
            let v = mods
                .double(OptionId::RefPointV)
                .unwrap_or_else(|| v_range.lerp(mods.double_or(OptionId::RefPointVFrac, 0.0)))
                + mods.double_or(OptionId::RefPointVOffset, 0.0);

            let from = eval::uv2xy(self, &self.options, u, v)?;
            let from_z = eval::uv2z(self, &self.options, u, v, &mut Stats::default())?;
            let (from_phi, _) = eval::uv2pk(self, &self.options, u, v)?;
            let to = Point2d::new(x, mods.double_or(OptionId::RefPointY, 0.0));
            let rotation = mods.double_or(OptionId::RefPointPhi, 0.0) - from_phi;
            let dz = mods.double_or(OptionId::RefPointZ, 0.0) - from_z;
            (from, from, to, rotation, dz)
        } else if let Some(dx) = mods.double(OptionId::RefLineOffsetX) {
            let from = Point2d::new(self.x.first, self.y.first);
            let centre = Point2d::new(
                mods.double_or(OptionId::RefLineRotCenterX, from.x),
                mods.double_or(OptionId::RefLineRotCenterY, from.y),
            );
            let to = from + Vector2d::new(dx, mods.double_or(OptionId::RefLineOffsetY, 0.0));
            let rotation = mods.double_or(OptionId::RefLineOffsetPhi, 0.0);
            let dz = mods.double_or(OptionId::RefLineOffsetZ, 0.0);
            (centre, from, to, rotation, dz)
        } else {
            return Ok(());
        };

        debug!(
            "repositioning: rotate {:.6} rad about ({:.3}, {:.3}), move by ({:.3}, {:.3}, {:.3})",
            rotation,
            centre.x,
            centre.y,
            to.x - from.x,
            to.y - from.y,
            dz
        );

        if rotation != 0.0 {
            self.phi.offset(rotation);
            let (sin, cos) = rotation.sin_cos();
            for (x, y) in self.x.data.iter_mut().zip(self.y.data.iter_mut()) {
                let p = rotate_about(Point2d::new(*x, *y), centre, sin, cos);
                *x = p.x;
                *y = p.y;
            }
            let first = rotate_about(Point2d::new(self.x.first, self.y.first), centre, sin, cos);
            let last = rotate_about(Point2d::new(self.x.last, self.y.last), centre, sin, cos);
            self.x.first = first.x;
            self.y.first = first.y;
            self.x.last = last.x;
            self.y.last = last.y;
        }

        self.x.offset(to.x - from.x);
        self.y.offset(to.y - from.y);

        if self.ref_z.valid {
            self.ref_z.offset(dz);
        } else if self.defs.z_start {
            self.ref_z.first += dz;
            self.ref_z.last += dz;
        } else {
            for row in &mut self.z {
                row.mean += dz;
            }
            self.util.z_min += dz;
            self.util.z_max += dz;
            self.util.z_mean_begin += dz;
            self.util.z_mean_end += dz;
        }

        self.calc_utility();
        Ok(())
    }
}
