//! The in-memory representation of one loaded road surface.

use crate::channel::Channel;
use crate::error::{CrgError, Result};
use crate::math::{LookupTable, Point2d};
use crate::options::Options;
use crate::util::Interval;
use log::info;

mod modify;
mod prepare;

/// Number of entries in the V index table.
pub(crate) const INDEX_TABLE_SIZE: usize = 200;

/// Which values the source file gave explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Definitions {
    pub u_end: bool,
    pub x_end: bool,
    pub y_end: bool,
    pub z_start: bool,
    pub z_end: bool,
    pub slope_end: bool,
    pub bank_end: bool,
    /// V is given by the position of each long section.
    pub v_by_position: bool,
    /// V is given by the index of each long section.
    pub v_by_index: bool,
}

/// Derived quantities that speed up queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Utility {
    /// The smallest elevation in the grid.
    pub z_min: f64,
    /// The largest elevation in the grid.
    pub z_max: f64,
    /// The mean elevation of the first cross section.
    pub z_mean_begin: f64,
    /// The mean elevation of the last cross section.
    pub z_mean_end: f64,
    pub phi_first_sin: f64,
    pub phi_first_cos: f64,
    pub phi_last_sin: f64,
    pub phi_last_cos: f64,
    /// Whether the surface is banked.
    pub has_bank: bool,
    /// The parametric range of the track, if its ends meet.
    pub closed: Option<Interval<f64>>,
}

/// A road surface: a reference line plus an elevation grid sampled in
/// reference-line coordinates.
#[derive(Clone, Debug)]
pub struct DataSet {
    pub(crate) u: Channel,
    pub(crate) v: Channel,
    pub(crate) x: Channel,
    pub(crate) y: Channel,
    pub(crate) phi: Channel,
    pub(crate) slope: Channel,
    pub(crate) bank: Channel,
    pub(crate) ref_z: Channel,
    /// One elevation row per long section, ordered by V.
    pub(crate) z: Vec<Channel<f32>>,
    pub(crate) defs: Definitions,
    /// Whether the long sections are evenly spaced.
    pub(crate) v_uniform: bool,
    /// Number of values per record in the source file.
    pub(crate) columns: usize,
    pub(crate) util: Utility,
    pub(crate) index_table: Option<LookupTable<usize>>,
    pub(crate) options: Options,
    pub(crate) modifiers: Options,
}

impl Default for DataSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSet {
    /// Creates an empty data set with the default options and modifiers.
    pub fn new() -> Self {
        Self {
            u: Channel::default(),
            v: Channel::default(),
            x: Channel::default(),
            y: Channel::default(),
            phi: Channel::default(),
            slope: Channel::default(),
            bank: Channel::default(),
            ref_z: Channel::default(),
            z: Vec::new(),
            defs: Definitions::default(),
            v_uniform: false,
            columns: 0,
            util: Utility::default(),
            index_table: None,
            options: Options::default_options(),
            modifiers: Options::default_modifiers(),
        }
    }

    /// The number of cross sections, i.e. samples along the reference line.
    pub fn cross_sections(&self) -> usize {
        self.z.first().map_or(0, |row| row.len())
    }

    /// The number of long sections, i.e. samples across the road.
    pub fn long_sections(&self) -> usize {
        self.z.len()
    }

    /// The valid range of `u`.
    pub fn u_range(&self) -> Interval<f64> {
        Interval::new(self.u.first, self.u.last)
    }

    /// The valid range of `v`.
    pub fn v_range(&self) -> Interval<f64> {
        match (self.v.data.first(), self.v.data.last()) {
            (Some(first), Some(last)) => Interval::new(*first, *last),
            _ => Interval::new(self.v.first, self.v.last),
        }
    }

    /// The increments in `u` and, if the long sections are evenly spaced, in `v`.
    pub fn increments(&self) -> (f64, Option<f64>) {
        (self.u.inc, self.v_uniform.then_some(self.v.inc))
    }

    /// The parametric range of the track if its ends meet, so that it may be
    /// treated as a closed loop.
    pub fn closed_track(&self) -> Option<Interval<f64>> {
        self.util.closed
    }

    /// Derived statistics and end headings.
    pub fn utility(&self) -> &Utility {
        &self.util
    }

    /// The options that new contact points start with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// The modifiers that the next call to [Self::apply_modifiers] applies.
    pub fn modifiers(&self) -> &Options {
        &self.modifiers
    }

    pub fn modifiers_mut(&mut self) -> &mut Options {
        &mut self.modifiers
    }

    pub fn u(&self) -> &Channel {
        &self.u
    }

    pub fn v(&self) -> &Channel {
        &self.v
    }

    pub fn x(&self) -> &Channel {
        &self.x
    }

    pub fn y(&self) -> &Channel {
        &self.y
    }

    pub fn phi(&self) -> &Channel {
        &self.phi
    }

    pub fn slope(&self) -> &Channel {
        &self.slope
    }

    pub fn bank(&self) -> &Channel {
        &self.bank
    }

    pub fn ref_z(&self) -> &Channel {
        &self.ref_z
    }

    /// The elevation rows, one per long section.
    pub fn z_rows(&self) -> &[Channel<f32>] {
        &self.z
    }

    /// The reference line point at cross section `index`.
    pub(crate) fn point(&self, index: usize) -> Point2d {
        Point2d::new(self.x.data[index], self.y.data[index])
    }

    /// Validates the options and modifiers against each other and the data.
    pub fn check(&mut self) -> Result<()> {
        self.options.check_options()?;
        self.modifiers.check_modifiers()?;
        if self.options.close_track() && self.util.closed.is_none() {
            return Err(CrgError::invalid(
                crate::options::OptionId::RefLineContinue,
                "the reference line cannot be closed",
            ));
        }
        Ok(())
    }

    /// Writes an overview of the surface to the log.
    pub fn log_summary(&self) {
        let u = self.u_range();
        let v = self.v_range();
        info!(
            "road surface: u = [{:.3}, {:.3}] m step {:.4} m, v = [{:.3}, {:.3}] m over {} long sections",
            u.min,
            u.max,
            self.u.inc,
            v.min,
            v.max,
            self.long_sections()
        );
        if let (Some(x0), Some(y0)) = (self.x.data.first(), self.y.data.first()) {
            info!(
                "reference line: start ({:.3}, {:.3}) end ({:.3}, {:.3}), heading {:.5} -> {:.5} rad",
                x0,
                y0,
                self.x.last,
                self.y.last,
                self.phi.first,
                self.phi.last
            );
        }
        info!(
            "elevation: min {:.4} m, max {:.4} m, mean at begin {:.4} m, at end {:.4} m, banked: {}",
            self.util.z_min,
            self.util.z_max,
            self.util.z_mean_begin,
            self.util.z_mean_end,
            self.util.has_bank
        );
        if let Some(closed) = self.util.closed {
            info!("closed track over u = [{:.3}, {:.3}] m", closed.min, closed.max);
        }
        for line in self.options.to_string().lines() {
            info!("option   {}", line);
        }
        for line in self.modifiers.to_string().lines() {
            info!("modifier {}", line);
        }
    }
}
