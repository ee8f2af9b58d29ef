//! Per-consumer query handles bound to one data set.

use crate::dataset::DataSet;
use crate::error::{CrgError, Result};
use crate::eval;
use crate::math::Point2d;
use crate::options::{OptionId, Options, Value};
use crate::DataSetId;
use log::warn;
pub use history::{Hit, History, DEFAULT_CLOSE_DISTANCE, DEFAULT_FAR_DISTANCE, DEFAULT_HISTORY_SIZE};
pub use stats::{EvalStats, SearchStats, Stats};

mod history;
mod stats;

/// Ratio of the close search distance to the increment of `u` after the
/// history is resized.
const CLOSE_DISTANCE_PER_INC: f64 = 10.0;

/// Ratio of the far search distance to the close search distance after the
/// history is resized.
const FAR_DISTANCE_PER_CLOSE: f64 = 10.0;

/// A query handle for one data set.
///
/// A contact point owns its own copy of the evaluation options and a
/// history of recent reference-line search results, so that successive
/// queries close to each other are found quickly. Any number of contact
/// points may be bound to the same data set.
#[derive(Clone, Debug)]
pub struct ContactPoint {
    /// The data set this contact point queries.
    data_set: DataSetId,
    /// The evaluation options.
    options: Options,
    /// The recent search results.
    history: History,
    /// Counts of the queries made while statistics are active.
    stats: Option<Stats>,
}

impl ContactPoint {
    /// Creates a contact point for the given data set, starting with the
    /// default contact point options overlaid with the data set's options.
    pub fn new(data_set: DataSetId, ds: &DataSet) -> Self {
        let mut cp = Self {
            data_set,
            options: Options::new(),
            history: History::default(),
            stats: None,
        };
        cp.load_options(ds);
        cp
    }

    /// The data set this contact point is bound to.
    pub fn data_set(&self) -> DataSetId {
        self.data_set
    }

    /// The evaluation options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The recent search results.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Sets an evaluation option.
    ///
    /// Setting a search distance updates the history thresholds; setting a
    /// search position replaces the history with the reference-line point
    /// at that position.
    pub fn set_option(&mut self, ds: &DataSet, id: OptionId, value: impl Into<Value>) -> Result<()> {
        if id.is_modifier() {
            return Err(CrgError::invalid(id, "modifiers cannot be set on a contact point"));
        }
        self.options.set(id, value)?;
        self.apply_option(ds, id)
    }

    /// Removes an evaluation option, returning true if it was set.
    pub fn remove_option(&mut self, id: OptionId) -> bool {
        let removed = self.options.remove(id);
        match id {
            OptionId::RefLineClose => self.history.set_close_distance(DEFAULT_CLOSE_DISTANCE),
            OptionId::RefLineFar => self.history.set_far_distance(DEFAULT_FAR_DISTANCE),
            _ => {}
        }
        removed
    }

    /// Removes every evaluation option.
    pub fn remove_all_options(&mut self) {
        self.options.remove_all();
        self.history.set_close_distance(DEFAULT_CLOSE_DISTANCE);
        self.history.set_far_distance(DEFAULT_FAR_DISTANCE);
    }

    /// Restores the options the contact point was created with.
    pub fn reset_options(&mut self, ds: &DataSet) {
        self.load_options(ds);
    }

    fn load_options(&mut self, ds: &DataSet) {
        self.options = Options::default_contact_point_options();
        self.options.overlay(ds.options());
        self.history
            .set_close_distance(self.options.double_or(OptionId::RefLineClose, DEFAULT_CLOSE_DISTANCE));
        self.history
            .set_far_distance(self.options.double_or(OptionId::RefLineFar, DEFAULT_FAR_DISTANCE));
        for id in [OptionId::RefLineSearchU, OptionId::RefLineSearchUFrac] {
            if self.options.is_set(id) {
                if let Err(err) = self.apply_option(ds, id) {
                    warn!("cannot preload the search history: {}", err);
                }
            }
        }
    }

    fn apply_option(&mut self, ds: &DataSet, id: OptionId) -> Result<()> {
        match id {
            OptionId::RefLineClose => {
                self.history
                    .set_close_distance(self.options.double_or(id, DEFAULT_CLOSE_DISTANCE));
            }
            OptionId::RefLineFar => {
                self.history
                    .set_far_distance(self.options.double_or(id, DEFAULT_FAR_DISTANCE));
            }
            OptionId::RefLineSearchU | OptionId::RefLineSearchUFrac => {
                let range = ds.u_range();
                let u = match self.options.double(id) {
                    Some(frac) if id == OptionId::RefLineSearchUFrac => range.lerp(frac),
                    Some(u) => u,
                    None => return Ok(()),
                };
                let u = range.clamp(u);
                let (index, _) = ds.locate_u(u);
                let p = eval::uv2xy(ds, &self.options, u, 0.0)?;
                self.history.preload(p, index);
            }
            _ => {}
        }
        Ok(())
    }

    /// Changes the number of remembered search results, forgetting them all.
    ///
    /// The search distances are derived afresh from the increment of `u`:
    /// ten increments for the close distance and a hundred for the far one.
    /// Setting them as options afterwards overrides this.
    pub fn set_history(&mut self, ds: &DataSet, size: usize) {
        self.history.resize(size);
        if ds.u.inc > 0.0 {
            let close = CLOSE_DISTANCE_PER_INC * ds.u.inc;
            self.history.set_close_distance(close);
            self.history.set_far_distance(FAR_DISTANCE_PER_CLOSE * close);
        } else {
            warn!("no increment of u to derive the search distances from");
        }
    }

    /// Forgets every remembered search result.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Starts counting the work done by queries, from zero.
    pub fn activate_stats(&mut self) {
        self.stats = Some(Stats::default());
    }

    /// Stops counting, forgetting the counts.
    pub fn deactivate_stats(&mut self) {
        self.stats = None;
    }

    /// Sets the counts back to zero, if counting.
    pub fn reset_stats(&mut self) {
        if let Some(stats) = &mut self.stats {
            *stats = Stats::default();
        }
    }

    /// The counts of the work done by queries, if counting.
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    /// Writes the remembered search results to the log, with their distances
    /// from a world position.
    pub fn log_history(&self, x: f64, y: f64) {
        self.history.log(Point2d::new(x, y));
    }

    fn record(&mut self, query: &Stats) {
        if let Some(stats) = &mut self.stats {
            stats.add(query);
        }
    }

    /// Converts a world position to reference-line coordinates.
    pub fn xy2uv(&mut self, ds: &DataSet, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut query = Stats::default();
        let result = eval::xy2uv(ds, &self.options, &mut self.history, x, y, &mut query);
        self.record(&query);
        result
    }

    /// Converts reference-line coordinates to a world position.
    pub fn uv2xy(&self, ds: &DataSet, u: f64, v: f64) -> Result<(f64, f64)> {
        let p = eval::uv2xy(ds, &self.options, u, v)?;
        Ok((p.x, p.y))
    }

    /// The surface elevation at reference-line coordinates.
    pub fn uv2z(&mut self, ds: &DataSet, u: f64, v: f64) -> Result<f64> {
        let mut query = Stats::default();
        let result = eval::uv2z(ds, &self.options, u, v, &mut query);
        self.record(&query);
        result
    }

    /// The surface elevation at a world position.
    pub fn xy2z(&mut self, ds: &DataSet, x: f64, y: f64) -> Result<f64> {
        let (u, v) = self.xy2uv(ds, x, y)?;
        self.uv2z(ds, u, v)
    }

    /// The heading and curvature at reference-line coordinates.
    pub fn uv2pk(&self, ds: &DataSet, u: f64, v: f64) -> Result<(f64, f64)> {
        eval::uv2pk(ds, &self.options, u, v)
    }

    /// The heading and curvature at a world position.
    pub fn xy2pk(&mut self, ds: &DataSet, x: f64, y: f64) -> Result<(f64, f64)> {
        let (u, v) = self.xy2uv(ds, x, y)?;
        self.uv2pk(ds, u, v)
    }
}
