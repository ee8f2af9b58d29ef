use crate::contact::{ContactPoint, Stats};
use crate::dataset::DataSet;
use crate::error::{CrgError, Result};
use crate::eval;
use crate::loader;
use crate::options::{OptionId, Value};
use crate::util::Interval;
use crate::{ContactPointId, DataSetId};
use log::{debug, info};
use slotmap::SlotMap;
use std::path::Path;

/// A registry of loaded road surfaces and the contact points querying them.
///
/// Every operation addresses its data set or contact point by ID and fails
/// with [CrgError::UnknownDataSet] or [CrgError::UnknownContactPoint] if the
/// ID does not refer to a live object.
#[derive(Default)]
pub struct Engine {
    /// The loaded data sets.
    data_sets: SlotMap<DataSetId, DataSet>,
    /// The contact points.
    contact_points: SlotMap<ContactPointId, ContactPoint>,
}

impl Engine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Default::default()
    }

    /// Loads a road surface from a file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<DataSetId> {
        let ds = loader::load_file(path)?;
        Ok(self.insert_data_set(ds))
    }

    /// Loads a road surface from an in-memory file image.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<DataSetId> {
        let ds = loader::load_bytes(bytes)?;
        Ok(self.insert_data_set(ds))
    }

    /// Adds an already loaded road surface.
    pub fn insert_data_set(&mut self, ds: DataSet) -> DataSetId {
        let id = self.data_sets.insert(ds);
        info!("data set {:?} registered", id);
        id
    }

    /// Removes a data set. Fails if a contact point is still bound to it.
    pub fn release_data_set(&mut self, id: DataSetId) -> Result<DataSet> {
        if !self.data_sets.contains_key(id) {
            return Err(CrgError::UnknownDataSet);
        }
        let bound = self.contact_points_of(id).count();
        if bound > 0 {
            return Err(CrgError::DataSetInUse(bound));
        }
        debug!("data set {:?} released", id);
        self.data_sets.remove(id).ok_or(CrgError::UnknownDataSet)
    }

    /// Deletes every contact point bound to a data set, returning how many there were.
    pub fn release_contact_points_of(&mut self, id: DataSetId) -> usize {
        let before = self.contact_points.len();
        self.contact_points.retain(|_, cp| cp.data_set() != id);
        before - self.contact_points.len()
    }

    fn contact_points_of(&self, id: DataSetId) -> impl Iterator<Item = ContactPointId> + '_ {
        self.contact_points
            .iter()
            .filter(move |(_, cp)| cp.data_set() == id)
            .map(|(cp_id, _)| cp_id)
    }

    /// Creates a contact point querying the given data set.
    pub fn create_contact_point(&mut self, id: DataSetId) -> Result<ContactPointId> {
        let ds = self.data_sets.get(id).ok_or(CrgError::UnknownDataSet)?;
        Ok(self.contact_points.insert(ContactPoint::new(id, ds)))
    }

    /// Deletes a contact point.
    pub fn delete_contact_point(&mut self, id: ContactPointId) -> Result<()> {
        self.contact_points
            .remove(id)
            .map(|_| ())
            .ok_or(CrgError::UnknownContactPoint)
    }

    /// Gets a reference to the data set with the given ID.
    pub fn data_set(&self, id: DataSetId) -> Result<&DataSet> {
        self.data_sets.get(id).ok_or(CrgError::UnknownDataSet)
    }

    /// Gets a mutable reference to the data set with the given ID. The
    /// search histories of its contact points are cleared, as the geometry
    /// may change.
    pub fn data_set_mut(&mut self, id: DataSetId) -> Result<&mut DataSet> {
        let ds = self.data_sets.get_mut(id).ok_or(CrgError::UnknownDataSet)?;
        for cp in self.contact_points.values_mut().filter(|cp| cp.data_set() == id) {
            cp.clear_history();
        }
        Ok(ds)
    }

    /// A data set whose options or modifiers are about to change.
    fn settings_of(&mut self, id: DataSetId) -> Result<&mut DataSet> {
        self.data_sets.get_mut(id).ok_or(CrgError::UnknownDataSet)
    }

    /// Gets a reference to the contact point with the given ID.
    pub fn contact_point(&self, id: ContactPointId) -> Result<&ContactPoint> {
        self.contact_points.get(id).ok_or(CrgError::UnknownContactPoint)
    }

    /// Iterates over the data sets.
    pub fn iter_data_sets(&self) -> impl Iterator<Item = (DataSetId, &DataSet)> {
        self.data_sets.iter()
    }

    /// A contact point together with the data set it queries.
    fn bound(&mut self, id: ContactPointId) -> Result<(&mut ContactPoint, &DataSet)> {
        let cp = self
            .contact_points
            .get_mut(id)
            .ok_or(CrgError::UnknownContactPoint)?;
        let ds = self
            .data_sets
            .get(cp.data_set())
            .ok_or(CrgError::UnknownDataSet)?;
        Ok((cp, ds))
    }

    /// Sets an option of a contact point.
    pub fn set_option(&mut self, id: ContactPointId, option: OptionId, value: impl Into<Value>) -> Result<()> {
        let (cp, ds) = self.bound(id)?;
        cp.set_option(ds, option, value)
    }

    /// Gets an option of a contact point.
    pub fn get_option(&self, id: ContactPointId, option: OptionId) -> Result<Option<Value>> {
        Ok(self.contact_point(id)?.options().get(option))
    }

    /// Removes an option of a contact point, returning true if it was set.
    pub fn remove_option(&mut self, id: ContactPointId, option: OptionId) -> Result<bool> {
        let (cp, _) = self.bound(id)?;
        Ok(cp.remove_option(option))
    }

    /// Removes every option of a contact point.
    pub fn remove_all_options(&mut self, id: ContactPointId) -> Result<()> {
        let (cp, _) = self.bound(id)?;
        cp.remove_all_options();
        Ok(())
    }

    /// Restores the options of a contact point to those of its data set.
    pub fn reset_options(&mut self, id: ContactPointId) -> Result<()> {
        let (cp, ds) = self.bound(id)?;
        cp.reset_options(ds);
        Ok(())
    }

    /// Sets an option of a data set, inherited by contact points created afterwards.
    pub fn set_data_set_option(&mut self, id: DataSetId, option: OptionId, value: impl Into<Value>) -> Result<()> {
        if option.is_modifier() {
            return Err(CrgError::invalid(option, "not an option"));
        }
        self.settings_of(id)?.options_mut().set(option, value)
    }

    /// Gets an option of a data set.
    pub fn get_data_set_option(&self, id: DataSetId, option: OptionId) -> Result<Option<Value>> {
        Ok(self.data_set(id)?.options().get(option))
    }

    /// Removes an option of a data set, returning true if it was set.
    pub fn remove_data_set_option(&mut self, id: DataSetId, option: OptionId) -> Result<bool> {
        Ok(self.settings_of(id)?.options_mut().remove(option))
    }

    /// Sets a modifier of a data set, to be applied by [Self::apply_modifiers].
    pub fn set_modifier(&mut self, id: DataSetId, modifier: OptionId, value: impl Into<Value>) -> Result<()> {
        if !modifier.is_modifier() {
            return Err(CrgError::invalid(modifier, "not a modifier"));
        }
        self.settings_of(id)?.modifiers_mut().set(modifier, value)
    }

    /// Gets a modifier of a data set.
    pub fn get_modifier(&self, id: DataSetId, modifier: OptionId) -> Result<Option<Value>> {
        Ok(self.data_set(id)?.modifiers().get(modifier))
    }

    /// Removes a modifier of a data set, returning true if it was set.
    pub fn remove_modifier(&mut self, id: DataSetId, modifier: OptionId) -> Result<bool> {
        Ok(self.settings_of(id)?.modifiers_mut().remove(modifier))
    }

    /// Removes every modifier of a data set.
    pub fn remove_all_modifiers(&mut self, id: DataSetId) -> Result<()> {
        self.settings_of(id)?.modifiers_mut().remove_all();
        Ok(())
    }

    /// Applies the pending modifiers of a data set. The search histories of
    /// its contact points are cleared, as the geometry may have changed.
    pub fn apply_modifiers(&mut self, id: DataSetId) -> Result<()> {
        self.data_set_mut(id)?.apply_modifiers()
    }

    /// Changes the number of search results a contact point remembers, and
    /// derives its search distances from the increment of `u`.
    pub fn set_history(&mut self, id: ContactPointId, size: usize) -> Result<()> {
        let (cp, ds) = self.bound(id)?;
        cp.set_history(ds, size);
        Ok(())
    }

    /// Writes the search history of a contact point to the log, with the
    /// distance of each entry from a world position.
    pub fn log_history(&self, id: ContactPointId, x: f64, y: f64) -> Result<()> {
        self.contact_point(id)?.log_history(x, y);
        Ok(())
    }

    /// Starts counting the work done by the queries of a contact point.
    pub fn activate_stats(&mut self, id: ContactPointId) -> Result<()> {
        let (cp, _) = self.bound(id)?;
        cp.activate_stats();
        Ok(())
    }

    /// Stops counting the work done by the queries of a contact point.
    pub fn deactivate_stats(&mut self, id: ContactPointId) -> Result<()> {
        let (cp, _) = self.bound(id)?;
        cp.deactivate_stats();
        Ok(())
    }

    /// Sets the counts of a contact point back to zero.
    pub fn reset_stats(&mut self, id: ContactPointId) -> Result<()> {
        let (cp, _) = self.bound(id)?;
        cp.reset_stats();
        Ok(())
    }

    /// The counts of a contact point, if it is counting.
    pub fn stats(&self, id: ContactPointId) -> Result<Option<Stats>> {
        Ok(self.contact_point(id)?.stats().copied())
    }

    /// Writes the counts of a contact point to the log.
    pub fn log_stats(&self, id: ContactPointId) -> Result<()> {
        match self.contact_point(id)?.stats() {
            Some(stats) => stats.log(id),
            None => info!("contact point {:?} is not counting", id),
        }
        Ok(())
    }

    /// Converts a world position to reference-line coordinates.
    pub fn xy2uv(&mut self, id: ContactPointId, x: f64, y: f64) -> Result<(f64, f64)> {
        let (cp, ds) = self.bound(id)?;
        cp.xy2uv(ds, x, y)
    }

    /// Converts reference-line coordinates to a world position.
    pub fn uv2xy(&mut self, id: ContactPointId, u: f64, v: f64) -> Result<(f64, f64)> {
        let (cp, ds) = self.bound(id)?;
        cp.uv2xy(ds, u, v)
    }

    /// The surface elevation at reference-line coordinates.
    pub fn uv2z(&mut self, id: ContactPointId, u: f64, v: f64) -> Result<f64> {
        let (cp, ds) = self.bound(id)?;
        cp.uv2z(ds, u, v)
    }

    /// The surface elevation at a world position.
    pub fn xy2z(&mut self, id: ContactPointId, x: f64, y: f64) -> Result<f64> {
        let (cp, ds) = self.bound(id)?;
        cp.xy2z(ds, x, y)
    }

    /// The heading and curvature at reference-line coordinates.
    pub fn uv2pk(&mut self, id: ContactPointId, u: f64, v: f64) -> Result<(f64, f64)> {
        let (cp, ds) = self.bound(id)?;
        cp.uv2pk(ds, u, v)
    }

    /// The heading and curvature at a world position.
    pub fn xy2pk(&mut self, id: ContactPointId, x: f64, y: f64) -> Result<(f64, f64)> {
        let (cp, ds) = self.bound(id)?;
        cp.xy2pk(ds, x, y)
    }

    /// The elevation of the reference line of a data set at `u`, clamped to
    /// the valid range.
    pub fn u2ref_z(&self, id: DataSetId, u: f64) -> Result<f64> {
        Ok(eval::u2ref_z(self.data_set(id)?, u))
    }

    /// The valid range of `u` of a data set.
    pub fn u_range(&self, id: DataSetId) -> Result<Interval<f64>> {
        Ok(self.data_set(id)?.u_range())
    }

    /// The valid range of `v` of a data set.
    pub fn v_range(&self, id: DataSetId) -> Result<Interval<f64>> {
        Ok(self.data_set(id)?.v_range())
    }

    /// The increments in `u` and, if the long sections are evenly spaced, in `v`.
    pub fn increments(&self, id: DataSetId) -> Result<(f64, Option<f64>)> {
        Ok(self.data_set(id)?.increments())
    }

    /// The parametric range of a data set if it forms a closed track.
    pub fn closed_track(&self, id: DataSetId) -> Result<Option<Interval<f64>>> {
        Ok(self.data_set(id)?.closed_track())
    }
}

#[cfg(test)]
mod test {
    use super::Engine;
    use crate::error::CrgError;
    use crate::fixtures::FlatRoad;
    use crate::options::{BorderMode, OptionId, Value};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn handles_outlive_nothing() {
        let mut engine = Engine::new();
        let ds = engine.load_bytes(FlatRoad::default().to_file().as_bytes()).unwrap();
        let cp = engine.create_contact_point(ds).unwrap();

        assert!(matches!(engine.release_data_set(ds), Err(CrgError::DataSetInUse(1))));
        assert_eq!(engine.release_contact_points_of(ds), 1);
        assert!(matches!(engine.xy2uv(cp, 0.0, 0.0), Err(CrgError::UnknownContactPoint)));
        assert!(engine.release_data_set(ds).is_ok());
        assert!(matches!(engine.u_range(ds), Err(CrgError::UnknownDataSet)));
        assert!(matches!(engine.create_contact_point(ds), Err(CrgError::UnknownDataSet)));
    }

    #[test]
    fn options_and_modifiers_are_kept_apart() {
        let mut engine = Engine::new();
        let ds = engine.load_bytes(FlatRoad::default().to_file().as_bytes()).unwrap();
        assert!(engine.set_modifier(ds, OptionId::BorderModeU, BorderMode::Repeat).is_err());
        assert!(engine.set_data_set_option(ds, OptionId::ScaleZ, 2.0).is_err());

        engine.set_data_set_option(ds, OptionId::BorderModeU, BorderMode::Repeat).unwrap();
        let cp = engine.create_contact_point(ds).unwrap();
        assert_eq!(
            engine.get_option(cp, OptionId::BorderModeU).unwrap(),
            Some(Value::from(BorderMode::Repeat))
        );
        assert!(engine.set_option(cp, OptionId::BorderModeU, 2.5).is_err());
        engine.set_option(cp, OptionId::BorderModeU, BorderMode::None).unwrap();
        assert!(engine.uv2z(cp, 120.0, 0.0).is_err());
        engine.reset_options(cp).unwrap();
        assert!(engine.uv2z(cp, 120.0, 0.0).is_ok());
    }

    #[test]
    fn modifiers_move_the_surface() {
        let mut engine = Engine::new();
        let ds = engine.load_bytes(FlatRoad::default().to_file().as_bytes()).unwrap();
        let cp = engine.create_contact_point(ds).unwrap();
        engine.xy2uv(cp, 50.0, 0.0).unwrap();

        engine.set_modifier(ds, OptionId::RefLineOffsetY, 10.0).unwrap();
        engine.apply_modifiers(ds).unwrap();
        assert!(engine.contact_point(cp).unwrap().history().is_empty());
        assert!(engine.data_set(ds).unwrap().modifiers().is_empty());

        let (x, y) = engine.uv2xy(cp, 50.0, 0.0).unwrap();
        assert_approx_eq!(x, 50.0);
        assert_approx_eq!(y, 10.0);
        let (u, v) = engine.xy2uv(cp, 20.0, 11.0).unwrap();
        assert_approx_eq!(u, 20.0);
        assert_approx_eq!(v, 1.0);
    }

    #[test]
    fn direct_access_clears_histories() {
        let mut engine = Engine::new();
        let ds = engine.load_bytes(FlatRoad::default().to_file().as_bytes()).unwrap();
        let cp = engine.create_contact_point(ds).unwrap();
        engine.xy2uv(cp, 50.0, 0.0).unwrap();

        engine.set_data_set_option(ds, OptionId::BorderModeU, BorderMode::Repeat).unwrap();
        assert_eq!(engine.contact_point(cp).unwrap().history().len(), 1);

        engine.data_set_mut(ds).unwrap();
        assert!(engine.contact_point(cp).unwrap().history().is_empty());
    }

    #[test]
    fn stats_through_the_engine() {
        let mut engine = Engine::new();
        let ds = engine.load_bytes(FlatRoad::default().to_file().as_bytes()).unwrap();
        let cp = engine.create_contact_point(ds).unwrap();
        assert_eq!(engine.stats(cp).unwrap(), None);

        engine.activate_stats(cp).unwrap();
        for i in 0..5 {
            engine.xy2uv(cp, 10.0 + 0.1 * i as f64, 0.5).unwrap();
        }
        let stats = engine.stats(cp).unwrap().unwrap();
        assert_eq!(stats.search.queries, 5);
        assert_eq!(stats.search.close_hits, 4);
        assert!(engine.log_stats(cp).is_ok());

        engine.reset_stats(cp).unwrap();
        assert_eq!(engine.stats(cp).unwrap().unwrap().search.queries, 0);
        engine.deactivate_stats(cp).unwrap();
        assert_eq!(engine.stats(cp).unwrap(), None);

        assert_approx_eq!(engine.u2ref_z(ds, 30.0).unwrap(), 0.0);
    }
}
