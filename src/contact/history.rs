//! A short memory of recent reference-line search results.

use crate::math::Point2d;
use cgmath::prelude::*;
use log::info;
use std::collections::VecDeque;

/// Default number of remembered search results.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// Default distance within which a remembered result is reused directly.
pub const DEFAULT_CLOSE_DISTANCE: f64 = 0.3; // m

/// Default distance within which a remembered result seeds the search.
pub const DEFAULT_FAR_DISTANCE: f64 = 2.2; // m

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    point: Point2d,
    index: usize,
}

/// How a remembered result was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    /// Within the close distance; the search starts right there.
    Close,
    /// Within the far distance only.
    Far,
}

/// Remembers where recent queries were found on the reference line so that
/// the next query close by can start its search there. Most recent first.
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<Entry>,
    capacity: usize,
    close_dist2: f64,
    far_dist2: f64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    /// Creates an empty history remembering up to `capacity` results.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            close_dist2: DEFAULT_CLOSE_DISTANCE * DEFAULT_CLOSE_DISTANCE,
            far_dist2: DEFAULT_FAR_DISTANCE * DEFAULT_FAR_DISTANCE,
        }
    }

    /// Changes the capacity, forgetting every result.
    pub fn resize(&mut self, capacity: usize) {
        self.entries = VecDeque::with_capacity(capacity);
        self.capacity = capacity;
    }

    /// The maximum number of remembered results.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of remembered results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The distance within which a remembered result is reused directly.
    pub fn close_distance(&self) -> f64 {
        self.close_dist2.sqrt()
    }

    /// The distance within which a remembered result seeds the search.
    pub fn far_distance(&self) -> f64 {
        self.far_dist2.sqrt()
    }

    /// Sets the distance within which a remembered result is reused directly.
    pub fn set_close_distance(&mut self, distance: f64) {
        self.close_dist2 = distance * distance;
    }

    /// Sets the distance within which a remembered result seeds the search.
    pub fn set_far_distance(&mut self, distance: f64) {
        self.far_dist2 = distance * distance;
    }

    /// Finds the index to start a search for `point` at.
    ///
    /// The most recent result within the close distance wins outright;
    /// otherwise the nearest result within the far distance is used.
    pub fn lookup(&self, point: Point2d) -> Option<usize> {
        self.find(point).map(|(index, _)| index)
    }

    /// Like [Self::lookup], also telling how the result was found.
    pub fn find(&self, point: Point2d) -> Option<(usize, Hit)> {
        let mut best: Option<(f64, usize)> = None;
        for entry in &self.entries {
            let dist2 = (entry.point - point).magnitude2();
            if dist2 < self.close_dist2 {
                return Some((entry.index, Hit::Close));
            }
            if dist2 < self.far_dist2 && best.map_or(true, |(d, _)| dist2 < d) {
                best = Some((dist2, entry.index));
            }
        }
        best.map(|(_, index)| (index, Hit::Far))
    }

    /// Writes the remembered results to the log, with their distances from `point`.
    pub fn log(&self, point: Point2d) {
        info!(
            "search history: {} of {} entries at ({:.3}, {:.3})",
            self.entries.len(),
            self.capacity,
            point.x,
            point.y
        );
        for (i, entry) in self.entries.iter().enumerate() {
            info!(
                "  {}: ({:.3}, {:.3}), distance {:.3}, segment {}",
                i,
                entry.point.x,
                entry.point.y,
                (entry.point - point).magnitude(),
                entry.index
            );
        }
    }

    /// Remembers a result, unless it has the same index as the most recent one.
    pub fn push(&mut self, point: Point2d, index: usize) {
        if self.capacity == 0 || self.entries.front().map_or(false, |e| e.index == index) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(Entry { point, index });
    }

    /// Forgets every result and remembers only the given one.
    pub fn preload(&mut self, point: Point2d, index: usize) {
        self.entries.clear();
        self.push(point, index);
    }
}

#[cfg(test)]
mod test {
    use super::{Hit, History};
    use crate::math::Point2d;

    #[test]
    fn close_entry_wins() {
        let mut history = History::new(4);
        history.push(Point2d::new(0.0, 0.0), 0);
        history.push(Point2d::new(1.0, 0.0), 1);
        assert_eq!(history.lookup(Point2d::new(0.1, 0.0)), Some(0));
        assert_eq!(history.lookup(Point2d::new(0.6, 0.0)), Some(1));
        assert_eq!(history.lookup(Point2d::new(10.0, 0.0)), None);
        assert_eq!(history.find(Point2d::new(0.1, 0.0)), Some((0, Hit::Close)));
        assert_eq!(history.find(Point2d::new(2.0, 0.0)), Some((1, Hit::Far)));
    }

    #[test]
    fn bounded_and_deduplicated() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.push(Point2d::new(i as f64 * 10.0, 0.0), i);
            history.push(Point2d::new(i as f64 * 10.0, 1.0), i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.lookup(Point2d::new(0.0, 0.0)), None);
        assert_eq!(history.lookup(Point2d::new(40.0, 0.0)), Some(4));

        history.preload(Point2d::new(5.0, 0.0), 7);
        assert_eq!(history.len(), 1);
        assert_eq!(history.lookup(Point2d::new(5.0, 0.1)), Some(7));

        history.resize(0);
        history.push(Point2d::new(0.0, 0.0), 1);
        assert!(history.is_empty());
    }
}
