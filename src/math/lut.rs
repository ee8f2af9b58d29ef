use crate::util::Interval;

/// A lookup table over evenly spaced sample positions.
#[derive(Clone, Debug)]
pub struct LookupTable<T> {
    offset: f64,
    step: f64,
    values: Vec<T>,
}

impl<T> LookupTable<T> {
    /// Creates a lookup table from a sample function.
    ///
    /// The function is sampled at `count` positions, the first at `range.min`
    /// and the last at `range.max`. Returns `None` if the range is empty or
    /// fewer than two samples are requested.
    pub fn from_samples(range: Interval<f64>, count: usize, f: impl FnMut(f64) -> T) -> Option<Self> {
        if count < 2 || !(range.length() > 0.0) {
            return None;
        }
        let offset = range.min;
        let step = range.length() / (count - 1) as f64;
        let xs = (0..count).map(|i| offset + (i as f64) * step);
        let values = xs.map(f).collect();
        Some(Self {
            offset,
            step,
            values,
        })
    }

    fn index(&self, x: f64) -> usize {
        let idx = (x - self.offset) / self.step;
        usize::min(idx as u32 as usize, self.values.len() - 1)
    }

    /// Samples the lookup table at the nearest sample position at or below `x`.
    pub fn sample(&self, x: f64) -> &T {
        &self.values[self.index(x)]
    }

    /// Gets the samples at the positions immediately below and above `x`.
    pub fn bracket(&self, x: f64) -> (&T, &T) {
        let idx = self.index(x);
        let next = usize::min(idx + 1, self.values.len() - 1);
        (&self.values[idx], &self.values[next])
    }
}

#[cfg(test)]
mod test {
    use super::LookupTable;
    use crate::util::Interval;

    #[test]
    fn basic_lut() {
        let range = Interval::new(50.0, 200.0);
        let lut = LookupTable::from_samples(range, 31, |x| 2.0 * x).unwrap();

        assert_eq!(*lut.sample(20.0), 100.0);

        assert_eq!(*lut.sample(50.0), 100.0);
        assert_eq!(*lut.sample(52.0), 100.0);
        assert_eq!(*lut.sample(54.0), 100.0);

        assert_eq!(*lut.sample(90.0), 180.0);
        assert_eq!(*lut.sample(92.0), 180.0);
        assert_eq!(*lut.sample(94.0), 180.0);

        assert_eq!(*lut.sample(197.0), 390.0);
        assert_eq!(*lut.sample(200.0), 400.0);
        assert_eq!(*lut.sample(888.0), 400.0);

        assert_eq!(lut.bracket(92.0), (&180.0, &190.0));
        assert_eq!(lut.bracket(888.0), (&400.0, &400.0));
    }

    #[test]
    fn empty_range() {
        let range = Interval::new(1.0, 1.0);
        assert!(LookupTable::from_samples(range, 10, |x| x).is_none());
    }
}
