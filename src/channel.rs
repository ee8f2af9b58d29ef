//! Sampled data channels.

use cgmath::num_traits::Float;

/// An ordered sequence of samples together with the metadata describing it.
///
/// Elevation rows are stored in single precision (`Channel<f32>`), every
/// other channel in double precision.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel<T = f64> {
    pub(crate) data: Vec<T>,
    /// The first value, given by the file header or the first sample.
    pub(crate) first: f64,
    /// The last value, given by the file header or the last sample.
    pub(crate) last: f64,
    /// The sample spacing, if the channel is uniformly spaced.
    pub(crate) inc: f64,
    /// The offset added to every stored sample.
    pub(crate) mean: f64,
    /// Whether the samples have been filled in.
    pub(crate) valid: bool,
    /// Whether the channel is given by the source file rather than derived.
    pub(crate) defined: bool,
    /// The column of the record that the channel is read from.
    pub(crate) column: Option<usize>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            first: 0.0,
            last: 0.0,
            inc: 0.0,
            mean: 0.0,
            valid: false,
            defined: false,
            column: None,
        }
    }
}

impl<T: Float> Channel<T> {
    /// The number of stored samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stored samples, excluding the channel mean.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Gets the sample at `index`, including the channel mean.
    pub fn get(&self, index: usize) -> f64 {
        self.data[index].to_f64().unwrap_or(f64::NAN) + self.mean
    }

    /// Linearly interpolates between the samples at `index` and `index + 1`.
    pub fn lerp(&self, index: usize, frac: f64) -> f64 {
        let a = self.get(index);
        if frac == 0.0 {
            return a;
        }
        a + frac * (self.get(index + 1) - a)
    }

    pub fn first(&self) -> f64 {
        self.first
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn inc(&self) -> f64 {
        self.inc
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    /// Replaces the samples, marking the channel valid.
    pub(crate) fn set_data(&mut self, data: Vec<T>) {
        self.data = data;
        self.valid = true;
    }

    /// Multiplies every sample that is not NaN by `factor`.
    ///
    /// # Parameters
    /// * `factor` - The scale factor
    /// * `values_only` - If false, the first/last values, the increment and
    ///   the mean are scaled too.
    pub(crate) fn scale(&mut self, factor: f64, values_only: bool) {
        let f = T::from(factor).unwrap_or_else(T::nan);
        for value in self.data.iter_mut().filter(|value| !value.is_nan()) {
            *value = *value * f;
        }
        if !values_only {
            self.first *= factor;
            self.last *= factor;
            self.inc *= factor;
            self.mean *= factor;
        }
    }

    /// Adds `offset` to every sample and to the first and last values.
    pub(crate) fn offset(&mut self, offset: f64) {
        let d = T::from(offset).unwrap_or_else(T::nan);
        for value in self.data.iter_mut() {
            *value = *value + d;
        }
        self.first += offset;
        self.last += offset;
    }

    /// Re-centres the stored samples about their mean so that stored
    /// magnitudes stay small. NaN samples are ignored.
    pub(crate) fn normalize(&mut self) {
        let (sum, count) = self
            .data
            .iter()
            .filter_map(|value| value.to_f64())
            .filter(|value| !value.is_nan())
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
        if count == 0 {
            return;
        }
        let shift = sum / count as f64;
        if shift == 0.0 {
            return;
        }
        let d = T::from(shift).unwrap_or_else(T::nan);
        for value in self.data.iter_mut() {
            *value = *value - d;
        }
        self.mean += shift;
    }
}
