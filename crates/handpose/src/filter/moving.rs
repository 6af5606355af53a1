//! Simple moving average over a ring buffer.

use super::{Average, Filter};

/// Moving Average over a fixed history of values (FIR filter).
///
/// All values are weighted equally. The history always holds exactly `capacity` values: the first
/// value pushed into an empty filter is copied into every slot, so the average is immediately
/// meaningful instead of ramping up from zero. Every later value replaces the oldest one.
#[derive(Debug, Clone)]
pub struct MovingAvg<V> {
    slots: Vec<V>,
    capacity: usize,
    /// Index of the slot the next value is written to.
    cursor: usize,
}

impl<V: Average> MovingAvg<V> {
    /// Creates a new moving average calculator that averages the last `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert_ne!(capacity, 0, "moving average capacity must be non-zero");
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Returns the number of values that are averaged.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no value has been pushed since construction or the last reset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Records a sample, overwriting the oldest one.
    pub fn record(&mut self, value: V) {
        if self.slots.is_empty() {
            self.slots.resize(self.capacity, value);
        } else {
            self.slots[self.cursor] = value;
        }

        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Computes the arithmetic mean of all slots.
    ///
    /// Returns [`None`] if no value has been recorded yet.
    pub fn current_average(&self) -> Option<V> {
        let (first, rest) = self.slots.split_first()?;
        let mut acc = first.clone();
        for value in rest {
            acc.accumulate(value);
        }
        acc.divide(self.capacity as f32);
        Some(acc)
    }
}

impl<V: Average> Filter<V> for MovingAvg<V> {
    fn push(&mut self, value: V) -> V {
        self.record(value);
        match self.current_average() {
            Some(avg) => avg,
            None => unreachable!("moving average is empty after recording a value"),
        }
    }

    fn reset(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::*;

    #[test]
    fn test_moving_avg() {
        let mut moving_avg = MovingAvg::new(2);
        assert_eq!(moving_avg.push(1.0), 1.0);
        assert_eq!(moving_avg.push(1.0), 1.0);
        assert_eq!(moving_avg.push(0.0), 0.5);
        assert_eq!(moving_avg.push(0.0), 0.0);
    }

    #[test]
    fn first_value_seeds_every_slot() {
        let mut avg = MovingAvg::new(4);
        assert!(avg.current_average().is_none());
        assert_eq!(avg.push(8.0), 8.0);
        assert_eq!(avg.push(0.0), 6.0);
    }

    #[test]
    fn constant_input_is_reproduced() {
        let sample = [Vector3::new(1.5, -2.0, 0.25), Vector3::new(3.0, 4.0, -0.5)];
        let mut avg = MovingAvg::new(3);
        for _ in 0..3 {
            avg.record(sample);
        }
        assert_eq!(avg.current_average(), Some(sample));
    }

    #[test]
    fn sliding_window_evicts_oldest() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let capacity = 5;
        let samples = (0..capacity + 1)
            .map(|_| rng.f32() * 100.0)
            .collect::<Vec<_>>();

        let mut avg = MovingAvg::new(capacity);
        for &s in &samples {
            avg.record(s);
        }

        let expected = samples[1..].iter().sum::<f32>() / capacity as f32;
        assert_relative_eq!(avg.current_average().unwrap(), expected, epsilon = 1e-4);

        // Pushing the same tail into a fresh buffer yields the same average: nothing of the first
        // sample is left over.
        let mut fresh = MovingAvg::new(capacity);
        for &s in &samples[1..] {
            fresh.record(s);
        }
        assert_relative_eq!(
            avg.current_average().unwrap(),
            fresh.current_average().unwrap(),
            epsilon = 1e-4
        );
    }

    #[test]
    fn reset_clears_history() {
        let mut avg = MovingAvg::new(2);
        avg.push(10.0);
        avg.reset();
        assert!(avg.is_empty());
        assert_eq!(avg.push(2.0), 2.0);
    }

    #[test]
    #[should_panic]
    fn zero_capacity() {
        MovingAvg::<f32>::new(0);
    }
}
