//! Exponential Moving Average.

use super::Filter;

/// An Exponential Moving Average (EMA) filter over scalars.
///
/// Used to average stage timings. Landmark and palm estimates use [`super::MovingAvg`] instead.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f32,
    last: Option<f32>,
}

impl Ema {
    /// Creates a new Exponential Moving Average filter.
    ///
    /// `alpha` defines how quickly the weight of older values decays. Values closer to 1.0 favor
    /// recent values.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in between 0.0 and 1.0.
    pub fn new(alpha: f32) -> Self {
        assert!((0.0..=1.0).contains(&alpha), "EMA alpha out of range: {alpha}");
        Self { alpha, last: None }
    }

    /// Returns the last filtered value, if any.
    pub fn last(&self) -> Option<f32> {
        self.last
    }
}

impl Filter<f32> for Ema {
    fn push(&mut self, value: f32) -> f32 {
        let avg = match self.last {
            Some(last) => self.alpha * value + (1.0 - self.alpha) * last,
            None => value,
        };
        self.last = Some(avg);
        avg
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema() {
        let mut filter = Ema::new(0.5);
        assert_eq!(filter.push(1.0), 1.0);
        assert_eq!(filter.push(2.0), 1.5);
        assert_eq!(filter.push(2.0), 1.75);

        filter.reset();
        assert_eq!(filter.last(), None);
        assert_eq!(filter.push(4.0), 4.0);
    }
}
