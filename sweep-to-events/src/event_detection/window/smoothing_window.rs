use super::{Real, Window};
use crate::{DetectionError, DetectionResult};
use std::{collections::VecDeque, fmt::Display, str::FromStr};

/// Length, in samples, of a symmetric moving-average window. Always odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingWindowSize(usize);

impl SmoothingWindowSize {
    pub fn new(size: usize) -> DetectionResult<Self> {
        if size % 2 == 1 {
            Ok(Self(size))
        } else {
            Err(DetectionError::InvalidSmoothingWindow(size))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Number of samples either side of the centre sample.
    pub fn half_width(self) -> usize {
        (self.0 - 1) / 2
    }

    /// Rescales a window defined at `reference_dt` to cover the same time span
    /// at `dt`. The result is rounded and then forced odd.
    pub fn rescaled(self, reference_dt: Real, dt: Real) -> Self {
        let size = ((self.0 as Real * reference_dt / dt).round() as usize).max(1);
        Self(if size % 2 == 0 { size + 1 } else { size })
    }
}

impl Display for SmoothingWindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SmoothingWindowSize {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size = s
            .trim()
            .parse::<usize>()
            .map_err(|e| DetectionError::invalid_parameter("smoothing_window", e.to_string()))?;
        Self::new(size)
    }
}

/// Centred moving average. Each output is the mean of `size` consecutive
/// inputs, attributed to the time of the centre sample, so a series of
/// `n` samples yields `n - size + 1` outputs.
#[derive(Default, Clone)]
pub struct SmoothingWindow {
    sum: Real,
    size: usize,
    half_width_time: Real,
    window: VecDeque<Real>,
}

impl SmoothingWindow {
    pub fn new(size: SmoothingWindowSize, dt: Real) -> Self {
        SmoothingWindow {
            window: VecDeque::<Real>::with_capacity(size.get()),
            size: size.get(),
            half_width_time: size.half_width() as Real * dt,
            ..Default::default()
        }
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.size
    }

    #[cfg(test)]
    pub fn test_mean(&self) -> Real {
        self.window.iter().sum::<Real>() / self.size as Real
    }
}

impl Window for SmoothingWindow {
    type InputType = Real;
    type OutputType = Real;

    fn push(&mut self, value: Real) -> bool {
        if self.is_full() {
            let old = self.window.pop_front().unwrap_or_default();
            self.sum -= old;
        }
        self.sum += value;
        self.window.push_back(value);
        self.is_full()
    }

    fn output(&self) -> Option<Real> {
        self.is_full().then(|| self.sum / self.size as Real)
    }

    fn apply_time_shift(&self, time: Real) -> Real {
        time - self.half_width_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detection::window::WindowFilter;
    use assert_approx_eq::assert_approx_eq;

    fn enumerate_real(data: &[Real]) -> impl Iterator<Item = (Real, Real)> + Clone + '_ {
        data.iter().enumerate().map(|(i, v)| (i as Real, *v))
    }

    #[test]
    fn even_sizes_are_rejected() {
        assert_eq!(
            SmoothingWindowSize::new(0),
            Err(DetectionError::InvalidSmoothingWindow(0))
        );
        assert_eq!(
            SmoothingWindowSize::new(4),
            Err(DetectionError::InvalidSmoothingWindow(4))
        );
        assert!("4".parse::<SmoothingWindowSize>().is_err());
        assert_eq!(
            "5".parse::<SmoothingWindowSize>(),
            Ok(SmoothingWindowSize(5))
        );
    }

    #[test]
    fn rescaling_stays_odd() {
        let size = SmoothingWindowSize::new(5).unwrap();
        assert_eq!(size.rescaled(0.1, 0.1).get(), 5);
        // 5 * 0.1 / 0.05 = 10 -> 11
        assert_eq!(size.rescaled(0.1, 0.05).get(), 11);
        // 5 * 0.1 / 0.2 = 2.5 -> 3
        assert_eq!(size.rescaled(0.1, 0.2).get(), 3);
        assert_eq!(size.rescaled(0.1, 10.0).get(), 1);
    }

    #[test]
    fn size_one_is_identity() {
        let data = [4.0, 3.0, 2.0];
        let size = SmoothingWindowSize::new(1).unwrap();
        let output: Vec<_> = enumerate_real(&data)
            .window(SmoothingWindow::new(size, 1.0))
            .collect();
        assert_eq!(output, vec![(0.0, 4.0), (1.0, 3.0), (2.0, 2.0)]);
    }

    #[test]
    fn insufficient_data() {
        let data = [4.0, 3.0];
        let size = SmoothingWindowSize::new(3).unwrap();
        assert!(
            enumerate_real(&data)
                .window(SmoothingWindow::new(size, 1.0))
                .next()
                .is_none()
        );
    }

    #[test]
    fn five_data_three_window() {
        let data = [4.0, 3.0, 1.0, 5.0, 3.0];
        let size = SmoothingWindowSize::new(3).unwrap();
        let output: Vec<_> = enumerate_real(&data)
            .window(SmoothingWindow::new(size, 1.0))
            .collect();
        assert_eq!(output.len(), 3);
        assert_eq!(output[0].0, 1.0);
        assert_approx_eq!(output[0].1, 8. / 3.);
        assert_eq!(output[1].0, 2.0);
        assert_approx_eq!(output[1].1, 3.0);
        assert_eq!(output[2].0, 3.0);
        assert_approx_eq!(output[2].1, 3.0);
    }

    #[test]
    fn running_sum_matches_direct_mean() {
        use rand::{Rng, SeedableRng, rngs::StdRng};
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<Real> = (0..1000).map(|_| rng.random::<Real>()).collect();

        for size in (1..61).step_by(2) {
            let window = SmoothingWindow::new(SmoothingWindowSize::new(size).unwrap(), 1.0);
            let mut itr = enumerate_real(&data).window(window);
            while let Some((_, mean)) = itr.next() {
                assert_approx_eq!(mean, itr.get_window().test_mean());
            }
        }
    }
}
