use super::{
    Real,
    window::{FiniteDifference, SmoothingWindow, SmoothingWindowSize, WindowFilter},
};
use crate::{DetectionError, DetectionResult};
use ephys_common::SampleSeries;

/// Discrete differentiation of a [SampleSeries], optionally followed by a
/// symmetric moving average after each differentiation stage.
#[derive(Default, Debug, Clone, Copy)]
pub struct Differentiator {
    smoothing: Option<SmoothingWindowSize>,
}

impl Differentiator {
    pub fn new(smoothing: Option<SmoothingWindowSize>) -> Self {
        Self { smoothing }
    }

    pub fn smoothing(&self) -> Option<SmoothingWindowSize> {
        self.smoothing
    }

    /// Minimum series length for which [Self::derivative] of `order` is non-empty.
    pub fn required_length(&self, order: usize) -> usize {
        1 + order * (1 + self.smoothing.map(|s| s.get() - 1).unwrap_or_default())
    }

    /// Sample `i` is `(s[i+1] - s[i])/dt`, attributed to `t0 + i*dt`,
    /// smoothed if a window is configured.
    pub fn first_derivative(&self, series: &SampleSeries) -> DetectionResult<SampleSeries> {
        self.derivative(series, 1)
    }

    /// The first derivative applied twice, smoothing after each stage.
    pub fn second_derivative(&self, series: &SampleSeries) -> DetectionResult<SampleSeries> {
        self.derivative(series, 2)
    }

    pub fn derivative(&self, series: &SampleSeries, order: usize) -> DetectionResult<SampleSeries> {
        let required = self.required_length(order);
        if series.len() < required {
            return Err(DetectionError::SeriesTooShort {
                required,
                actual: series.len(),
            });
        }
        (0..order).try_fold(series.clone(), |stage, _| self.differentiate_once(&stage))
    }

    fn differentiate_once(&self, series: &SampleSeries) -> DetectionResult<SampleSeries> {
        let differences = series
            .iter_timed()
            .window(FiniteDifference::new(1, series.dt()));
        let (times, values): (Vec<Real>, Vec<Real>) = match self.smoothing {
            Some(size) => differences
                .window(SmoothingWindow::new(size, series.dt()))
                .unzip(),
            None => differences.unzip(),
        };
        let t0 = times.first().copied().ok_or(DetectionError::SeriesTooShort {
            required: self.required_length(1),
            actual: series.len(),
        })?;
        let unit = series.value_unit().per(series.time_unit());
        Ok(series.derive_with_unit(values, t0, unit)?)
    }
}
