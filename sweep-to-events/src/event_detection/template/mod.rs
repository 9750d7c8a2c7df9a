//! Reference waveforms for the sliding template detector.
//!
//! A [Template] is either copied from a recorded waveform or sampled from one
//! of the closed-form [TemplateShape]s at the sampling interval of the series
//! it is matched against.
pub mod curve_fit;
pub mod scaler;

use super::Real;
use crate::{DetectionError, DetectionResult};
use ephys_common::SampleSeries;
use std::{fmt::Display, str::FromStr};

pub use curve_fit::{CurveFit, CurveFitter, refit_template};
pub use scaler::{FitResult, TemplateScaler};

/// Closed-form template generators. Times are measured from the first
/// template sample, in the time unit of the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemplateShape {
    /// `(1 - exp(-t/rise)) * exp(-t/decay)`
    Biexponential { rise: Real, decay: Real },
    /// `(t/tau) * exp(1 - t/tau)`
    Alpha { tau: Real },
    Gaussian { centre: Real, sd: Real },
    /// Linear rise to unit peak at `peak_fraction` of the duration, then linear fall.
    Triangular { peak_fraction: Real },
}

impl TemplateShape {
    pub fn parameters(&self) -> Vec<Real> {
        match *self {
            TemplateShape::Biexponential { rise, decay } => vec![rise, decay],
            TemplateShape::Alpha { tau } => vec![tau],
            TemplateShape::Gaussian { centre, sd } => vec![centre, sd],
            TemplateShape::Triangular { peak_fraction } => vec![peak_fraction],
        }
    }

    /// The same shape with its parameters replaced, in the order of [Self::parameters].
    pub fn with_parameters(&self, parameters: &[Real]) -> DetectionResult<Self> {
        let shape = match (*self, parameters) {
            (TemplateShape::Biexponential { .. }, &[rise, decay]) => {
                TemplateShape::Biexponential { rise, decay }
            }
            (TemplateShape::Alpha { .. }, &[tau]) => TemplateShape::Alpha { tau },
            (TemplateShape::Gaussian { .. }, &[centre, sd]) => TemplateShape::Gaussian { centre, sd },
            (TemplateShape::Triangular { .. }, &[peak_fraction]) => {
                TemplateShape::Triangular { peak_fraction }
            }
            _ => {
                return Err(DetectionError::LengthMismatch {
                    expected: self.parameters().len(),
                    found: parameters.len(),
                });
            }
        };
        shape.validate()?;
        Ok(shape)
    }

    fn validate(&self) -> DetectionResult<()> {
        let positive = |name, value: Real| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DetectionError::invalid_parameter(name, format!("must be positive, got {value}")))
            }
        };
        match *self {
            TemplateShape::Biexponential { rise, decay } => {
                positive("rise", rise)?;
                positive("decay", decay)
            }
            TemplateShape::Alpha { tau } => positive("tau", tau),
            TemplateShape::Gaussian { centre, sd } => {
                if !centre.is_finite() {
                    return Err(DetectionError::invalid_parameter("centre", "must be finite"));
                }
                positive("sd", sd)
            }
            TemplateShape::Triangular { peak_fraction } => {
                if (0.0..=1.0).contains(&peak_fraction) {
                    Ok(())
                } else {
                    Err(DetectionError::invalid_parameter(
                        "peak_fraction",
                        format!("must lie in [0, 1], got {peak_fraction}"),
                    ))
                }
            }
        }
    }

    fn value_at(&self, t: Real, duration: Real) -> Real {
        match *self {
            TemplateShape::Biexponential { rise, decay } => {
                (1.0 - (-t / rise).exp()) * (-t / decay).exp()
            }
            TemplateShape::Alpha { tau } => (t / tau) * (1.0 - t / tau).exp(),
            TemplateShape::Gaussian { centre, sd } => (-(t - centre).powi(2) / (2.0 * sd * sd)).exp(),
            TemplateShape::Triangular { peak_fraction } => {
                let peak = peak_fraction * duration;
                if t <= peak {
                    if peak > 0.0 { t / peak } else { 1.0 }
                } else if duration > peak {
                    (duration - t) / (duration - peak)
                } else {
                    0.0
                }
            }
        }
    }

    /// `num_samples` values at `i*dt`, without normalisation.
    pub fn sample(&self, num_samples: usize, dt: Real) -> Vec<Real> {
        let duration = num_samples.saturating_sub(1) as Real * dt;
        (0..num_samples)
            .map(|i| self.value_at(i as Real * dt, duration))
            .collect()
    }
}

impl Display for TemplateShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateShape::Biexponential { rise, decay } => write!(f, "biexponential:{rise},{decay}"),
            TemplateShape::Alpha { tau } => write!(f, "alpha:{tau}"),
            TemplateShape::Gaussian { centre, sd } => write!(f, "gaussian:{centre},{sd}"),
            TemplateShape::Triangular { peak_fraction } => write!(f, "triangular:{peak_fraction}"),
        }
    }
}

/// Parses `name:p1[,p2]`, e.g. `biexponential:0.5,3` or `alpha:2`.
impl FromStr for TemplateShape {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, parameters) = s.split_once(':').ok_or_else(|| {
            DetectionError::invalid_parameter(
                "template",
                format!("expected pattern 'shape:parameters', got '{s}'"),
            )
        })?;
        let parameters = parameters
            .split(',')
            .map(|p| p.trim().parse::<Real>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DetectionError::invalid_parameter("template", e.to_string()))?;
        let shape = match name.trim() {
            "biexponential" => TemplateShape::Biexponential {
                rise: 0.0,
                decay: 0.0,
            },
            "alpha" => TemplateShape::Alpha { tau: 0.0 },
            "gaussian" => TemplateShape::Gaussian {
                centre: 0.0,
                sd: 0.0,
            },
            "triangular" => TemplateShape::Triangular { peak_fraction: 0.0 },
            other => {
                return Err(DetectionError::invalid_parameter(
                    "template",
                    format!("unknown shape '{other}'"),
                ));
            }
        };
        shape.with_parameters(&parameters)
    }
}

/// A template as configured, before it is resolved at a sampling interval.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    Shape { shape: TemplateShape, duration: Real },
    Waveform(SampleSeries),
}

impl TemplateSource {
    pub fn resolve(&self, dt: Real) -> DetectionResult<Template> {
        match self {
            TemplateSource::Shape { shape, duration } => Template::from_shape(shape, *duration, dt),
            TemplateSource::Waveform(series) => Template::from_series(series, dt),
        }
    }
}

/// A reference waveform of at least two samples at a fixed sampling interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    values: Vec<Real>,
    dt: Real,
}

impl Template {
    /// Samples `shape` over `[0, duration)` at `dt` and scales it to unit peak.
    pub fn from_shape(shape: &TemplateShape, duration: Real, dt: Real) -> DetectionResult<Self> {
        shape.validate()?;
        if !(duration.is_finite() && duration > 0.0) {
            return Err(DetectionError::invalid_parameter(
                "template_duration",
                format!("must be positive, got {duration}"),
            ));
        }
        let num_samples = (duration / dt).round() as usize;
        if num_samples < 2 {
            return Err(DetectionError::TemplateTooShort(num_samples));
        }
        let mut values = shape.sample(num_samples, dt);
        let peak = values.iter().copied().fold(Real::NEG_INFINITY, Real::max);
        if !(peak.is_finite() && peak > 0.0) {
            return Err(DetectionError::invalid_parameter(
                "template",
                format!("{shape} has no positive peak over {duration}"),
            ));
        }
        values.iter_mut().for_each(|v| *v /= peak);
        Ok(Self { values, dt })
    }

    /// Uses a recorded waveform as is. Its sampling interval must equal `dt`.
    pub fn from_series(series: &SampleSeries, dt: Real) -> DetectionResult<Self> {
        if series.dt() != dt {
            return Err(DetectionError::SamplingIntervalMismatch {
                expected: dt,
                found: series.dt(),
            });
        }
        if series.len() < 2 {
            return Err(DetectionError::TemplateTooShort(series.len()));
        }
        Ok(Self {
            values: series.values().to_vec(),
            dt,
        })
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    /// Time spanned by the template, `len * dt`.
    pub fn duration(&self) -> Real {
        self.values.len() as Real * self.dt
    }
}
