use ephys_common::{Real, SeriesError, Unit};
use thiserror::Error;

pub type DetectionResult<T> = Result<T, DetectionError>;

/// Contract violations: the caller supplied data or configuration which the
/// engine refuses to coerce. Data-driven absence of a result (no crossing,
/// no events, degenerate fits) is never reported through this type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Invalid Series: {0}")]
    Series(#[from] SeriesError),
    #[error("Series of {actual} samples is too short, at least {required} are required")]
    SeriesTooShort { required: usize, actual: usize },
    #[error("Series lengths differ: {expected} != {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Series do not share a time base")]
    MisalignedSeries,
    #[error("Sampling intervals differ: {expected} != {found}")]
    SamplingIntervalMismatch { expected: Real, found: Real },
    #[error("Unit '{found}' is incompatible with the series unit '{expected}'")]
    IncompatibleUnits { expected: Unit, found: Unit },
    #[error("Template of {template} samples is longer than the series of {series} samples")]
    TemplateLongerThanSeries { template: usize, series: usize },
    #[error("Template must contain at least two samples, got {0}")]
    TemplateTooShort(usize),
    #[error("Smoothing window length must be odd and positive, got {0}")]
    InvalidSmoothingWindow(usize),
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl DetectionError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
