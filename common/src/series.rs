//! The single input shape seen by the detection engine.
//!
//! Whatever container a recording arrives in, it is converted exactly once,
//! at the boundary, into a [SampleSeries]. Every transform inside the engine
//! takes a `&SampleSeries` and returns a new, independently owned one.
use crate::{Real, SampleIndex};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Series must contain at least one sample")]
    Empty,
    #[error("Sampling interval must be positive and finite, got {0}")]
    InvalidSamplingInterval(Real),
    #[error("Start time must be finite, got {0}")]
    InvalidStartTime(Real),
    #[error("Slice {start}..{end} is out of bounds for a series of length {len}")]
    SliceOutOfBounds {
        start: SampleIndex,
        end: SampleIndex,
        len: usize,
    },
}

/// Physical unit attached to sample values or times, identified by its symbol.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(String);

impl Unit {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }

    /// The quotient unit, e.g. `mV` per `ms` gives `mV/ms`.
    pub fn per(&self, other: &Unit) -> Unit {
        Unit(format!("{0}/{1}", self.0, other.0))
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Unit {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Unit::new(s.trim()))
    }
}

#[derive(Deserialize)]
struct UncheckedSeries {
    values: Vec<Real>,
    dt: Real,
    #[serde(default)]
    t0: Real,
    value_unit: Unit,
    time_unit: Unit,
}

impl TryFrom<UncheckedSeries> for SampleSeries {
    type Error = SeriesError;

    fn try_from(raw: UncheckedSeries) -> Result<Self, Self::Error> {
        SampleSeries::new(raw.values, raw.dt, raw.t0, raw.value_unit, raw.time_unit)
    }
}

/// One channel's samples on a uniform time base.
///
/// Invariants, checked on construction: at least one sample, `dt` positive
/// and finite, `t0` finite. The time of sample `i` is `t0 + i*dt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedSeries")]
pub struct SampleSeries {
    values: Vec<Real>,
    dt: Real,
    t0: Real,
    value_unit: Unit,
    time_unit: Unit,
}

impl SampleSeries {
    pub fn new(
        values: Vec<Real>,
        dt: Real,
        t0: Real,
        value_unit: Unit,
        time_unit: Unit,
    ) -> Result<Self, SeriesError> {
        if values.is_empty() {
            return Err(SeriesError::Empty);
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SeriesError::InvalidSamplingInterval(dt));
        }
        if !t0.is_finite() {
            return Err(SeriesError::InvalidStartTime(t0));
        }
        Ok(Self {
            values,
            dt,
            t0,
            value_unit,
            time_unit,
        })
    }

    /// Builds a series on the same time base and with the same units as `self`.
    pub fn derive(&self, values: Vec<Real>, t0: Real) -> Result<Self, SeriesError> {
        Self::new(
            values,
            self.dt,
            t0,
            self.value_unit.clone(),
            self.time_unit.clone(),
        )
    }

    /// As [Self::derive], but with a different value unit.
    pub fn derive_with_unit(
        &self,
        values: Vec<Real>,
        t0: Real,
        value_unit: Unit,
    ) -> Result<Self, SeriesError> {
        Self::new(values, self.dt, t0, value_unit, self.time_unit.clone())
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

    pub fn t0(&self) -> Real {
        self.t0
    }

    pub fn value_unit(&self) -> &Unit {
        &self.value_unit
    }

    pub fn time_unit(&self) -> &Unit {
        &self.time_unit
    }

    pub fn time_at(&self, index: SampleIndex) -> Real {
        self.t0 + index as Real * self.dt
    }

    /// Time of the final sample.
    pub fn end_time(&self) -> Real {
        self.time_at(self.values.len() - 1)
    }

    /// Index of the sample nearest to `time`, if `time` lies on the series.
    pub fn index_at(&self, time: Real) -> Option<SampleIndex> {
        let position = ((time - self.t0) / self.dt).round();
        (position >= 0.0 && position < self.values.len() as Real).then_some(position as usize)
    }

    /// True if this series shares its time base (length, `dt`, `t0`) with `other`.
    pub fn is_aligned_with(&self, other: &SampleSeries) -> bool {
        self.values.len() == other.values.len() && self.dt == other.dt && self.t0 == other.t0
    }

    /// Copies the samples in `start..end` into a new series.
    pub fn slice(&self, start: SampleIndex, end: SampleIndex) -> Result<Self, SeriesError> {
        let values = self
            .values
            .get(start..end)
            .filter(|values| !values.is_empty())
            .ok_or(SeriesError::SliceOutOfBounds {
                start,
                end,
                len: self.values.len(),
            })?;
        self.derive(values.to_vec(), self.time_at(start))
    }

    /// Iterates over `(time, value)` pairs.
    pub fn iter_timed(&self) -> impl Iterator<Item = (Real, Real)> + Clone + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (self.time_at(i), *v))
    }
}

/// Implemented once for each external container that can supply a channel.
pub trait IntoSampleSeries {
    fn into_sample_series(self) -> Result<SampleSeries, SeriesError>;
}

impl IntoSampleSeries for SampleSeries {
    fn into_sample_series(self) -> Result<SampleSeries, SeriesError> {
        Ok(self)
    }
}
