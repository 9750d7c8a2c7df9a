use super::Detector;
use crate::event_detection::{EventFilter, Real};
use ephys_common::SampleIndex;
use serde::Serialize;
use std::ops::Range;

/// A maximal run of indices satisfying a predicate. `end` is exclusive,
/// and absent when the run reaches the end of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdRegion {
    pub start: SampleIndex,
    pub end: Option<SampleIndex>,
}

impl ThresholdRegion {
    pub fn end_or(&self, len: usize) -> SampleIndex {
        self.end.unwrap_or(len)
    }

    pub fn indices(&self, len: usize) -> Range<SampleIndex> {
        self.start..self.end_or(len)
    }
}

/// The "≥ threshold" predicate. `NaN` never satisfies it.
pub fn at_or_above(threshold: Real) -> impl Fn(Real) -> bool + Clone {
    move |value| value >= threshold
}

#[derive(Clone)]
pub struct RegionDetector<P>
where
    P: Fn(Real) -> bool,
{
    predicate: P,
    start: Option<SampleIndex>,
}

impl<P> RegionDetector<P>
where
    P: Fn(Real) -> bool,
{
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            start: None,
        }
    }
}

impl<P> Detector for RegionDetector<P>
where
    P: Fn(Real) -> bool,
{
    type TimeType = SampleIndex;
    type ValueType = Real;
    type EventType = ThresholdRegion;

    fn signal(&mut self, index: SampleIndex, value: Real) -> Option<ThresholdRegion> {
        match (self.start, (self.predicate)(value)) {
            (None, true) => {
                self.start = Some(index);
                None
            }
            (Some(start), false) => {
                self.start = None;
                Some(ThresholdRegion {
                    start,
                    end: Some(index),
                })
            }
            _ => None,
        }
    }

    fn finish(&mut self) -> Option<ThresholdRegion> {
        self.start
            .take()
            .map(|start| ThresholdRegion { start, end: None })
    }
}

/// Returns, in order, the maximal runs of `values` satisfying `predicate`.
/// A run touching index 0 starts at 0; a run touching the last index has no `end`.
pub fn threshold_regions<P>(values: &[Real], predicate: P) -> Vec<ThresholdRegion>
where
    P: Fn(Real) -> bool,
{
    values
        .iter()
        .copied()
        .enumerate()
        .events(RegionDetector::new(predicate))
        .collect()
}
