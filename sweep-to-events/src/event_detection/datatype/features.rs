use crate::event_detection::Real;
use ephys_common::Unit;
use serde::Serialize;
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Names of the per-event measurements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    OnsetValue,
    PeakValue,
    Amplitude,
    HalfMaxValue,
    QuarterMaxValue,
    DurationAtZero,
    DurationAtOnset,
    HalfMaxDuration,
    QuarterMaxDuration,
    ReferenceLevelDuration,
    MaxRateOfRise,
    Scale,
    Offset,
    StandardError,
    DetectionStatistic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub value: Real,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: Real, unit: Unit) -> Self {
        Self { value, unit }
    }
}

/// Measurements of one event. A feature which could not be measured is
/// absent rather than stored as `NaN`.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeMap<Feature, Quantity>);

impl FeatureSet {
    /// Records `value` if it is present and finite.
    pub fn insert(&mut self, feature: Feature, value: Option<Real>, unit: &Unit) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.0.insert(feature, Quantity::new(value, unit.clone()));
        }
    }

    pub fn get(&self, feature: Feature) -> Option<&Quantity> {
        self.0.get(&feature)
    }

    pub fn value(&self, feature: Feature) -> Option<Real> {
        self.get(feature).map(|quantity| quantity.value)
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains_key(&feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Feature, &Quantity)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn absent_and_non_finite_values_are_skipped() {
        let unit = Unit::new("mV");
        let mut features = FeatureSet::default();
        features.insert(Feature::PeakValue, Some(30.0), &unit);
        features.insert(Feature::HalfMaxDuration, None, &unit);
        features.insert(Feature::Amplitude, Some(Real::NAN), &unit);
        assert_eq!(features.len(), 1);
        assert_eq!(features.value(Feature::PeakValue), Some(30.0));
        assert!(!features.contains(Feature::Amplitude));
    }

    #[test]
    fn names() {
        assert_eq!(Feature::MaxRateOfRise.to_string(), "max_rate_of_rise");
        assert_eq!(
            Feature::from_str("half_max_duration"),
            Ok(Feature::HalfMaxDuration)
        );
        let mut features = FeatureSet::default();
        features.insert(Feature::OnsetValue, Some(-60.0), &Unit::new("mV"));
        assert_eq!(
            serde_json::to_string(&features).unwrap(),
            r#"{"onset_value":{"value":-60.0,"unit":"mV"}}"#
        );
    }
}
