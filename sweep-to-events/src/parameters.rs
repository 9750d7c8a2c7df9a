use crate::{
    DetectionError, DetectionResult,
    event_detection::{Real, template::TemplateShape, window::SmoothingWindowSize},
};
use clap::{Args, Subcommand};
use ephys_common::Unit;
use std::{path::PathBuf, str::FromStr};
use strum::{Display, EnumString};

/// How a decay root is estimated when the waveform never falls back below the target value.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DecayInterceptStrategy {
    /// Extrapolate the falling slope at the reference level.
    #[default]
    Linear,
    /// Use the lower of the two histogram states as a pseudo-baseline.
    Levels,
}

/// Level on the falling phase whose slope is extrapolated by [DecayInterceptStrategy::Linear].
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum DecayReferenceLevel {
    #[default]
    HalfMax,
    QuarterMax,
    Zero,
    Scalar(Real),
}

impl FromStr for DecayReferenceLevel {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "half_max" => Ok(Self::HalfMax),
            "quarter_max" => Ok(Self::QuarterMax),
            "zero" => Ok(Self::Zero),
            other => other.parse::<Real>().map(Self::Scalar).map_err(|_| {
                DetectionError::invalid_parameter(
                    "decay_reference_level",
                    format!("expected 'half_max', 'quarter_max', 'zero' or a number, got '{s}'"),
                )
            }),
        }
    }
}

/// A caller-chosen level at which an extra duration is measured.
/// If `relative`, `value` is added to each waveform's onset value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLevel {
    pub value: Real,
    pub unit: Unit,
    pub relative: bool,
}

/// Parses `value,unit[,relative]`, e.g. `-20,mV` or `15,mV,relative`.
impl FromStr for ReferenceLevel {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals: Vec<_> = s.split(',').map(str::trim).collect();
        let relative = match vals.get(2).copied() {
            None => false,
            Some("relative") => true,
            Some("absolute") => false,
            Some(other) => {
                return Err(DetectionError::invalid_parameter(
                    "reference_level",
                    format!("expected 'relative' or 'absolute', got '{other}'"),
                ));
            }
        };
        match vals.as_slice() {
            [value, unit] | [value, unit, _] => Ok(ReferenceLevel {
                value: value.parse().map_err(|e: std::num::ParseFloatError| {
                    DetectionError::invalid_parameter("reference_level", e.to_string())
                })?,
                unit: Unit::new(*unit),
                relative,
            }),
            _ => Err(DetectionError::invalid_parameter(
                "reference_level",
                format!("expected pattern 'value,unit[,relative]', got '{s}'"),
            )),
        }
    }
}

/// Threshold applied to the detection statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionThreshold {
    Absolute(Real),
    /// A multiple of the root mean square of the finite statistic values.
    RmsMultiple(Real),
}

impl Default for DetectionThreshold {
    fn default() -> Self {
        Self::RmsMultiple(4.0)
    }
}

/// Parses a number, `rms` or `rms:multiple`.
impl FromStr for DetectionThreshold {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |value: &str| {
            value.trim().parse::<Real>().map_err(|e| {
                DetectionError::invalid_parameter("detection_threshold", e.to_string())
            })
        };
        match s.trim().split_once(':') {
            Some(("rms", multiple)) => parse(multiple).map(Self::RmsMultiple),
            Some(_) => Err(DetectionError::invalid_parameter(
                "detection_threshold",
                format!("expected a number or 'rms:multiple', got '{s}'"),
            )),
            None if s.trim() == "rms" => Ok(Self::default()),
            None => parse(s).map(Self::Absolute),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ActionPotentialParameters {
    /// Rate of rise, in value units per time unit, above which a candidate onset is declared.
    #[clap(long, default_value = "10")]
    pub derivative_threshold: Real,

    /// Odd number of samples in the moving average applied to the derivative.
    #[clap(long)]
    pub smoothing_window: Option<SmoothingWindowSize>,

    /// Sampling interval for which the smoothing window was chosen.
    /// If given, the window is rescaled to each sweep's sampling interval.
    #[clap(long)]
    pub smoothing_reference_dt: Option<Real>,

    /// Shortest accepted interval from onset to the derivative peak. Defaults to ten sampling intervals.
    #[clap(long)]
    pub min_fast_rise_duration: Option<Real>,

    /// Events whose onset follows the previous accepted onset more closely than this are dropped.
    #[clap(long)]
    pub min_inter_event_interval: Option<Real>,

    /// The trace must exceed this value between consecutive candidate onsets.
    #[clap(long, default_value = "0", allow_negative_numbers = true)]
    pub vm_threshold: Real,
}

impl Default for ActionPotentialParameters {
    fn default() -> Self {
        Self {
            derivative_threshold: 10.0,
            smoothing_window: None,
            smoothing_reference_dt: None,
            min_fast_rise_duration: None,
            min_inter_event_interval: None,
            vm_threshold: 0.0,
        }
    }
}

impl ActionPotentialParameters {
    pub fn validate(&self) -> DetectionResult<()> {
        if !self.derivative_threshold.is_finite() {
            return Err(DetectionError::invalid_parameter(
                "derivative_threshold",
                "must be finite",
            ));
        }
        let durations = [
            ("smoothing_reference_dt", self.smoothing_reference_dt),
            ("min_fast_rise_duration", self.min_fast_rise_duration),
            ("min_inter_event_interval", self.min_inter_event_interval),
        ];
        for (name, duration) in durations {
            if let Some(duration) = duration.filter(|d| !(d.is_finite() && *d >= 0.0)) {
                return Err(DetectionError::invalid_parameter(
                    name,
                    format!("must be non-negative, got {duration}"),
                ));
            }
        }
        if self.smoothing_reference_dt == Some(0.0) {
            return Err(DetectionError::invalid_parameter(
                "smoothing_reference_dt",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// The smoothing window to use for a sweep sampled at `dt`.
    pub fn smoothing_for(&self, dt: Real) -> Option<SmoothingWindowSize> {
        match (self.smoothing_window, self.smoothing_reference_dt) {
            (Some(size), Some(reference_dt)) => Some(size.rescaled(reference_dt, dt)),
            (size, _) => size,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExtractionParameters {
    /// Time before each onset included in its waveform.
    #[clap(long, default_value = "1")]
    pub before: Real,

    /// Time after each onset included in its waveform.
    #[clap(long, default_value = "4")]
    pub after: Real,

    /// Shorten `after` to the smallest interval between detected onsets, where that is smaller.
    #[clap(long)]
    pub use_min_detected_isi: bool,
}

impl Default for ExtractionParameters {
    fn default() -> Self {
        Self {
            before: 1.0,
            after: 4.0,
            use_min_detected_isi: false,
        }
    }
}

impl ExtractionParameters {
    pub fn validate(&self) -> DetectionResult<()> {
        for (name, duration) in [("before", self.before), ("after", self.after)] {
            if !(duration.is_finite() && duration >= 0.0) {
                return Err(DetectionError::invalid_parameter(
                    name,
                    format!("must be non-negative, got {duration}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
pub struct FeatureParameters {
    /// Interpolate root times between samples.
    #[clap(long)]
    pub interpolate_roots: bool,

    /// Either `linear` or `levels`.
    #[clap(long, default_value = "linear")]
    pub decay_intercept_strategy: DecayInterceptStrategy,

    /// Either `half_max`, `quarter_max`, `zero` or a value.
    #[clap(long, default_value = "half_max", allow_negative_numbers = true)]
    pub decay_reference_level: DecayReferenceLevel,

    /// Number of histogram bins used by the `levels` strategy.
    #[clap(long, default_value = "100")]
    pub histogram_bins: usize,

    /// Extra level at which to measure a duration, as `value,unit[,relative]`.
    #[clap(long, allow_hyphen_values = true)]
    pub reference_level: Option<ReferenceLevel>,
}

impl Default for FeatureParameters {
    fn default() -> Self {
        Self {
            interpolate_roots: false,
            decay_intercept_strategy: DecayInterceptStrategy::Linear,
            decay_reference_level: DecayReferenceLevel::HalfMax,
            histogram_bins: 100,
            reference_level: None,
        }
    }
}

impl FeatureParameters {
    pub fn validate(&self) -> DetectionResult<()> {
        if self.histogram_bins < 2 {
            return Err(DetectionError::invalid_parameter(
                "histogram_bins",
                format!("at least two bins are required, got {}", self.histogram_bins),
            ));
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone, Args)]
pub struct ActionPotentialSettings {
    #[command(flatten)]
    pub detection: ActionPotentialParameters,

    #[command(flatten)]
    pub extraction: ExtractionParameters,

    #[command(flatten)]
    pub features: FeatureParameters,
}

impl ActionPotentialSettings {
    pub fn validate(&self) -> DetectionResult<()> {
        self.detection.validate()?;
        self.extraction.validate()?;
        self.features.validate()
    }
}

#[derive(Debug, Clone, Args)]
pub struct TemplateParameters {
    /// Closed-form template, e.g. `biexponential:0.5,3`, `alpha:2`, `gaussian:5,1` or `triangular:0.3`.
    #[clap(long, conflicts_with = "template_file", required_unless_present = "template_file")]
    pub shape: Option<TemplateShape>,

    /// Duration over which the closed-form template is sampled.
    #[clap(long, default_value = "10")]
    pub duration: Real,

    /// JSON file holding a recorded template waveform.
    #[clap(long)]
    pub template_file: Option<PathBuf>,

    /// A value, or `rms:multiple` for a multiple of the statistic's root mean square.
    #[clap(long, default_value = "rms:4")]
    pub detection_threshold: DetectionThreshold,

    /// Extend the data by its final samples so the statistic covers every sample.
    #[clap(long)]
    pub pad_tail: bool,

    /// Copy waveforms from each sweep's raw channel, where one is present.
    #[clap(long)]
    pub extract_from_raw: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    #[clap(
        about = "Detects action potentials by thresholding the smoothed derivative, then measures each waveform."
    )]
    ActionPotential(ActionPotentialSettings),
    #[clap(
        about = "Detects events by optimally scaling a template against a sliding window of the sweep."
    )]
    Template(TemplateParameters),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_reference_levels() {
        assert_eq!("half_max".parse(), Ok(DecayReferenceLevel::HalfMax));
        assert_eq!("quarter_max".parse(), Ok(DecayReferenceLevel::QuarterMax));
        assert_eq!("zero".parse(), Ok(DecayReferenceLevel::Zero));
        assert_eq!("-12.5".parse(), Ok(DecayReferenceLevel::Scalar(-12.5)));
        assert!("halfmax".parse::<DecayReferenceLevel>().is_err());
    }

    #[test]
    fn decay_intercept_strategies() {
        assert_eq!("levels".parse(), Ok(DecayInterceptStrategy::Levels));
        assert_eq!(DecayInterceptStrategy::Linear.to_string(), "linear");
    }

    #[test]
    fn reference_levels() {
        assert_eq!(
            "-20,mV".parse(),
            Ok(ReferenceLevel {
                value: -20.0,
                unit: Unit::new("mV"),
                relative: false
            })
        );
        assert_eq!(
            "15, mV, relative".parse(),
            Ok(ReferenceLevel {
                value: 15.0,
                unit: Unit::new("mV"),
                relative: true
            })
        );
        assert!("15".parse::<ReferenceLevel>().is_err());
        assert!("15,mV,sideways".parse::<ReferenceLevel>().is_err());
        assert!("x,mV".parse::<ReferenceLevel>().is_err());
    }

    #[test]
    fn detection_thresholds() {
        assert_eq!("3.5".parse(), Ok(DetectionThreshold::Absolute(3.5)));
        assert_eq!("rms".parse(), Ok(DetectionThreshold::RmsMultiple(4.0)));
        assert_eq!("rms:2.5".parse(), Ok(DetectionThreshold::RmsMultiple(2.5)));
        assert!("std:2".parse::<DetectionThreshold>().is_err());
    }

    #[test]
    fn smoothing_is_rescaled() {
        let parameters = ActionPotentialParameters {
            smoothing_window: Some(SmoothingWindowSize::new(5).unwrap()),
            smoothing_reference_dt: Some(0.1),
            ..Default::default()
        };
        assert_eq!(parameters.smoothing_for(0.05).map(|s| s.get()), Some(11));
        let parameters = ActionPotentialParameters {
            smoothing_reference_dt: None,
            ..parameters
        };
        assert_eq!(parameters.smoothing_for(0.05).map(|s| s.get()), Some(5));
    }

    #[test]
    fn validation() {
        assert!(ActionPotentialSettings::default().validate().is_ok());
        let parameters = ActionPotentialParameters {
            min_fast_rise_duration: Some(-1.0),
            ..Default::default()
        };
        assert!(parameters.validate().is_err());
        let features = FeatureParameters {
            histogram_bins: 1,
            ..Default::default()
        };
        assert!(features.validate().is_err());
    }
}
