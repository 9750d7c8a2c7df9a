//! Detection and measurement of fast transients in single-channel sweeps.
//!
//! Two detectors are provided. [ActionPotentialDetector] thresholds the
//! smoothed first derivative of the trace, and its events are measured by
//! [FeatureAnalyzer]. [SlidingTemplateDetector] fits a template to every
//! window of the sweep and thresholds the resulting detection statistic.
//!
//! [ActionPotentialDetector]: event_detection::detectors::ActionPotentialDetector
//! [FeatureAnalyzer]: event_detection::analysis::FeatureAnalyzer
//! [SlidingTemplateDetector]: event_detection::detectors::SlidingTemplateDetector
mod error;
pub mod event_detection;
pub(crate) mod metrics;
pub mod parameters;
pub mod processing;
pub mod sweeps;
#[cfg(test)]
mod tests;

pub use error::{DetectionError, DetectionResult};
