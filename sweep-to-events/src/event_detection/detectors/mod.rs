pub mod action_potential;
pub mod sliding_template;
pub mod threshold_regions;

pub use action_potential::ActionPotentialDetector;
pub use sliding_template::SlidingTemplateDetector;
pub use threshold_regions::{ThresholdRegion, at_or_above, threshold_regions};

/// A state machine fed one `(time, value)` pair at a time.
pub trait Detector {
    type TimeType: Copy;
    type ValueType;
    type EventType;

    fn signal(&mut self, time: Self::TimeType, value: Self::ValueType) -> Option<Self::EventType>;

    /// Called once after the final sample, to flush any event still open.
    fn finish(&mut self) -> Option<Self::EventType>;
}
