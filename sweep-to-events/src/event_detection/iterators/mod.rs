pub mod event;

use super::detectors::Detector;
pub use event::{EventFilter, EventIter};
