pub mod event_train;
pub mod features;

pub use event_train::{DetectedEvent, EventTrain, Waveform};
pub use features::{Feature, FeatureSet, Quantity};
