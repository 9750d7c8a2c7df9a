pub mod metrics;
pub mod series;
pub mod tracer;

pub use series::{IntoSampleSeries, SampleSeries, SeriesError, Unit};

pub type Real = f64;
pub type SampleIndex = usize;
