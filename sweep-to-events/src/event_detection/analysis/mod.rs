pub mod extraction;
pub mod features;
pub mod levels;
pub mod roots;

pub use extraction::extract_action_potentials;
pub use features::FeatureAnalyzer;
pub use levels::two_state_levels;
pub use roots::{DecayFallback, RootFinder, Roots};
