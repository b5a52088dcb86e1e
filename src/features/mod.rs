//! Feature extraction
//!
//! Converts an ordered match history into per-match features.

pub mod elo;
pub mod head_to_head;
pub mod match_repr;
pub mod odds;
pub mod team_stats;

pub use elo::{EloFeatures, EloRatings};
pub use head_to_head::{h2h_stats, HeadToHead, HeadToHeadTracker};
pub use match_repr::{DerivedFeatures, FeatureRecord, FEATURE_COLUMNS};
pub use odds::{ImpliedProbabilities, MatchTargets};
pub use team_stats::{recent_stats, FormStats, RollingForm};
