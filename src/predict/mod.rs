//! Prediction-time feature lookup
//!
//! Read-only queries against a league's history for fixtures not yet played.

pub mod lookup;

pub use lookup::{fixture_features, team_summary, teams, FixtureFeatures, TeamSummary};
