//! Data ingestion and storage
//!
//! CSV parsing, chronological ordering, the feature scan and league files.

pub mod chronology;
pub mod dataset;
pub mod league;
pub mod table;

pub use chronology::{DateParser, DateStrategy, LoadReport, Timeline};
pub use dataset::{
    derive_batch, derive_incremental, BatchOutput, FeatureScan, IncrementalOutput,
};
pub use league::LeagueStore;
pub use table::{FeatureRow, RawRow, ReportRow};
