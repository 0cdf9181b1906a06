//! `sheetrecon-recon`: rule-based reconciliation of two record sets.
//!
//! Pure engine crate: receives pre-loaded tables, returns the match relation
//! and assembled output tables. No CLI or IO dependencies.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;

pub use config::{ClaimPolicy, Labels, MatchRule, OutputMode, ReconConfig, SheetNames};
pub use engine::run;
pub use error::ReconError;
pub use matcher::reconcile;
pub use model::{
    CellValue, Classification, MatchRelation, MatchedPair, ReconInput, ReconOutput, ReconResult,
    ReconSummary, Record, Table,
};
pub use normalize::{normalize, MatchKey};
