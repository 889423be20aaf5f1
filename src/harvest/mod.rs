//! The incremental harvesting engine.
//!
//! Data flows one direction: driver snapshot -> extractor -> ledger ->
//! checkpoint, with the progress detector gating loop continuation
//! independently.

mod engine;
mod extract;
mod ledger;
mod normalize;
mod progress;

pub use engine::{Harvester, HarvestReport};
pub use extract::RecordExtractor;
pub use ledger::DedupLedger;
pub use progress::{ProgressDetector, ProgressState};
