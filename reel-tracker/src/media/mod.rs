//! Media records, the canonical store and the payload extractor

pub mod extract;
pub mod record;
pub mod store;

pub use extract::{ExtractionReport, RecordExtractor};
pub use record::{Engagement, MediaCandidate, MediaRecord};
pub use store::{MediaIndex, UpsertOutcome};
