//! Record tagging pipeline.
//!
//! Every decoded record flows through:
//! 1. `ExtractPattern::candidates()` — coarse scan of the body text
//! 2. `parse_address()` — strict 4-byte parse; failures are dropped
//! 3. `TagRecords` — appends the addresses to the record's tag list
//!
//! **No skip-and-continue path exists.** The first bad record ends the stream.

pub mod address;
pub mod converter;
pub mod extract;
pub mod processor;
pub mod types;

pub use address::Address;
pub use converter::{AddressEnricher, Converter};
pub use processor::TagRecords;
pub use types::{Record, Value};
