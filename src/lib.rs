//! IPv4 log tagger — scans a text field of each record for IPv4 addresses
//! and appends them to the record's tag list.

pub mod codec;
pub mod config;
pub mod effect;
pub mod error;
pub mod pipeline;
pub mod run;
