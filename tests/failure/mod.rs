//! Failure test organization:
//! - retry_ladder.rs: the full admit/fail cycle up to dead-letter
//! - records.rs: durable failure records and the analyzer hook

mod retry_ladder;
