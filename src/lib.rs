//! Asynchronous DOCX reformatting pipeline.
//!
//! Jobs are accepted over HTTP, recorded in a ledger, announced on a queue
//! and picked up by workers that apply a named format profile to the
//! document and store the result.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod formatting;
pub mod jobs;
pub mod queue;
pub mod shutdown;
pub mod storage;
pub mod telemetry;
pub mod worker;
