pub mod connection;
pub mod job_repository;
pub mod ledger;
pub mod memory;
pub mod migrations;
pub mod models;

pub use job_repository::JobRepository;
pub use ledger::{CreateOutcome, JobLedger};
pub use memory::InMemoryJobLedger;
