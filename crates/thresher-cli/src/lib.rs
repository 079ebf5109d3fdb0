pub mod discover;
pub mod ingest;
pub mod input;
pub mod output;
pub mod runner;
