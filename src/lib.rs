pub mod cache;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod providers;
pub mod scoring;
pub mod storage;
pub mod types;
