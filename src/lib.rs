pub mod config;
pub mod humanize;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod storage;
pub mod validation;
pub mod worker;
