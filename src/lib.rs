pub mod aggregator;
pub mod cancellation;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod model;
pub mod normalize;
pub mod output;
pub mod report;
pub mod services;
pub mod snapshot;
