pub mod application_service;
pub mod query_builder;
pub mod scoring;
pub mod stats_service;
