// Library for tests to access modules

pub mod aggregation;
pub mod aggregation_worker;
pub mod backfill;
pub mod config;
pub mod models;
pub mod status_repo;
pub mod store;
pub mod ticker;
pub mod version;
