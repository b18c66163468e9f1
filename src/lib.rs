// Library for tests to access modules

pub mod aggregation;
pub mod config;
pub mod models;
pub mod routes;
pub mod stats;
pub mod store;
pub mod version;
