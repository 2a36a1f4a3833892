// Library exports for postboard
// This allows integration tests and external code to use postboard modules

pub mod config;
pub mod error;
pub mod extractors;
pub mod models;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
