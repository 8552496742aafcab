pub mod config;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod match_store;
pub mod model;
pub mod opendota;
pub mod sync;
