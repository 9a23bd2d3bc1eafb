pub mod analyzers;
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
