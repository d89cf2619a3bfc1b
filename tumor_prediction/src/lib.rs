mod routes;

pub mod app;
pub mod candle_service;
pub mod config;
pub mod model_service;
pub mod server;
pub mod telemetry;

pub use app::start_app;
