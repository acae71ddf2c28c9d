pub mod air;
pub mod analysis;
pub mod config;
pub mod http;
pub mod narrative;
pub mod output;
pub mod risk;
pub mod server;
pub mod tender;
