pub mod analytics;
pub mod server;
pub mod storage;
