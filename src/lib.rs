pub mod app;
pub mod common;
pub mod config;
pub mod feed;
pub mod observability;
pub mod server;
pub mod storage;
