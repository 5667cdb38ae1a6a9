pub mod config;
pub mod download;
pub mod error;
pub mod pages;
pub mod routes;
pub mod state;
pub mod store;
pub mod upload;
