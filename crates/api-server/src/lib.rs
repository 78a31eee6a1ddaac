#![warn(clippy::unwrap_used)]

pub mod cookies;
pub mod rest;
pub mod server;

pub use server::ApiServer;
