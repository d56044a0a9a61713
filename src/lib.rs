pub mod auth;
pub mod booking;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
