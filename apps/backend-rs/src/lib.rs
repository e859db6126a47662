pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schemas;
pub mod services;
pub mod state;
