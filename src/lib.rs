pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod routes;
pub mod snowflake;
pub mod state;
