pub mod actions;
pub mod auth;
pub mod config;
pub mod database;
pub mod entities;
pub mod mail;
pub mod router;
pub mod routes;
