pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod seeds;
