//! HTTP API module - routes and handlers

pub mod handlers;
pub mod routes;
