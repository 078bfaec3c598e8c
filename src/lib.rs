//! Backend-for-frontend of the admin dashboard.
//!
//! Wraps the remote admin API's encrypted envelope and serves each dashboard
//! page (CRM links, banners, reports, ...) through one generic
//! fetch → filter → page pipeline.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;
