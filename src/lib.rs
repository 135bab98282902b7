//! Velada is a self-hosted event calendar: an admin console for scheduling
//! events, public agenda pages with schema.org structured data, and a
//! read-only JSON API, backed by Postgres.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
