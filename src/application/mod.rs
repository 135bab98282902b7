//! Application services layer scaffolding.

pub mod admin;
pub mod agenda;
pub mod calendar;
pub mod chrome;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod schema_org;
