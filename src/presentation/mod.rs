//! Server-rendered view models and template plumbing.

pub mod admin;
pub mod views;
