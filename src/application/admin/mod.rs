//! Application services for the administrative surface.

pub mod chrome;
pub mod events;
pub mod settings;
pub mod terms;
