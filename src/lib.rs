pub mod api;
pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod isatab;
pub mod landing_zones;
pub mod models;
pub mod output;
pub mod overwrite;
pub mod sheets;
pub mod tools;
