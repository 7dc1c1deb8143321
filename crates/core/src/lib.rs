//! Core library: tag-driven classification of notes into folders.

pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod paths;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod vault;
