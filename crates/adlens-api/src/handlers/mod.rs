//! HTTP request handlers

pub mod analyze;
pub mod blob;
pub mod config;
pub mod upload;
