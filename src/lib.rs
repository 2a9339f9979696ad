// ABOUTME: Library crate for the web relay client exposing public API for testing and external use

pub mod app;
pub mod components;
pub mod config;
pub mod relay;
pub mod surface;
