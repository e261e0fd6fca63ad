pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod model;
pub mod state;
pub mod surface;
pub mod ui;
