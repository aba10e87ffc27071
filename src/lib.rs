pub mod app;
pub mod battery;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod holiday;
pub mod http;
pub mod input;
pub mod location;
pub mod preferences;
pub mod render;
pub mod scheduler;
pub mod view;
pub mod weather;

pub use error::{Error, Result};
