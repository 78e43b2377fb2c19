pub mod citygml;
pub mod config;
pub mod error;
pub mod geometry;
pub mod renderer;
pub mod ui;

pub use error::{Error, Result};
