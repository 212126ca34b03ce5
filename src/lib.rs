pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod model;
pub mod sanitize;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::LayoutOptions;
pub use engine::LayoutEngine;
pub use layout::{LayoutResult, NodePosition, Positions};
pub use model::CanvasGraph;
