//! Domain types shared across the engine.

pub mod bar;
pub mod direction;
pub mod timeframe;

pub use bar::{validate_series, Bar};
pub use direction::Direction;
pub use timeframe::Timeframe;

/// Symbol type alias
pub type Symbol = String;
