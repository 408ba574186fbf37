//! Domain records.

pub mod band;
pub mod repeater;

pub use band::Band;
pub use repeater::{Repeater, Status, Use};
