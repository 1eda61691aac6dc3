//! Helper functions for API operations

pub mod charts;
pub mod common;
pub mod layout;
pub mod normalize;

pub use charts::*;
pub use common::*;
pub use layout::*;
pub use normalize::*;
