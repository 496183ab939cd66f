//! Shared data model for compiled eventscript content.

pub mod defs;
pub mod roster;
pub mod steps;

pub use defs::*;
pub use roster::Roster;
pub use steps::*;
