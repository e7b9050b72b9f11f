//! Core types for flowrun.

pub mod stream;
pub mod workflow;

pub use stream::*;
pub use workflow::*;
