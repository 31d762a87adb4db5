//! texreshape - strip texture to atlas reshaping
//!
//! Turns a 256x65536 stack of 256x256 strips into a 4096x4096 atlas laid out
//! as a 16x16 grid, last strip first.

pub mod format;
pub mod layout;
pub mod reshape;

pub use layout::{Layout, Placement};
pub use reshape::{reshape_buffer, reshape_image, Config, ReshapeError, ReshapeReport, Reshaper};
