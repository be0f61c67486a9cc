//! Server snapshot module
//!
//! Typed rows and client-side assessments for the instance-level
//! diagnostic views.

mod configuration;
mod info;
mod memory;
mod schedulers;

#[cfg(test)]
mod tests;

pub use configuration::*;
pub use info::*;
pub use memory::*;
pub use schedulers::*;
