//! Shared primitives for the desk shell workspace.
//!
//! Every error type in the workspace embeds an [`ErrorLocation`] so that log
//! lines point at the exact call site that produced the failure.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
