//! Shared utilities for the NineML model crates
//!
//! Every crate in the workspace reports failures through the
//! [`error::AsNineMLError`] trait so that callers can render them uniformly.

pub mod error;
