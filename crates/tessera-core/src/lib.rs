//! Tessera Core
//!
//! Shared utilities for the Tessera sprite engine: logging bootstrap,
//! profiling scopes, math re-exports and the small geometry types used by
//! the renderer.

pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
