//! Device abstraction and test utilities for Tessera.
//!
//! This crate defines the small capability surface the sprite batcher
//! drives, plus a recording mock so batching and geometry can be tested
//! without a GPU.
//!
//! # Overview
//!
//! The main components are:
//!
//! - [`SpriteDevice`] - Trait abstracting texture binding, sampler
//!   addressing, the discard vertex upload, indexed draws and the
//!   blend/depth/cull state facade
//! - `MockSpriteDevice` - Recording implementation for tests (requires the
//!   `mock` feature)
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use tessera_test_utils::{MockSpriteDevice, SpriteDevice};
//!
//! let mock = MockSpriteDevice::new();
//! mock.write_vertices_discard(&[0u8; 112]);
//! mock.draw_indexed(0, 4, 0, 2);
//!
//! assert_eq!(mock.count_vertex_writes(), 1);
//! assert_eq!(mock.count_draws(), 1);
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! ## 1. Interior Mutability
//!
//! Devices take `&self` everywhere. Mock state lives behind a `Mutex` so
//! `&self` methods can record calls.
//!
//! ## 2. Object Safety
//!
//! `SpriteDevice` is object-safe (`dyn SpriteDevice`), and is implemented
//! for `Arc<D>` so a backend can be shared with the code that records the
//! final render pass.

#[cfg(feature = "mock")]
pub mod mock_device;
pub mod sprite_device;

// Re-export main types at crate root
#[cfg(feature = "mock")]
pub use mock_device::*;
pub use sprite_device::*;
