//! Math types used across Tessera.
//!
//! Re-exports the SIMD-accelerated [`glam`] types. Sprite geometry is built
//! with [`Vec2`] points and mapped through a [`Mat4`] affine transform, so
//! everything CPU-side works in `glam` and only the final vertices are
//! packed for upload.
//!
//! ```
//! use tessera_core::math::{Mat4, Vec2, Vec3};
//!
//! let offset = Mat4::from_translation(Vec3::new(10.0, 20.0, 0.0));
//! let p = offset.transform_point3(Vec2::new(1.0, 2.0).extend(0.0));
//! assert_eq!(p.truncate(), Vec2::new(11.0, 22.0));
//! ```
//!
//! [`glam`]: https://docs.rs/glam

pub use glam::*;

/// Interop types for handing vectors to other math libraries.
pub use mint;
