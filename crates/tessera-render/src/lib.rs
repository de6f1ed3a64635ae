//! Tessera Render
//!
//! Deferred 2D sprite batching. Draw calls are tessellated into textured,
//! colored quads on the CPU, queued, and flushed to a [`SpriteDevice`] as
//! one vertex upload plus one indexed draw per run of quads sharing a
//! texture and addressing mode.
//!
//! ```rust
//! use glam::Vec2;
//! use tessera_core::geometry::RectF;
//! use tessera_render::{Color, SpriteBatch, SpriteBatchConfig, SpriteSettings, SpriteTexture};
//! use tessera_test_utils::{MockSpriteDevice, TextureId};
//!
//! let mut batch = SpriteBatch::new(MockSpriteDevice::new(), SpriteBatchConfig::default());
//! let texture = SpriteTexture::new(TextureId(1), 64, 64);
//!
//! batch.begin(SpriteSettings::RESTORE_STATE_ALPHA_BLENDED);
//! batch.draw(&texture, Vec2::new(10.0, 10.0), Color::WHITE);
//! batch.draw_rect(None, RectF::new(0.0, 0.0, 32.0, 8.0), None, Color::RED);
//! batch.end();
//!
//! assert_eq!(batch.device().count_draws(), 2);
//! ```

pub mod batch;
pub mod color;
pub mod config;
pub mod context;
pub mod geometry;
pub mod queue;
pub mod sampler_cache;
pub mod settings;
pub mod sprite;
pub mod state;
pub mod texture;
pub mod transform;
pub mod vertex;
pub mod wgpu_device;

pub use batch::{BatchFlusher, BatchRun, SpriteBatchStats, batch_runs};
pub use color::Color;
pub use config::SpriteBatchConfig;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsError};
pub use geometry::{LineCap, LineStyle};
pub use queue::DrawQueue;
pub use sampler_cache::{SamplerCache, SamplerKey};
pub use settings::SpriteSettings;
pub use sprite::{SpriteBatch, SpriteBeginEndScope, SpriteTransformScope};
pub use state::RenderStateSnapshot;
pub use texture::SpriteTexture;
pub use transform::SpriteTransform;
pub use vertex::{DrawEntry, QuadVertex};
pub use wgpu_device::WgpuSpriteDevice;

pub use tessera_test_utils::{AlphaBlendState, DepthState, SpriteDevice, TextureId};
