//! Run detection and flushing of the draw queue.
//!
//! A run is a maximal slice of adjacent entries sharing
//! `(texture, uv_extended)`. Each run becomes exactly one indexed draw, and
//! texture or sampler state is only touched between runs.

use tessera_core::profiling::profile_function;
use tessera_test_utils::{SpriteDevice, TextureId};

use crate::queue::DrawQueue;
use crate::vertex::{DrawEntry, INDICES_PER_QUAD, QuadVertex, VERTICES_PER_QUAD};

/// Sampler slot every sprite draw uses.
pub const SPRITE_TEXTURE_SLOT: u32 = 0;

/// Addressing mode a run needs.
#[inline]
pub fn address_mode(uv_extended: bool) -> wgpu::AddressMode {
    if uv_extended {
        wgpu::AddressMode::Repeat
    } else {
        wgpu::AddressMode::ClampToEdge
    }
}

/// A maximal run of batch-compatible entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRun {
    /// Index of the first entry.
    pub start: usize,
    pub count: usize,
    pub texture: Option<TextureId>,
    pub uv_extended: bool,
}

impl BatchRun {
    pub fn start_vertex(&self) -> u32 {
        (self.start * VERTICES_PER_QUAD) as u32
    }

    pub fn vertex_count(&self) -> u32 {
        (self.count * VERTICES_PER_QUAD) as u32
    }

    pub fn start_index(&self) -> u32 {
        (self.start * INDICES_PER_QUAD) as u32
    }

    pub fn primitive_count(&self) -> u32 {
        (self.count * 2) as u32
    }
}

/// Partition `entries` into runs, in order.
pub fn batch_runs(entries: &[DrawEntry]) -> Vec<BatchRun> {
    let mut runs: Vec<BatchRun> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if (run.texture, run.uv_extended) == entry.batch_key() => run.count += 1,
            _ => runs.push(BatchRun {
                start: i,
                count: 1,
                texture: entry.texture,
                uv_extended: entry.uv_extended,
            }),
        }
    }
    runs
}

/// Counters accumulated across flushes until reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteBatchStats {
    /// Indexed draws issued, one per run.
    pub draw_calls: u64,
    pub quads: u64,
    /// Non-empty flushes.
    pub flushes: u64,
    pub texture_binds: u64,
    pub address_mode_changes: u64,
}

/// Uploads a queue and issues one draw per run.
///
/// Keeps a staging buffer so steady-state flushes do not allocate.
#[derive(Debug, Default)]
pub struct BatchFlusher {
    staging: Vec<QuadVertex>,
}

impl BatchFlusher {
    pub fn with_capacity(max_quads: usize) -> Self {
        Self {
            staging: Vec::with_capacity(max_quads * VERTICES_PER_QUAD),
        }
    }

    /// Flush `queue` to `device` and leave it empty. An empty queue is a no-op.
    pub fn flush<D: SpriteDevice + ?Sized>(
        &mut self,
        device: &D,
        queue: &mut DrawQueue,
        stats: &mut SpriteBatchStats,
    ) {
        profile_function!();
        let entries = queue.entries();
        let Some(first) = entries.first() else {
            return;
        };

        self.staging.clear();
        for entry in entries {
            self.staging.extend_from_slice(&entry.vertices);
        }
        device.write_vertices_discard(bytemuck::cast_slice(&self.staging));

        let (mut texture, mut uv_extended) = first.batch_key();
        device.bind_texture(SPRITE_TEXTURE_SLOT, texture);
        device.set_address_mode(SPRITE_TEXTURE_SLOT, address_mode(uv_extended));
        stats.texture_binds += 1;
        stats.address_mode_changes += 1;

        let len = entries.len();
        let mut run_start = 0;
        let mut draws = 0u64;
        for i in 0..=len {
            // The sentinel differs in addressing mode so the last run is drawn.
            let (next_texture, next_extended) = match entries.get(i) {
                Some(entry) => entry.batch_key(),
                None => (texture, !uv_extended),
            };
            let texture_changed = next_texture != texture;
            let mode_changed = next_extended != uv_extended;
            if !texture_changed && !mode_changed {
                continue;
            }

            let run = BatchRun {
                start: run_start,
                count: i - run_start,
                texture,
                uv_extended,
            };
            device.draw_indexed(
                run.start_vertex(),
                run.vertex_count(),
                run.start_index(),
                run.primitive_count(),
            );
            draws += 1;

            if i == len {
                break;
            }
            if texture_changed {
                texture = next_texture;
                device.bind_texture(SPRITE_TEXTURE_SLOT, texture);
                stats.texture_binds += 1;
            }
            if mode_changed {
                uv_extended = next_extended;
                device.set_address_mode(SPRITE_TEXTURE_SLOT, address_mode(uv_extended));
                stats.address_mode_changes += 1;
            }
            run_start = i;
        }

        stats.draw_calls += draws;
        stats.quads += len as u64;
        stats.flushes += 1;
        tracing::debug!("Flushed {} sprite quads in {} draw calls", len, draws);

        queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(texture: Option<u64>, uv_extended: bool) -> DrawEntry {
        DrawEntry {
            vertices: [QuadVertex::default(); 4],
            texture: texture.map(TextureId),
            uv_extended,
        }
    }

    #[test]
    fn test_runs_tie_break() {
        let entries = [entry(Some(1), false), entry(Some(1), false), entry(Some(2), false), entry(Some(1), false)];
        let runs = batch_runs(&entries);
        assert_eq!(runs.len(), 3);
        assert_eq!((runs[0].start, runs[0].count), (0, 2));
        assert_eq!((runs[1].start, runs[1].count), (2, 1));
        assert_eq!((runs[2].start, runs[2].count), (3, 1));
    }

    #[test]
    fn test_runs_split_on_uv_mode() {
        let entries = [entry(Some(1), false), entry(Some(1), true), entry(Some(1), true)];
        let runs = batch_runs(&entries);
        assert_eq!(runs.len(), 2);
        assert!(runs[1].uv_extended);
        assert_eq!(runs[1].count, 2);
    }

    #[test]
    fn test_untextured_is_distinct_identity() {
        let entries = [entry(None, false), entry(Some(0), false), entry(None, false)];
        assert_eq!(batch_runs(&entries).len(), 3);
    }

    #[test]
    fn test_empty_has_no_runs() {
        assert!(batch_runs(&[]).is_empty());
    }

    #[test]
    fn test_run_draw_ranges() {
        let run = BatchRun {
            start: 3,
            count: 2,
            texture: None,
            uv_extended: false,
        };
        assert_eq!(run.start_vertex(), 12);
        assert_eq!(run.vertex_count(), 8);
        assert_eq!(run.start_index(), 18);
        assert_eq!(run.primitive_count(), 4);
    }

    #[test]
    fn test_address_modes() {
        assert_eq!(address_mode(true), wgpu::AddressMode::Repeat);
        assert_eq!(address_mode(false), wgpu::AddressMode::ClampToEdge);
    }
}
