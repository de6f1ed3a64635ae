//! Sprite batch configuration.

/// Capacity and tessellation limits of a [`SpriteBatch`](crate::SpriteBatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteBatchConfig {
    /// Hard queue capacity, which is also the vertex/index buffer capacity in quads.
    pub max_deferred_draws: usize,
    /// Queue length that triggers an eager flush.
    pub flush_threshold: usize,
    /// Upper bound on sector subdivisions per shape.
    pub max_subdivisions: u32,
}

impl SpriteBatchConfig {
    pub const DEFAULT_MAX_DEFERRED_DRAWS: usize = 144;
    pub const DEFAULT_MAX_SUBDIVISIONS: u32 = 512;

    /// Config whose capacity and threshold are both `max_deferred_draws`.
    pub fn with_capacity(max_deferred_draws: usize) -> Self {
        Self {
            max_deferred_draws,
            flush_threshold: max_deferred_draws,
            ..Self::default()
        }
    }

    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    pub fn with_max_subdivisions(mut self, max_subdivisions: u32) -> Self {
        self.max_subdivisions = max_subdivisions;
        self
    }

    /// Clamp every field into its usable range.
    ///
    /// The capacity is at least 1 and bounded by what a `u16` index buffer
    /// can address. The threshold lands in `1..=max_deferred_draws` and
    /// the subdivision cap is at least 4.
    pub fn validated(self) -> Self {
        let max_quads = (u16::MAX as usize + 1) / crate::vertex::VERTICES_PER_QUAD;
        let max_deferred_draws = self.max_deferred_draws.clamp(1, max_quads);
        let flush_threshold = self.flush_threshold.clamp(1, max_deferred_draws);
        let max_subdivisions = self.max_subdivisions.max(4);

        if max_deferred_draws != self.max_deferred_draws
            || flush_threshold != self.flush_threshold
            || max_subdivisions != self.max_subdivisions
        {
            tracing::warn!(
                "Sprite batch config clamped: {:?} -> max_deferred_draws={}, flush_threshold={}, max_subdivisions={}",
                self,
                max_deferred_draws,
                flush_threshold,
                max_subdivisions
            );
        }

        Self {
            max_deferred_draws,
            flush_threshold,
            max_subdivisions,
        }
    }
}

impl Default for SpriteBatchConfig {
    fn default() -> Self {
        Self {
            max_deferred_draws: Self::DEFAULT_MAX_DEFERRED_DRAWS,
            flush_threshold: Self::DEFAULT_MAX_DEFERRED_DRAWS,
            max_subdivisions: Self::DEFAULT_MAX_SUBDIVISIONS,
        }
    }
}
