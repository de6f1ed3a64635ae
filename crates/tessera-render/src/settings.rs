use bitflags::bitflags;

bitflags! {
    /// How a sprite session treats device render state.
    ///
    /// `RESTORE_STATE` contains both `CHANGE_STATE` and `KEEP_STATE`: the
    /// session changes state at `begin` and puts it back at `end`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpriteSettings: u32 {
        /// Set the sprite render states at `begin`.
        const CHANGE_STATE = 0b1;
        /// Leave render states as they are.
        const KEEP_STATE = 0b10;
        /// Snapshot render states at `begin` and restore them at `end`.
        const RESTORE_STATE = Self::CHANGE_STATE.bits() | Self::KEEP_STATE.bits();
        /// Force straight alpha blending on.
        const ALPHA_BLENDED = 0b100;
        /// Keep a stack of transforms so `pop_transform` can undo changes.
        const USE_POST_TRANSFORM_STACK = 0b1000;
        /// Keep the caller's shader and sampler instead of the built-in program.
        const ALLOW_SHADING = 0b10000;

        const RESTORE_STATE_ALPHA_BLENDED = Self::RESTORE_STATE.bits() | Self::ALPHA_BLENDED.bits();
    }
}

impl SpriteSettings {
    #[inline]
    pub fn changes_state(self) -> bool {
        self.contains(Self::CHANGE_STATE)
    }

    #[inline]
    pub fn restores_state(self) -> bool {
        self.contains(Self::RESTORE_STATE)
    }

    #[inline]
    pub fn uses_transform_stack(self) -> bool {
        self.contains(Self::USE_POST_TRANSFORM_STACK)
    }
}

impl Default for SpriteSettings {
    fn default() -> Self {
        Self::RESTORE_STATE_ALPHA_BLENDED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_implies_change() {
        assert!(SpriteSettings::RESTORE_STATE.changes_state());
        assert!(!SpriteSettings::KEEP_STATE.changes_state());
        assert!(!SpriteSettings::CHANGE_STATE.restores_state());
        assert_eq!(SpriteSettings::RESTORE_STATE.bits(), 3);
    }

    #[test]
    fn test_combined_flags() {
        let settings = SpriteSettings::RESTORE_STATE_ALPHA_BLENDED;
        assert!(settings.restores_state());
        assert!(settings.contains(SpriteSettings::ALPHA_BLENDED));
        assert!(!settings.uses_transform_stack());
    }
}
