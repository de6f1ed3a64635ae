//! Render-state save/restore around a sprite session.

use tessera_test_utils::{AlphaBlendState, DepthState, SpriteDevice};

use crate::batch::SPRITE_TEXTURE_SLOT;
use crate::settings::SpriteSettings;

/// Device state captured at `begin` when restoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStateSnapshot {
    pub alpha_blend: AlphaBlendState,
    pub depth: DepthState,
    pub cull_mode: Option<wgpu::Face>,
}

impl RenderStateSnapshot {
    pub fn capture<D: SpriteDevice + ?Sized>(device: &D) -> Self {
        Self {
            alpha_blend: device.alpha_blend(),
            depth: device.depth(),
            cull_mode: device.cull_mode(),
        }
    }

    /// Put back what `settings` changed. Blend is only touched if alpha
    /// blending was forced on.
    pub fn restore<D: SpriteDevice + ?Sized>(&self, device: &D, settings: SpriteSettings) {
        if settings.contains(SpriteSettings::ALPHA_BLENDED) {
            device.set_alpha_blend(self.alpha_blend);
        }
        device.set_depth(self.depth);
        device.set_cull_mode(self.cull_mode);
    }
}

/// Set the sprite render states: no depth test, no culling, optional
/// alpha blending and, unless shading is allowed, the built-in program
/// with linear clamped sampling.
pub fn apply_sprite_state<D: SpriteDevice + ?Sized>(device: &D, settings: SpriteSettings) {
    let depth = device.depth();
    device.set_depth(DepthState {
        test_enabled: false,
        write_enabled: depth.write_enabled,
    });
    device.set_cull_mode(None);

    if settings.contains(SpriteSettings::ALPHA_BLENDED) {
        let blend_constant = device.alpha_blend().blend_constant;
        device.set_alpha_blend(AlphaBlendState::alpha(blend_constant));
    }

    if !settings.contains(SpriteSettings::ALLOW_SHADING) {
        device.set_filter_mode(SPRITE_TEXTURE_SLOT, wgpu::FilterMode::Linear);
        device.set_address_mode(SPRITE_TEXTURE_SLOT, wgpu::AddressMode::ClampToEdge);
        device.bind_builtin_program();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_test_utils::{MockDeviceState, MockSpriteDevice};

    fn custom_state() -> MockDeviceState {
        MockDeviceState {
            alpha_blend: AlphaBlendState {
                enabled: true,
                operation: wgpu::BlendOperation::Max,
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                blend_constant: 0x11223344,
            },
            cull_mode: Some(wgpu::Face::Front),
            ..MockDeviceState::default()
        }
    }

    #[test]
    fn test_apply_keeps_blend_constant() {
        let mock = MockSpriteDevice::with_initial_state(custom_state());
        apply_sprite_state(&mock, SpriteSettings::CHANGE_STATE | SpriteSettings::ALPHA_BLENDED);

        let blend = mock.alpha_blend();
        assert_eq!(blend, AlphaBlendState::alpha(0x11223344));
        assert!(!mock.depth().test_enabled);
        assert!(mock.depth().write_enabled);
        assert_eq!(mock.cull_mode(), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mock = MockSpriteDevice::with_initial_state(custom_state());
        let settings = SpriteSettings::RESTORE_STATE_ALPHA_BLENDED;

        let snapshot = RenderStateSnapshot::capture(&mock);
        apply_sprite_state(&mock, settings);
        snapshot.restore(&mock, settings);

        let expected = custom_state();
        let state = mock.state();
        assert_eq!(state.alpha_blend, expected.alpha_blend);
        assert_eq!(state.depth, expected.depth);
        assert_eq!(state.cull_mode, expected.cull_mode);
    }

    #[test]
    fn test_restore_leaves_blend_without_alpha_flag() {
        let mock = MockSpriteDevice::with_initial_state(custom_state());
        let snapshot = RenderStateSnapshot::capture(&mock);

        mock.set_alpha_blend(AlphaBlendState::DISABLED);
        snapshot.restore(&mock, SpriteSettings::RESTORE_STATE);

        assert_eq!(mock.alpha_blend(), AlphaBlendState::DISABLED);
        assert_eq!(mock.cull_mode(), Some(wgpu::Face::Front));
    }
}
