//! Mock implementation of SpriteDevice for testing.
//!
//! This module provides a device that records every capability call and
//! keeps the render state it was given, without touching a GPU.

use crate::sprite_device::{AlphaBlendState, DepthState, SpriteDevice, TextureId};
use parking_lot::Mutex;

/// Records a device call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    BindTexture {
        slot: u32,
        texture: Option<TextureId>,
    },
    SetAddressMode {
        slot: u32,
        mode: wgpu::AddressMode,
    },
    SetFilterMode {
        slot: u32,
        filter: wgpu::FilterMode,
    },
    BindBuiltinProgram,
    WriteVertices {
        size: usize,
    },
    DrawIndexed(DrawCall),
    SetAlphaBlend(AlphaBlendState),
    SetDepth(DepthState),
    SetCullMode(Option<wgpu::Face>),
}

/// Parameters of one recorded indexed draw, plus the state it was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub start_vertex: u32,
    pub vertex_count: u32,
    pub start_index: u32,
    pub primitive_count: u32,
    pub texture: Option<TextureId>,
    pub address_mode: wgpu::AddressMode,
}

/// Render state tracked by the mock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockDeviceState {
    pub texture: Option<TextureId>,
    pub address_mode: wgpu::AddressMode,
    pub filter: wgpu::FilterMode,
    pub alpha_blend: AlphaBlendState,
    pub depth: DepthState,
    pub cull_mode: Option<wgpu::Face>,
}

impl Default for MockDeviceState {
    fn default() -> Self {
        Self {
            texture: None,
            address_mode: wgpu::AddressMode::ClampToEdge,
            filter: wgpu::FilterMode::Nearest,
            alpha_blend: AlphaBlendState::DISABLED,
            depth: DepthState::default(),
            cull_mode: Some(wgpu::Face::Back),
        }
    }
}

/// Mock implementation of SpriteDevice for testing.
///
/// # Borrow Checking Pattern: Interior Mutability
///
/// Methods take `&self` but need to record calls, so the call log and the
/// tracked state live behind `parking_lot::Mutex` (which keeps the type
/// `Send + Sync`, as the trait requires).
///
/// # Example
///
/// ```rust
/// use tessera_test_utils::{MockSpriteDevice, SpriteDevice, TextureId};
///
/// let mock = MockSpriteDevice::new();
/// mock.bind_texture(0, Some(TextureId(3)));
/// mock.draw_indexed(0, 4, 0, 2);
///
/// assert_eq!(mock.count_draws(), 1);
/// assert_eq!(mock.draw_calls()[0].texture, Some(TextureId(3)));
/// ```
pub struct MockSpriteDevice {
    /// Recorded calls for verification
    calls: Mutex<Vec<DeviceCall>>,

    /// Current state, as a real device would hold it
    state: Mutex<MockDeviceState>,

    /// Bytes of the most recent discard write
    last_vertices: Mutex<Vec<u8>>,
}

impl MockSpriteDevice {
    /// Create a new mock device with default state.
    pub fn new() -> Self {
        Self::with_initial_state(MockDeviceState::default())
    }

    /// Create a mock device that starts from the given state.
    pub fn with_initial_state(state: MockDeviceState) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            state: Mutex::new(state),
            last_vertices: Mutex::new(Vec::new()),
        }
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Snapshot of the tracked state.
    pub fn state(&self) -> MockDeviceState {
        *self.state.lock()
    }

    /// All recorded draws in issue order.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawIndexed(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Count draw calls.
    pub fn count_draws(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::DrawIndexed(_)))
            .count()
    }

    /// Count vertex upload operations.
    pub fn count_vertex_writes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::WriteVertices { .. }))
            .count()
    }

    /// Count texture binds.
    pub fn count_texture_binds(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::BindTexture { .. }))
            .count()
    }

    /// Count address mode changes.
    pub fn count_address_mode_changes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::SetAddressMode { .. }))
            .count()
    }

    /// Bytes of the most recent vertex upload.
    pub fn last_vertex_write(&self) -> Vec<u8> {
        self.last_vertices.lock().clone()
    }

    /// Clear recorded calls (useful between test steps). State is kept.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockSpriteDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteDevice for MockSpriteDevice {
    fn bind_texture(&self, slot: u32, texture: Option<TextureId>) {
        self.state.lock().texture = texture;
        self.record(DeviceCall::BindTexture { slot, texture });
    }

    fn set_address_mode(&self, slot: u32, mode: wgpu::AddressMode) {
        self.state.lock().address_mode = mode;
        self.record(DeviceCall::SetAddressMode { slot, mode });
    }

    fn set_filter_mode(&self, slot: u32, filter: wgpu::FilterMode) {
        self.state.lock().filter = filter;
        self.record(DeviceCall::SetFilterMode { slot, filter });
    }

    fn bind_builtin_program(&self) {
        self.record(DeviceCall::BindBuiltinProgram);
    }

    fn write_vertices_discard(&self, data: &[u8]) {
        let mut last = self.last_vertices.lock();
        last.clear();
        last.extend_from_slice(data);
        self.record(DeviceCall::WriteVertices { size: data.len() });
    }

    fn draw_indexed(&self, start_vertex: u32, vertex_count: u32, start_index: u32, primitive_count: u32) {
        let state = self.state();
        self.record(DeviceCall::DrawIndexed(DrawCall {
            start_vertex,
            vertex_count,
            start_index,
            primitive_count,
            texture: state.texture,
            address_mode: state.address_mode,
        }));
    }

    fn alpha_blend(&self) -> AlphaBlendState {
        self.state.lock().alpha_blend
    }

    fn set_alpha_blend(&self, state: AlphaBlendState) {
        self.state.lock().alpha_blend = state;
        self.record(DeviceCall::SetAlphaBlend(state));
    }

    fn depth(&self) -> DepthState {
        self.state.lock().depth
    }

    fn set_depth(&self, state: DepthState) {
        self.state.lock().depth = state;
        self.record(DeviceCall::SetDepth(state));
    }

    fn cull_mode(&self) -> Option<wgpu::Face> {
        self.state.lock().cull_mode
    }

    fn set_cull_mode(&self, mode: Option<wgpu::Face>) {
        self.state.lock().cull_mode = mode;
        self.record(DeviceCall::SetCullMode(mode));
    }
}
