//! wgpu backend for the sprite batcher.
//!
//! [`WgpuSpriteDevice`] records the batcher's calls during a frame and
//! replays them into a render pass afterwards:
//!
//! 1. While the batch runs, every `write_vertices_discard` appends a new
//!    segment to a CPU vertex arena, and every `draw_indexed` records a
//!    command carrying the current texture, sampler and pipeline state.
//! 2. [`prepare`](WgpuSpriteDevice::prepare) uploads the arena in one write
//!    and creates any pipelines and bind groups the commands need.
//! 3. [`render`](WgpuSpriteDevice::render) replays the commands, switching
//!    state only when it changes.
//! 4. [`finish_frame`](WgpuSpriteDevice::finish_frame) clears the recording.
//!
//! Segments stand in for buffer renaming: queued `write_buffer` calls all
//! land before the pass executes, so rewriting one region per flush would
//! leave every draw seeing the last flush's vertices.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tessera_render::{GraphicsContext, SpriteBatch, SpriteBatchConfig, WgpuSpriteDevice};
//!
//! let context = GraphicsContext::new_owned_sync().expect("no GPU available");
//! let config = SpriteBatchConfig::default();
//! let device = Arc::new(WgpuSpriteDevice::new(
//!     context,
//!     wgpu::TextureFormat::Bgra8UnormSrgb,
//!     &config,
//! ));
//! let mut batch = SpriteBatch::new(device.clone(), config);
//! // ... begin, draw, end ...
//! device.prepare(1280, 720);
//! // device.render(&mut render_pass);
//! device.finish_frame();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::HashMap;
use parking_lot::Mutex;
use tessera_core::profiling::profile_function;
use tessera_test_utils::{AlphaBlendState, DepthState, SpriteDevice, TextureId};
use wgpu::util::DeviceExt;

use crate::color::Color;
use crate::config::SpriteBatchConfig;
use crate::context::GraphicsContext;
use crate::sampler_cache::{SamplerCache, SamplerKey};
use crate::texture::SpriteTexture;
use crate::vertex::{QuadVertex, quad_indices};

const INITIAL_VERTEX_CAPACITY: u64 = 4096 * std::mem::size_of::<QuadVertex>() as u64;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SpriteUniforms {
    viewport: [f32; 2],
    _padding: [f32; 2],
}

/// Fixed-function state baked into a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    blend: Option<wgpu::BlendState>,
    cull_mode: Option<wgpu::Face>,
}

/// One recorded indexed draw.
#[derive(Debug, Clone, Copy)]
struct DrawCommand {
    base_vertex: i32,
    start_index: u32,
    index_count: u32,
    texture: Option<TextureId>,
    sampler: SamplerKey,
    pipeline: PipelineKey,
    blend_constant: u32,
}

/// State mutated through the [`SpriteDevice`] calls.
struct Recording {
    texture: Option<TextureId>,
    sampler: SamplerKey,
    alpha_blend: AlphaBlendState,
    depth: DepthState,
    cull_mode: Option<wgpu::Face>,
    /// Frame vertex arena, raw `QuadVertex` bytes
    vertices: Vec<u8>,
    /// First vertex of the current segment
    segment_base: i32,
    commands: Vec<DrawCommand>,
}

impl Default for Recording {
    fn default() -> Self {
        Self {
            texture: None,
            sampler: SamplerKey::linear_clamp(),
            alpha_blend: AlphaBlendState::DISABLED,
            depth: DepthState::default(),
            cull_mode: None,
            vertices: Vec::new(),
            segment_base: 0,
            commands: Vec::new(),
        }
    }
}

/// GPU objects created lazily or resized between frames.
struct GpuResources {
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    textures: HashMap<TextureId, wgpu::TextureView>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    bind_groups: HashMap<(TextureId, SamplerKey), wgpu::BindGroup>,
}

impl GpuResources {
    /// Registered texture for `texture`, or the white fallback.
    fn resolve(&self, texture: Option<TextureId>, white: TextureId) -> TextureId {
        match texture {
            Some(id) if self.textures.contains_key(&id) => id,
            _ => white,
        }
    }
}

/// [`SpriteDevice`] implementation that renders through wgpu.
pub struct WgpuSpriteDevice {
    context: Arc<GraphicsContext>,
    format: wgpu::TextureFormat,
    shader: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    index_buffer: wgpu::Buffer,
    samplers: SamplerCache,
    white: TextureId,
    next_texture_id: AtomicU64,
    recording: Mutex<Recording>,
    gpu: Mutex<GpuResources>,
}

impl WgpuSpriteDevice {
    /// Create a backend rendering into targets of `format`.
    ///
    /// The index buffer holds `config.max_deferred_draws` quads, so the
    /// batch using this device must not be configured larger.
    pub fn new(context: Arc<GraphicsContext>, format: wgpu::TextureFormat, config: &SpriteBatchConfig) -> Self {
        profile_function!();
        let max_quads = config.validated().max_deferred_draws;
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Uniforms"),
            contents: bytemuck::bytes_of(&SpriteUniforms {
                viewport: [1.0, 1.0],
                _padding: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Index Buffer"),
            contents: bytemuck::cast_slice(&quad_indices(max_quads)),
            usage: wgpu::BufferUsages::INDEX,
        });

        let vertex_buffer = create_vertex_buffer(device, INITIAL_VERTEX_CAPACITY);

        let this = Self {
            format,
            shader,
            texture_layout,
            pipeline_layout,
            uniform_buffer,
            uniform_bind_group,
            index_buffer,
            samplers: SamplerCache::new(),
            white: TextureId(0),
            next_texture_id: AtomicU64::new(1),
            recording: Mutex::new(Recording::default()),
            gpu: Mutex::new(GpuResources {
                vertex_buffer,
                vertex_capacity: INITIAL_VERTEX_CAPACITY,
                textures: HashMap::default(),
                pipelines: HashMap::default(),
                bind_groups: HashMap::default(),
            }),
            context,
        };

        let white = this.create_texture_view(1, 1, &[255, 255, 255, 255], "Sprite White Texture");
        this.gpu.lock().textures.insert(this.white, white);

        tracing::info!(
            "Created wgpu sprite device: format={:?}, max_quads={}",
            format,
            max_quads
        );
        this
    }

    pub fn context(&self) -> &Arc<GraphicsContext> {
        &self.context
    }

    /// Make a texture view drawable under a fresh [`TextureId`].
    pub fn register_texture(&self, view: wgpu::TextureView, width: u32, height: u32) -> SpriteTexture {
        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        self.gpu.lock().textures.insert(id, view);
        tracing::debug!("Registered sprite texture {:?} ({}x{})", id, width, height);
        SpriteTexture::new(id, width, height)
    }

    /// Upload tightly packed RGBA8 pixels and register the result.
    pub fn create_texture_rgba8(&self, width: u32, height: u32, pixels: &[u8]) -> SpriteTexture {
        let view = self.create_texture_view(width, height, pixels, "Sprite Texture");
        self.register_texture(view, width, height)
    }

    /// Forget a texture. Draws still recorded with it fall back to white.
    pub fn unregister_texture(&self, id: TextureId) {
        if id == self.white {
            return;
        }
        let mut gpu = self.gpu.lock();
        gpu.textures.remove(&id);
        gpu.bind_groups.retain(|(texture, _), _| *texture != id);
    }

    /// Draw commands recorded since the last [`finish_frame`](Self::finish_frame).
    pub fn recorded_draws(&self) -> usize {
        self.recording.lock().commands.len()
    }

    /// Upload this frame's vertices and prepare every pipeline and bind group it needs.
    pub fn prepare(&self, viewport_width: u32, viewport_height: u32) {
        profile_function!();
        let recording = self.recording.lock();
        let mut gpu = self.gpu.lock();
        let queue = &self.context.queue;

        let uniforms = SpriteUniforms {
            viewport: [viewport_width.max(1) as f32, viewport_height.max(1) as f32],
            _padding: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let needed = recording.vertices.len() as u64;
        if needed > gpu.vertex_capacity {
            let capacity = needed.next_power_of_two();
            tracing::debug!("Growing sprite vertex buffer to {} bytes", capacity);
            gpu.vertex_buffer = create_vertex_buffer(&self.context.device, capacity);
            gpu.vertex_capacity = capacity;
        }
        if needed > 0 {
            queue.write_buffer(&gpu.vertex_buffer, 0, &recording.vertices);
        }

        for command in &recording.commands {
            if !gpu.pipelines.contains_key(&command.pipeline) {
                let pipeline = self.create_pipeline(command.pipeline);
                gpu.pipelines.insert(command.pipeline, pipeline);
            }

            let texture = gpu.resolve(command.texture, self.white);
            let key = (texture, command.sampler);
            if !gpu.bind_groups.contains_key(&key) {
                let Some(view) = gpu.textures.get(&texture) else {
                    continue;
                };
                let bind_group = self.create_bind_group(view, command.sampler);
                gpu.bind_groups.insert(key, bind_group);
            }
        }
    }

    /// Replay the recorded draws. Call after [`prepare`](Self::prepare).
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        profile_function!();
        let recording = self.recording.lock();
        if recording.commands.is_empty() {
            return;
        }
        let gpu = self.gpu.lock();

        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        let mut current_pipeline = None;
        let mut current_bind_group = None;
        let mut current_blend_constant = None;

        for command in &recording.commands {
            let bind_key = (gpu.resolve(command.texture, self.white), command.sampler);
            let (Some(pipeline), Some(bind_group)) =
                (gpu.pipelines.get(&command.pipeline), gpu.bind_groups.get(&bind_key))
            else {
                tracing::warn!("Skipping sprite draw that was not prepared");
                continue;
            };

            if current_pipeline != Some(command.pipeline) {
                pass.set_pipeline(pipeline);
                current_pipeline = Some(command.pipeline);
            }
            if current_bind_group != Some(bind_key) {
                pass.set_bind_group(1, bind_group, &[]);
                current_bind_group = Some(bind_key);
            }
            if current_blend_constant != Some(command.blend_constant) {
                pass.set_blend_constant(Color::from_argb(command.blend_constant).to_wgpu());
                current_blend_constant = Some(command.blend_constant);
            }

            let indices = command.start_index..command.start_index + command.index_count;
            pass.draw_indexed(indices, command.base_vertex, 0..1);
        }
    }

    /// Drop this frame's vertices and commands.
    pub fn finish_frame(&self) {
        let mut recording = self.recording.lock();
        recording.vertices.clear();
        recording.commands.clear();
        recording.segment_base = 0;
    }

    fn create_texture_view(&self, width: u32, height: u32, pixels: &[u8], label: &str) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let expected = (size.width * size.height * 4) as usize;
        if pixels.len() >= expected {
            self.context.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &pixels[..expected],
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * size.width),
                    rows_per_image: Some(size.height),
                },
                size,
            );
        } else {
            tracing::warn!(
                "Texture data too small for {}x{}: got {} bytes, need {}",
                size.width,
                size.height,
                pixels.len(),
                expected
            );
        }

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_bind_group(&self, view: &wgpu::TextureView, key: SamplerKey) -> wgpu::BindGroup {
        let sampler = self.samplers.get_or_create(&self.context.device, key);
        self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        })
    }

    fn create_pipeline(&self, key: PipelineKey) -> wgpu::RenderPipeline {
        tracing::debug!("Creating sprite pipeline {:?}", key);
        self.context.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: key.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                // Quads wind clockwise on screen
                front_face: wgpu::FrontFace::Cw,
                cull_mode: key.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

fn create_vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl SpriteDevice for WgpuSpriteDevice {
    fn bind_texture(&self, _slot: u32, texture: Option<TextureId>) {
        self.recording.lock().texture = texture;
    }

    fn set_address_mode(&self, _slot: u32, mode: wgpu::AddressMode) {
        self.recording.lock().sampler.address_mode = mode;
    }

    fn set_filter_mode(&self, _slot: u32, filter: wgpu::FilterMode) {
        self.recording.lock().sampler.filter = filter;
    }

    fn bind_builtin_program(&self) {
        // The sprite pipeline is the only program this backend has.
    }

    fn write_vertices_discard(&self, data: &[u8]) {
        let mut recording = self.recording.lock();
        recording.segment_base = (recording.vertices.len() / std::mem::size_of::<QuadVertex>()) as i32;
        recording.vertices.extend_from_slice(data);
    }

    fn draw_indexed(&self, _start_vertex: u32, _vertex_count: u32, start_index: u32, primitive_count: u32) {
        let mut recording = self.recording.lock();
        let command = DrawCommand {
            base_vertex: recording.segment_base,
            start_index,
            index_count: primitive_count * 3,
            texture: recording.texture,
            sampler: recording.sampler,
            pipeline: PipelineKey {
                blend: recording.alpha_blend.to_wgpu(),
                cull_mode: recording.cull_mode,
            },
            blend_constant: recording.alpha_blend.blend_constant,
        };
        recording.commands.push(command);
    }

    fn alpha_blend(&self) -> AlphaBlendState {
        self.recording.lock().alpha_blend
    }

    fn set_alpha_blend(&self, state: AlphaBlendState) {
        self.recording.lock().alpha_blend = state;
    }

    fn depth(&self) -> DepthState {
        self.recording.lock().depth
    }

    fn set_depth(&self, state: DepthState) {
        // Sprites render without a depth attachment; the state is only tracked.
        self.recording.lock().depth = state;
    }

    fn cull_mode(&self) -> Option<wgpu::Face> {
        self.recording.lock().cull_mode
    }

    fn set_cull_mode(&self, mode: Option<wgpu::Face>) {
        self.recording.lock().cull_mode = mode;
    }
}
