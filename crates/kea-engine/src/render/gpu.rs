use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{AtlasId, DrawList, Scene, TextureAtlas};

use super::batch::{FrameStats, SpriteBatch};
use super::buffers::ElementArrayBuffer;
use super::{MatrixStack, RenderError, RendererConfig};

/// Batched sprite renderer on wgpu.
///
/// Each frame runs Init → Clear → Traverse → Flush → Draw:
/// - Init: pipeline, sampler and globals uniform are created on first use
/// - Clear: the batch is reset and the pass clears to `clear_color`
/// - Traverse: the scene is flattened into a draw list and compiled to quads
/// - Flush: vertex arrays and the quad index buffer are uploaded
/// - Draw: one `draw_indexed` per texture range
///
/// Atlas textures are uploaded once, the first time a frame references them.
/// Solid quads sample a 1×1 white texture created the same way.
pub struct GlRenderer {
    config: RendererConfig,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    globals_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,
    globals_ubo: Option<wgpu::Buffer>,
    globals_bind_group: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,

    textures: HashMap<AtlasId, AtlasTexture>,
    white: Option<AtlasTexture>,

    ibo: ElementArrayBuffer,
    batch: SpriteBatch,
    draw_list: DrawList,
    mv_stack: MatrixStack,
    stats: FrameStats,
}

struct AtlasTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl GlRenderer {
    pub fn new(config: RendererConfig) -> Self {
        let max_items = config.clamped_max_items();
        Self {
            batch: SpriteBatch::new(max_items, config.overflow),
            ibo: ElementArrayBuffer::new(max_items),
            config,
            pipeline_format: None,
            pipeline: None,
            globals_bgl: None,
            texture_bgl: None,
            globals_ubo: None,
            globals_bind_group: None,
            sampler: None,
            textures: HashMap::new(),
            white: None,
            draw_list: DrawList::new(),
            mv_stack: MatrixStack::new(),
            stats: FrameStats::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Counters of the last rendered frame.
    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Renders `scene` into `target`, clearing it first.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        scene: &mut Scene,
    ) -> Result<FrameStats, RenderError> {
        // Init
        self.ensure_pipeline(ctx);
        self.ensure_sampler(ctx);
        self.ensure_globals(ctx);

        // Clear
        self.batch.begin();

        // Traverse
        scene.build_draw_list(&mut self.draw_list);
        self.batch
            .extend_from_list(&self.draw_list, |id| scene.atlas(id).map(TextureAtlas::size));
        for id in self.batch.batches().iter().filter_map(|r| r.texture) {
            if let Some(atlas) = scene.atlas(id) {
                Self::ensure_texture(&mut self.textures, ctx, self.texture_bgl.as_ref(), self.sampler.as_ref(), id, atlas);
            }
        }
        if self.batch.batches().iter().any(|r| r.texture.is_none()) {
            self.ensure_white(ctx);
        }

        // Flush
        self.batch.upload(ctx.device, ctx.queue);
        self.ibo.reserve(self.batch.capacity());
        self.ibo.upload(ctx.device);

        self.mv_stack.push();
        self.mv_stack.apply(&scene.camera.view_matrix());
        self.write_globals(ctx);
        self.mv_stack.pop()?;

        // Draw
        self.draw(target);

        self.stats = self.batch.stats();
        Ok(self.stats)
    }

    fn draw(&self, target: &mut RenderTarget<'_>) {
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kea sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.config.clear_color.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if self.batch.entity_count() == 0 {
            return;
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(globals) = self.globals_bind_group.as_ref() else { return };
        let Some(ibo) = self.ibo.buffer() else { return };
        let (Some(pos), Some(uv), Some(color)) = (
            self.batch.positions().buffer(),
            self.batch.uvs().buffer(),
            self.batch.colors().buffer(),
        ) else {
            return;
        };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, globals, &[]);
        rpass.set_vertex_buffer(0, pos.slice(..self.batch.positions().byte_len()));
        rpass.set_vertex_buffer(1, uv.slice(..self.batch.uvs().byte_len()));
        rpass.set_vertex_buffer(2, color.slice(..self.batch.colors().byte_len()));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);

        for range in self.batch.batches() {
            let tex = match range.texture {
                Some(id) => self.textures.get(&id),
                None => self.white.as_ref(),
            };
            let Some(tex) = tex else { continue };
            rpass.set_bind_group(1, &tex.bind_group, &[]);
            rpass.draw_indexed(range.first_index..range.first_index + range.index_count, 0, 0..1);
        }
    }

    fn write_globals(&self, ctx: &RenderCtx<'_>) {
        let Some(ubo) = self.globals_ubo.as_ref() else { return };
        let [w, h] = ctx.viewport.resolution();
        let u = GlobalsUniform {
            mv: self.mv_stack.current().to_uniform_cols(),
            resolution: [w, h, 0.0, 0.0],
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kea sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let globals_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kea globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<GlobalsUniform>() as u64),
                },
                count: None,
            }],
        });

        let texture_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kea atlas bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kea sprite pipeline layout"),
            bind_group_layouts: &[&globals_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("kea sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[POSITION_LAYOUT, UV_LAYOUT, COLOR_LAYOUT],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Negative scale flips winding.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.globals_bgl = Some(globals_bgl);
        self.texture_bgl = Some(texture_bgl);

        // Bind groups reference the old layouts.
        self.globals_ubo = None;
        self.globals_bind_group = None;
        self.textures.clear();
        self.white = None;
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("kea atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    fn ensure_globals(&mut self, ctx: &RenderCtx<'_>) {
        if self.globals_bind_group.is_some() && self.globals_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.globals_bgl.as_ref() else { return };

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kea globals ubo"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kea globals bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        self.globals_ubo = Some(ubo);
        self.globals_bind_group = Some(bind_group);
    }

    fn ensure_white(&mut self, ctx: &RenderCtx<'_>) {
        if self.white.is_some() {
            return;
        }
        let (Some(bgl), Some(sampler)) = (self.texture_bgl.as_ref(), self.sampler.as_ref()) else { return };
        self.white = Some(upload_texture(ctx, bgl, sampler, "kea white texel", 1, 1, &[255; 4]));
    }

    fn ensure_texture(
        textures: &mut HashMap<AtlasId, AtlasTexture>,
        ctx: &RenderCtx<'_>,
        bgl: Option<&wgpu::BindGroupLayout>,
        sampler: Option<&wgpu::Sampler>,
        id: AtlasId,
        atlas: &TextureAtlas,
    ) {
        if textures.contains_key(&id) {
            return;
        }
        let (Some(bgl), Some(sampler)) = (bgl, sampler) else { return };

        let image = atlas.image();
        let texture = upload_texture(ctx, bgl, sampler, atlas.name(), image.width(), image.height(), image.rgba());

        log::debug!("GlRenderer: uploaded atlas {:?} ({}x{})", atlas.name(), image.width(), image.height());
        textures.insert(id, texture);
    }
}

/// Creates an RGBA8 sRGB texture from `rgba` and its bind group.
fn upload_texture(
    ctx: &RenderCtx<'_>,
    bgl: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> AtlasTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("kea atlas bind group"),
        layout: bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    AtlasTexture { _texture: texture, bind_group }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GlobalsUniform {
    mv: [[f32; 4]; 3],
    resolution: [f32; 4],
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const UV_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const COLOR_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x4];

const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &POSITION_ATTRS,
};

const UV_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &UV_ATTRS,
};

const COLOR_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 4]>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &COLOR_ATTRS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_match_wgsl_layout() {
        // mat3x3<f32> (3 × vec4 columns) + vec4<f32>.
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 64);
    }

    #[test]
    fn new_renderer_clamps_capacity() {
        let r = GlRenderer::new(RendererConfig { max_items: 0, ..Default::default() });
        assert_eq!(r.batch.capacity(), 1);
        assert_eq!(r.ibo.quads(), 1);
    }
}
