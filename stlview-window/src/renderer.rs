//! WGPU render backend: one pipeline, one vertex buffer, one draw per frame

use bytemuck::{Pod, Zeroable};
use nalgebra::Matrix4;
use std::sync::Arc;
use stlview_core::{FrameUniforms, RenderBackend, ShadingMode, Vertex, ViewerConfig, Viewport};
use tracing::{info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::{ViewerError, ViewerResult};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Maps OpenGL clip depth (-1..1) onto WGPU's (0..1)
#[rustfmt::skip]
pub fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl GpuVertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

impl From<&Vertex> for GpuVertex {
    fn from(vertex: &Vertex) -> Self {
        let [px, py, pz, nx, ny, nz] = vertex.interleaved();
        Self {
            position: [px, py, pz],
            normal: [nx, ny, nz],
        }
    }
}

/// Uniform block matching `Uniforms` in shader.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GpuUniforms {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_position: [f32; 3],
    shading: u32,
}

impl From<&FrameUniforms> for GpuUniforms {
    fn from(uniforms: &FrameUniforms) -> Self {
        Self {
            mvp: (opengl_to_wgpu() * uniforms.mvp).into(),
            model: uniforms.model.into(),
            light_position: uniforms.light_position.coords.into(),
            shading: match uniforms.shading {
                ShadingMode::Lit => 0,
                ShadingMode::Normals => 1,
            },
        }
    }
}

/// Pick an sRGB format when offered, else the first one, plus the first alpha mode
fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    alpha_modes: &[wgpu::CompositeAlphaMode],
) -> ViewerResult<(wgpu::TextureFormat, wgpu::CompositeAlphaMode)> {
    let format = formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| formats.first())
        .copied()
        .ok_or(ViewerError::IncompatibleSurface("texture format"))?;
    let alpha_mode = alpha_modes
        .first()
        .copied()
        .ok_or(ViewerError::IncompatibleSurface("alpha mode"))?;
    Ok((format, alpha_mode))
}

/// `requested` if the adapter can multisample at that count, otherwise 1
fn effective_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    if requested > 1 && supported(requested) {
        requested
    } else {
        1
    }
}

/// Multisampled color target that resolves into the swapchain image
fn create_msaa_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<wgpu::TextureView> {
    if sample_count == 1 {
        return None;
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("MSAA Color Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    sample_count: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,

    sample_count: u32,
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> ViewerResult<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;
        info!(adapter = %adapter.get_info().name, backend = ?adapter.get_info().backend, "GPU adapter selected");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("stlview Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let (surface_format, alpha_mode) =
            choose_surface_format(&surface_caps.formats, &surface_caps.alpha_modes)?;

        let color_flags = adapter.get_texture_format_features(surface_format).flags;
        let depth_flags = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
        let sample_count = effective_sample_count(viewer.msaa_samples, |count| {
            color_flags.sample_count_supported(count) && depth_flags.sample_count_supported(count)
        });
        if sample_count != viewer.msaa_samples {
            warn!(requested = viewer.msaa_samples, "multisampling unsupported, rendering without it");
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        info!("Configuring surface: {}x{}", config.width, config.height);
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size: std::mem::size_of::<GpuUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[GpuVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // STL winding is not reliable enough to cull
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
        });

        let depth_view = create_depth_texture(&device, config.width, config.height, sample_count);
        let msaa_view = create_msaa_view(&device, &config, sample_count);

        let [r, g, b, a] = viewer.clear_color;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            uniform_buffer,
            bind_group,
            vertex_buffer: None,
            sample_count,
            msaa_view,
            depth_view,
            clear_color: wgpu::Color { r, g, b, a },
        })
    }
}

impl RenderBackend for WgpuBackend {
    type Error = ViewerError;

    fn upload_mesh(&mut self, vertices: &[Vertex]) -> Result<(), Self::Error> {
        if vertices.is_empty() {
            self.vertex_buffer = None;
            return Ok(());
        }

        let data: Vec<GpuVertex> = vertices.iter().map(GpuVertex::from).collect();
        self.vertex_buffer = Some(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertices"),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        info!(vertices = vertices.len(), "mesh uploaded");
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        info!("Resizing to {}x{}", viewport.width, viewport.height);
        self.config.width = viewport.width;
        self.config.height = viewport.height;
        self.surface.configure(&self.device, &self.config);

        self.depth_view = create_depth_texture(
            &self.device,
            viewport.width,
            viewport.height,
            self.sample_count,
        );
        self.msaa_view = create_msaa_view(&self.device, &self.config, self.sample_count);
    }

    fn draw(&mut self, uniforms: &FrameUniforms, vertex_count: u32) -> Result<(), Self::Error> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // With MSAA the pass renders into the multisampled texture and resolves into the swapchain
        let (target, resolve_target) = match &self.msaa_view {
            Some(msaa_view) => (msaa_view, Some(&view)),
            None => (&view, None),
        };

        let gpu_uniforms = GpuUniforms::from(uniforms);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&gpu_uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(vertex_buffer) = &self.vertex_buffer {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.bind_group, &[]);
                render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                render_pass.draw(0..vertex_count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3, Vector4};

    #[test]
    fn test_uniform_block_size_matches_shader() {
        // mat4 + mat4 + vec3 + u32 under WGSL uniform layout rules
        assert_eq!(std::mem::size_of::<GpuUniforms>(), 144);
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 24);
        let v = GpuVertex::from(&Vertex::new(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, 1.0),
        ));
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_depth_remap() {
        let m = opengl_to_wgpu();
        let near = m * Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = m * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-6);
        assert!((far.z / far.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_surface_format_prefers_srgb() {
        let formats = [
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ];
        let (format, alpha) =
            choose_surface_format(&formats, &[wgpu::CompositeAlphaMode::Opaque]).unwrap();
        assert_eq!(format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(alpha, wgpu::CompositeAlphaMode::Opaque);

        let (format, _) = choose_surface_format(
            &[wgpu::TextureFormat::Rgba16Float],
            &[wgpu::CompositeAlphaMode::Auto],
        )
        .unwrap();
        assert_eq!(format, wgpu::TextureFormat::Rgba16Float);
    }

    #[test]
    fn test_empty_surface_capabilities_are_startup_errors() {
        let err = choose_surface_format(&[], &[wgpu::CompositeAlphaMode::Opaque]).unwrap_err();
        assert!(matches!(err, ViewerError::IncompatibleSurface("texture format")));

        let err = choose_surface_format(&[wgpu::TextureFormat::Bgra8Unorm], &[]).unwrap_err();
        assert!(matches!(err, ViewerError::IncompatibleSurface("alpha mode")));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_sample_count_falls_back_when_unsupported() {
        assert_eq!(effective_sample_count(4, |count| count == 4), 4);
        assert_eq!(effective_sample_count(4, |_| false), 1);
        assert_eq!(effective_sample_count(1, |_| true), 1);
    }

    #[test]
    fn test_uniform_conversion() {
        let uniforms = FrameUniforms {
            mvp: Matrix4::identity(),
            model: Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)),
            light_position: Point3::new(4.0, 5.0, 6.0),
            shading: ShadingMode::Normals,
        };
        let gpu = GpuUniforms::from(&uniforms);

        assert_eq!(gpu.shading, 1);
        assert_eq!(gpu.light_position, [4.0, 5.0, 6.0]);
        // Column-major: translation lives in the last column
        assert_eq!(gpu.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(gpu.mvp[2][2], 0.5);
    }
}
