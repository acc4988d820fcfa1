use catalog::Theme;
use scene::{MeshSource, ModelViewer, ViewerState};

use crate::dom;

/// `#rrggbb` or `#rgb` to linear-ish 0..1 channels. Anything else is `None`.
pub fn parse_hex_color(s: &str) -> Option<[f64; 3]> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |v: u8| v as f64 / 255.0;
    match hex.len() {
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some([
                channel((v >> 16) as u8),
                channel((v >> 8) as u8),
                channel(v as u8),
            ])
        }
        3 => {
            let mut out = [0.0; 3];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                let d = c.to_digit(16)? as u8;
                *slot = channel(d * 17);
            }
            Some(out)
        }
        _ => None,
    }
}

/// Background behind the model: the project's `backgroundColor` when it
/// parses, else a theme default.
pub fn clear_color(viewer: &ModelViewer, theme: Theme) -> [f64; 4] {
    let custom = viewer
        .request()
        .and_then(|r| r.background_color.as_deref())
        .and_then(parse_hex_color);
    let [r, g, b] = custom.unwrap_or(match theme {
        Theme::Light => [0.93, 0.94, 0.96],
        Theme::Dark => [0.08, 0.09, 0.11],
    });
    [r, g, b, 1.0]
}

/// What the overlay on top of the 3D canvas shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Hidden,
    Loading { percent: Option<u32> },
    Error { message: String },
}

impl Overlay {
    pub fn for_viewer(viewer: &ModelViewer) -> Self {
        match viewer.state() {
            ViewerState::Loading { .. } => Overlay::Loading {
                percent: viewer.progress().map(|p| (p * 100.0).round() as u32),
            },
            ViewerState::Error { message } => Overlay::Error {
                message: message.clone(),
            },
            ViewerState::Uninitialized | ViewerState::Displayed(_) => Overlay::Hidden,
        }
    }

    /// Updates `#model-loading`, `#model-progress`, `#model-error` and
    /// `#model-error-message`.
    pub fn apply(&self) {
        match self {
            Overlay::Hidden => {
                dom::set_hidden("model-loading", true);
                dom::set_hidden("model-error", true);
            }
            Overlay::Loading { percent } => {
                dom::set_hidden("model-error", true);
                dom::set_hidden("model-loading", false);
                let text = match percent {
                    Some(p) => format!("Loading model… {p}%"),
                    None => "Loading model…".to_string(),
                };
                dom::set_text("model-progress", &text);
            }
            Overlay::Error { message } => {
                dom::set_hidden("model-loading", true);
                dom::set_hidden("model-error", false);
                dom::set_text("model-error-message", message);
            }
        }
    }
}

/// Short caption for the corner of the 3D panel.
pub fn caption(viewer: &ModelViewer) -> &'static str {
    match viewer.state() {
        ViewerState::Displayed(MeshSource::DefaultCube) => "Model format not supported, showing a placeholder",
        ViewerState::Displayed(MeshSource::Demo) => "Demo cube",
        _ => "",
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use foundation::math::Mat4;
    use formats::Mesh;
    use std::borrow::Cow;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    pub struct MeshRenderer {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        _canvas: web_sys::HtmlCanvasElement,
        pipeline: ::wgpu::RenderPipeline,
        uniform_buffer: ::wgpu::Buffer,
        uniform_bind_group: ::wgpu::BindGroup,
        depth_view: ::wgpu::TextureView,
        vertex_buffer: Option<::wgpu::Buffer>,
        index_buffer: Option<::wgpu::Buffer>,
        index_count: u32,
    }

    const MESH_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    light_dir: vec3<f32>,
    _pad: f32,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    let world = globals.model * vec4<f32>(position, 1.0);
    let n = (globals.model * vec4<f32>(normal, 0.0)).xyz;
    return VsOut(globals.view_proj * world, n);
}

@fragment
fn fs_main(fs_in: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(fs_in.normal);
    let l = normalize(globals.light_dir);
    // Two-sided so scans with flipped winding still read.
    let ndotl = abs(dot(n, l));
    let base = vec3<f32>(0.78, 0.80, 0.84);
    let shade = 0.30 + 0.70 * ndotl;
    return vec4<f32>(base * shade, 1.0);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        normal: [f32; 3],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        view_proj: [[f32; 4]; 4],
        model: [[f32; 4]; 4],
        light_dir: [f32; 3],
        _pad: f32,
    }

    const LIGHT_DIR: [f32; 3] = [0.4, 0.8, 0.5];

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("model-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    impl MeshRenderer {
        pub async fn from_canvas_id(canvas_id: &str) -> Result<Self, JsValue> {
            let canvas = crate::dom::element(canvas_id)?.dyn_into::<web_sys::HtmlCanvasElement>()?;
            let width = canvas.width();
            let height = canvas.height();

            // The surface must not outlive its instance; the instance lives
            // as long as the page.
            let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
                &::wgpu::InstanceDescriptor {
                    backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                    ..Default::default()
                },
            )));

            let surface = instance
                .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
                .map_err(|e| JsValue::from_str(&format!("surface error: {e}")))?;

            let adapter = instance
                .request_adapter(&::wgpu::RequestAdapterOptions {
                    power_preference: ::wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| JsValue::from_str(&format!("adapter error: {e}")))?;

            let (device, queue) = adapter
                .request_device(&::wgpu::DeviceDescriptor {
                    label: Some("model-device"),
                    required_features: ::wgpu::Features::empty(),
                    required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                    ..Default::default()
                })
                .await
                .map_err(|e| JsValue::from_str(&format!("device error: {e}")))?;

            let caps = surface.get_capabilities(&adapter);
            let format = caps
                .formats
                .iter()
                .copied()
                .find(|f| f.is_srgb())
                .or_else(|| caps.formats.first().copied())
                .ok_or_else(|| JsValue::from_str("surface has no formats"))?;
            let alpha_mode = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

            let config = ::wgpu::SurfaceConfiguration {
                usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: width.max(1),
                height: height.max(1),
                desired_maximum_frame_latency: 2,
                present_mode: ::wgpu::PresentMode::Fifo,
                alpha_mode,
                view_formats: vec![],
            };
            surface.configure(&device, &config);
            let depth_view = create_depth_view(&device, &config);

            let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
                label: Some("model-shader"),
                source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER)),
            });

            let uniform_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
                label: Some("model-globals"),
                size: std::mem::size_of::<Globals>() as u64,
                usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bind_group_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("model-globals-bgl"),
                entries: &[::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: ::wgpu::BindingType::Buffer {
                        ty: ::wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

            let uniform_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
                label: Some("model-globals-bg"),
                layout: &bind_group_layout,
                entries: &[::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

            let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
                label: Some("model-pipeline-layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

            let pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
                label: Some("model-pipeline"),
                layout: Some(&pipeline_layout),
                vertex: ::wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[::wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
                        step_mode: ::wgpu::VertexStepMode::Vertex,
                        attributes: &[
                            ::wgpu::VertexAttribute {
                                format: ::wgpu::VertexFormat::Float32x3,
                                offset: 0,
                                shader_location: 0,
                            },
                            ::wgpu::VertexAttribute {
                                format: ::wgpu::VertexFormat::Float32x3,
                                offset: 12,
                                shader_location: 1,
                            },
                        ],
                    }],
                },
                fragment: Some(::wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(::wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(::wgpu::BlendState::REPLACE),
                        write_mask: ::wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: ::wgpu::PrimitiveState {
                    topology: ::wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: ::wgpu::FrontFace::Ccw,
                    // Survey meshes do not agree on winding.
                    cull_mode: None,
                    polygon_mode: ::wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(::wgpu::DepthStencilState {
                    format: ::wgpu::TextureFormat::Depth24Plus,
                    depth_write_enabled: true,
                    depth_compare: ::wgpu::CompareFunction::Less,
                    stencil: ::wgpu::StencilState::default(),
                    bias: ::wgpu::DepthBiasState::default(),
                }),
                multisample: ::wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

            Ok(Self {
                _instance: instance,
                surface,
                device,
                queue,
                config,
                _canvas: canvas,
                pipeline,
                uniform_buffer,
                uniform_bind_group,
                depth_view,
                vertex_buffer: None,
                index_buffer: None,
                index_count: 0,
            })
        }

        pub fn resize(&mut self, width: u32, height: u32) {
            self.config.width = width.max(1);
            self.config.height = height.max(1);
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }

        pub fn size(&self) -> (u32, u32) {
            (self.config.width, self.config.height)
        }

        /// Replaces the GPU copy of the mesh; `None` draws nothing.
        pub fn upload(&mut self, mesh: Option<&Mesh>) {
            let Some(mesh) = mesh.filter(|m| !m.is_empty()) else {
                self.vertex_buffer = None;
                self.index_buffer = None;
                self.index_count = 0;
                return;
            };
            let vertices: Vec<Vertex> = mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .map(|(p, n)| Vertex {
                    position: *p,
                    normal: *n,
                })
                .collect();
            self.vertex_buffer = Some(self.device.create_buffer_init(
                &::wgpu::util::BufferInitDescriptor {
                    label: Some("model-vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: ::wgpu::BufferUsages::VERTEX,
                },
            ));
            self.index_buffer = Some(self.device.create_buffer_init(
                &::wgpu::util::BufferInitDescriptor {
                    label: Some("model-indices"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: ::wgpu::BufferUsages::INDEX,
                },
            ));
            self.index_count = mesh.indices.len() as u32;
        }

        pub fn render(&self, view_proj: Mat4, model: Mat4, clear: [f64; 4]) -> Result<(), JsValue> {
            let frame = self
                .surface
                .get_current_texture()
                .map_err(|e| JsValue::from_str(&format!("surface acquire failed: {e}")))?;
            let view = frame
                .texture
                .create_view(&::wgpu::TextureViewDescriptor::default());

            let globals = Globals {
                view_proj,
                model,
                light_dir: LIGHT_DIR,
                _pad: 0.0,
            };
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&globals));

            let mut encoder = self
                .device
                .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                    label: Some("model-encoder"),
                });
            {
                let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                    label: Some("model-pass"),
                    color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        depth_slice: None,
                        ops: ::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(::wgpu::Color {
                                r: clear[0],
                                g: clear[1],
                                b: clear[2],
                                a: clear[3],
                            }),
                            store: ::wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(1.0),
                            store: ::wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

                if let (Some(vb), Some(ib)) = (&self.vertex_buffer, &self.index_buffer) {
                    rpass.set_pipeline(&self.pipeline);
                    rpass.set_bind_group(0, &self.uniform_bind_group, &[]);
                    rpass.set_vertex_buffer(0, vb.slice(..));
                    rpass.set_index_buffer(ib.slice(..), ::wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..self.index_count, 0, 0..1);
                }
            }

            self.queue.submit(std::iter::once(encoder.finish()));
            frame.present();
            Ok(())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use foundation::math::Mat4;
    use formats::Mesh;
    use wasm_bindgen::prelude::JsValue;

    #[derive(Debug, Default)]
    pub struct MeshRenderer;

    impl MeshRenderer {
        pub async fn from_canvas_id(_canvas_id: &str) -> Result<Self, JsValue> {
            Err(JsValue::from_str(
                "wgpu rendering is only available on wasm32 targets",
            ))
        }

        pub fn resize(&mut self, _width: u32, _height: u32) {}

        pub fn size(&self) -> (u32, u32) {
            (1, 1)
        }

        pub fn upload(&mut self, _mesh: Option<&Mesh>) {}

        pub fn render(&self, _view_proj: Mat4, _model: Mat4, _clear: [f64; 4]) -> Result<(), JsValue> {
            Err(JsValue::from_str(
                "wgpu rendering is only available on wasm32 targets",
            ))
        }
    }
}

pub use imp::MeshRenderer;

#[cfg(test)]
mod tests {
    use super::{Overlay, clear_color, parse_hex_color};
    use catalog::Theme;
    use formats::{Mesh, ModelFormat};
    use scene::{LoadError, ModelRequest, ModelViewer};

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color(" #000 "), Some([0.0, 0.0, 0.0]));
        let [r, g, b] = parse_hex_color("#ff8000").unwrap();
        assert_eq!(r, 1.0);
        assert!((g - 128.0 / 255.0).abs() < 1e-12);
        assert_eq!(b, 0.0);
        assert_eq!(parse_hex_color("ffffff"), None);
        assert_eq!(parse_hex_color("#ff80"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn background_prefers_project_color() {
        let mut viewer = ModelViewer::new();
        assert_eq!(clear_color(&viewer, Theme::Dark), [0.08, 0.09, 0.11, 1.0]);

        let mut request = ModelRequest::new("models/site.glb", Some(ModelFormat::Glb));
        request.background_color = Some("#ffffff".to_string());
        viewer.begin_load(request);
        assert_eq!(clear_color(&viewer, Theme::Dark), [1.0, 1.0, 1.0, 1.0]);

        let mut request = ModelRequest::new("models/site.glb", Some(ModelFormat::Glb));
        request.background_color = Some("navy".to_string());
        viewer.begin_load(request);
        assert_eq!(clear_color(&viewer, Theme::Light), [0.93, 0.94, 0.96, 1.0]);
    }

    #[test]
    fn overlay_follows_viewer_state() {
        let mut viewer = ModelViewer::new();
        assert_eq!(Overlay::for_viewer(&viewer), Overlay::Hidden);

        let ticket = viewer
            .begin_load(ModelRequest::new("models/site.obj", Some(ModelFormat::Obj)))
            .unwrap();
        assert_eq!(Overlay::for_viewer(&viewer), Overlay::Loading { percent: None });
        viewer.report_progress(ticket, 250, Some(1000));
        assert_eq!(Overlay::for_viewer(&viewer), Overlay::Loading { percent: Some(25) });

        viewer.finish_load(ticket, Err(LoadError::Empty));
        assert!(matches!(Overlay::for_viewer(&viewer), Overlay::Error { .. }));

        let ticket = viewer.retry().unwrap();
        viewer.finish_load(ticket, Ok(Mesh::cube(1.0)));
        assert_eq!(Overlay::for_viewer(&viewer), Overlay::Hidden);
    }
}
