use crate::constants::{SHADOW_DEPTH_BIAS_CONSTANT, SHADOW_DEPTH_BIAS_SLOPE};
use kustomizer_core::geometry::MeshData;
use kustomizer_core::loaders::decode_data_uri;
use kustomizer_core::loaders::texture::TextureImage;
use kustomizer_core::scene::{MeshHandle, TextureHandle};
use kustomizer_core::{FrameDescription, RenderBackend, RenderError, SCENE_WGSL};
use fnv::FnvHashMap;
use web_sys as web;

mod helpers;
mod mesh;
mod shadow;

use mesh::{GlobalsUniform, GpuMesh, GpuTexture, ObjectUniform};
use shadow::ShadowMap;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// WebGPU implementation of the scene backend, drawing into one canvas.
pub struct GpuRenderer {
    canvas: web::HtmlCanvasElement,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_tex: wgpu::Texture,
    depth_view: wgpu::TextureView,
    shadow: ShadowMap,
    scene_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bg: wgpu::BindGroup,
    // the shadow pass writes the shadow map, so it binds the uniform alone
    shadow_globals_bg: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    meshes: FnvHashMap<u64, GpuMesh>,
    textures: FnvHashMap<u64, GpuTexture>,
    white: GpuTexture,
    next_id: u64,
    disposed: bool,
}

impl GpuRenderer {
    pub async fn new(canvas: &web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("[gpu] surface {:?} {}x{}", format, width, height);

        let (depth_tex, depth_view) = helpers::create_depth_texture(
            &device,
            "depth",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let shadow = ShadowMap::new(&device);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_wgsl"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(SCENE_WGSL)),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[
                helpers::uniform_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let shadow_globals_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow_globals_layout"),
                entries: &[helpers::uniform_entry(0)],
            });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_layout"),
            entries: &[
                helpers::uniform_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bg"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow.sampler),
                },
            ],
        });
        let shadow_globals_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_globals_bg"),
            layout: &shadow_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow_layout"),
            bind_group_layouts: &[&shadow_globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let scene_pipeline = helpers::make_scene_pipeline(&device, &scene_layout, &shader, format);
        let shadow_pipeline = helpers::make_shadow_pipeline(
            &device,
            &shadow_layout,
            &shader,
            wgpu::DepthBiasState {
                constant: SHADOW_DEPTH_BIAS_CONSTANT,
                slope_scale: SHADOW_DEPTH_BIAS_SLOPE,
                clamp: 0.0,
            },
        );
        let white = GpuTexture::white(&device, &queue);

        Ok(Self {
            canvas: canvas.clone(),
            surface,
            device,
            queue,
            config,
            depth_tex,
            depth_view,
            shadow,
            scene_pipeline,
            shadow_pipeline,
            globals_buffer,
            globals_bg,
            shadow_globals_bg,
            object_layout,
            meshes: FnvHashMap::default(),
            textures: FnvHashMap::default(),
            white,
            next_id: 1,
            disposed: false,
        })
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Write per-frame uniforms and refresh bind groups. Returns the mesh ids to draw.
    fn prepare(&mut self, frame: &FrameDescription) -> Vec<u64> {
        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&GlobalsUniform::from_frame(frame)),
        );
        let mut ids = Vec::with_capacity(frame.items.len());
        for item in &frame.items {
            let Some(mesh) = self.meshes.get_mut(&item.mesh.0) else {
                log::warn!("[gpu] skipping unknown mesh {}", item.mesh.0);
                continue;
            };
            let bound = item
                .material
                .texture
                .and_then(|t| self.textures.get(&t.0).map(|tex| (t.0, tex)));
            let (key, texture) = match bound {
                Some((id, tex)) => (Some(id), tex),
                None => (None, &self.white),
            };
            self.queue.write_buffer(
                &mesh.object_buffer,
                0,
                bytemuck::bytes_of(&ObjectUniform::from_item(item, key.is_some())),
            );
            mesh.ensure_bind_group(&self.device, &self.object_layout, key, texture);
            ids.push(item.mesh.0);
        }
        ids
    }

    /// Draw and present one frame. `false` when the surface had to be
    /// reconfigured and nothing was drawn.
    fn draw(&mut self, frame: &FrameDescription) -> Result<bool, RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(e) => return Err(RenderError::Surface(format!("{:?}", e))),
        };
        let ids = self.prepare(frame);
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.shadow_pipeline);
            pass.set_bind_group(0, &self.shadow_globals_bg, &[]);
            self.encode_meshes(&mut pass, &ids);
        }

        let [r, g, b] = frame.clear_color.to_linear();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
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
            pass.set_pipeline(&self.scene_pipeline);
            pass.set_bind_group(0, &self.globals_bg, &[]);
            self.encode_meshes(&mut pass, &ids);
        }

        self.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(true)
    }

    fn encode_meshes(&self, pass: &mut wgpu::RenderPass<'_>, ids: &[u64]) {
        for id in ids {
            let Some(mesh) = self.meshes.get(id) else {
                continue;
            };
            let Some(bg) = mesh.bind_group() else {
                continue;
            };
            pass.set_bind_group(1, bg, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

impl RenderBackend for GpuRenderer {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        if self.disposed {
            return Err(RenderError::Backend("renderer disposed".into()));
        }
        let id = self.next_id();
        self.meshes.insert(id, GpuMesh::upload(&self.device, mesh));
        Ok(MeshHandle(id))
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle.0) {
            mesh.destroy();
        }
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, RenderError> {
        if self.disposed {
            return Err(RenderError::Backend("renderer disposed".into()));
        }
        let limit = self.device.limits().max_texture_dimension_2d;
        if image.width == 0 || image.height == 0 || image.width > limit || image.height > limit {
            return Err(RenderError::Backend(format!(
                "texture {}x{} outside 1..={}",
                image.width, image.height, limit
            )));
        }
        let id = self.next_id();
        self.textures
            .insert(id, GpuTexture::upload(&self.device, &self.queue, image));
        // bind groups that referenced a released id are rebuilt lazily by key
        Ok(TextureHandle(id))
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.textures.remove(&handle.0) {
            texture.texture.destroy();
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.disposed {
            return;
        }
        let (width, height) = (width.max(1), height.max(1));
        if width == self.config.width && height == self.config.height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        let (depth_tex, depth_view) = helpers::create_depth_texture(
            &self.device,
            "depth",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        self.depth_tex.destroy();
        self.depth_tex = depth_tex;
        self.depth_view = depth_view;
    }

    fn render(&mut self, frame: &FrameDescription) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }
        self.draw(frame).map(|_| ())
    }

    fn capture_png(&mut self, frame: &FrameDescription) -> Result<Vec<u8>, RenderError> {
        if self.disposed {
            return Err(RenderError::Backend("renderer disposed".into()));
        }
        // the canvas keeps the presented image until the current task ends
        if !self.draw(frame)? {
            return Err(RenderError::Surface(
                "surface lost before capture; canvas holds a stale frame".into(),
            ));
        }
        let uri = self
            .canvas
            .to_data_url()
            .map_err(|e| RenderError::Backend(format!("toDataURL failed: {:?}", e)))?;
        decode_data_uri(&uri).map_err(|e| RenderError::Backend(e.to_string()))
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, mesh) in self.meshes.drain() {
            mesh.destroy();
        }
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
        self.white.texture.destroy();
        self.shadow.texture.destroy();
        self.depth_tex.destroy();
        self.globals_buffer.destroy();
        log::info!("[gpu] disposed");
    }
}
