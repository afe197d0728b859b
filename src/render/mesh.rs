use glam::Mat4;
use kustomizer_core::geometry::MeshData;
use kustomizer_core::loaders::texture::{TextureImage, WrapMode};
use kustomizer_core::scene::{DrawItem, FrameDescription};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_pos: [f32; 4], // w: key intensity
    params: [f32; 4],    // x: ambient, y: shadow texel size
}

impl GlobalsUniform {
    pub(crate) fn from_frame(frame: &FrameDescription) -> Self {
        let l = &frame.lighting;
        Self {
            view_proj: (frame.projection * frame.view).to_cols_array_2d(),
            light_view_proj: l.shadow_view_proj.to_cols_array_2d(),
            camera_pos: frame.camera_position.extend(1.0).to_array(),
            light_pos: l.key_position.extend(l.key_intensity).to_array(),
            params: [
                l.ambient_intensity,
                1.0 / l.shadow_map_size.max(1) as f32,
                0.0,
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    material: [f32; 4], // x: shininess, y: 1 when textured
}

impl ObjectUniform {
    pub(crate) fn from_item(item: &DrawItem, textured: bool) -> Self {
        let [r, g, b] = item.material.color.to_linear();
        Self {
            model: item.model.to_cols_array_2d(),
            normal_matrix: normal_matrix(item.model).to_cols_array_2d(),
            color: [r, g, b, 1.0],
            material: [
                item.material.shininess,
                if textured { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

fn normal_matrix(model: Mat4) -> Mat4 {
    if model.determinant().abs() > f32::EPSILON {
        model.inverse().transpose()
    } else {
        Mat4::IDENTITY
    }
}

pub(crate) struct GpuMesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
    pub(crate) object_buffer: wgpu::Buffer,
    /// Bind group for the texture key it was built with (`None` = dummy white).
    pub(crate) bind_group: Option<(Option<u64>, wgpu::BindGroup)>,
}

impl GpuMesh {
    pub(crate) fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertices = mesh.vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_object"),
            size: std::mem::size_of::<ObjectUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            object_buffer,
            bind_group: None,
        }
    }

    pub(crate) fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.object_buffer.destroy();
    }

    pub(crate) fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref().map(|(_, bg)| bg)
    }

    /// Rebuild the object bind group when the bound texture changed.
    pub(crate) fn ensure_bind_group(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        key: Option<u64>,
        texture: &GpuTexture,
    ) {
        if matches!(&self.bind_group, Some((k, _)) if *k == key) {
            return;
        }
        let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.object_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });
        self.bind_group = Some((key, bg));
    }
}

pub(crate) struct GpuTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
}

fn address_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

impl GpuTexture {
    pub(crate) fn upload(device: &wgpu::Device, queue: &wgpu::Queue, image: &TextureImage) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("surface_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("surface_sampler"),
            address_mode_u: address_mode(image.wrap_u),
            address_mode_v: address_mode(image.wrap_v),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
        }
    }

    /// 1x1 white texture bound for untextured materials.
    pub(crate) fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = TextureImage {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
        };
        Self::upload(device, queue, &image)
    }
}
