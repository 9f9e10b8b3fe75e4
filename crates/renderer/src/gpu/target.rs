use winit::dpi::PhysicalSize;

/// Format of the offscreen field buffer. Unorm storage clamps the field to
/// `[0, 1]` before the dither pass reads it.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Offscreen colour buffer the field pass renders into.
pub(crate) struct RenderTarget {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    size: PhysicalSize<u32>,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("field render target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    /// Reallocates at `size`; returns whether a new texture was created.
    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) -> bool {
        if size == self.size || size.width == 0 || size.height == 0 {
            return false;
        }
        let previous = std::mem::replace(self, Self::new(device, size));
        previous.destroy();
        true
    }

    pub fn destroy(self) {
        self.texture.destroy();
    }
}
