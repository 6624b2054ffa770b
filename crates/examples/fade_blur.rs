//! Camera fade and full-screen blur over a procedural scene
//!
//! A checkerboard is copied into an offscreen scene color target every
//! frame, the post-process stack runs over it, and the result is drawn to
//! the window. Both effects pulse in and out.
//!
//! Controls:
//!   F      - toggle the fade
//!   B      - toggle the blur
//!   G      - switch between graph and immediate scheduling
//!   Escape - exit

use veil_pass_blur::{BlurFeature, BlurSettings};
use veil_pass_fade::{FadeFeature, FadeSettings};
use veil_render::features::FeatureRegistry;
use veil_render::gpu::{ShaderLibrary, WgpuBackend};
use veil_render::graph::ResourceHandle;
use veil_render::{ParameterStack, PostProcessConfig, PostProcessStack, ScheduleMode, ViewDescriptor};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};
use std::sync::Arc;

const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const CHECKER_SIZE: u32 = 48;

fn main() {
    env_logger::init();
    log::info!("Starting Veil fade/blur example");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut app = App { state: None };

    event_loop.run_app(&mut app).expect("Event loop error");
}

struct App {
    state: Option<AppState>,
}

/// Checkerboard source and the scene color target effects run on
struct SceneTargets {
    pattern: wgpu::Texture,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl SceneTargets {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };

        let pattern = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Checker Pattern"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let light = ((x / CHECKER_SIZE) + (y / CHECKER_SIZE)) % 2 == 0;
                let r = (x * 255 / width) as u8;
                let b = (y * 255 / height) as u8;
                let px = if light { [r, 220, b, 255] } else { [20, 24, 32, 255] };
                pixels.extend_from_slice(&px);
            }
        }
        queue.write_texture(
            pattern.as_image_copy(),
            &pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        Self { pattern, color, color_view, width, height }
    }
}

struct AppState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface_config: wgpu::SurfaceConfiguration,
    shaders: ShaderLibrary,
    backend: WgpuBackend,
    stack: PostProcessStack,
    scene: SceneTargets,
    start: std::time::Instant,
    fade_on: bool,
    blur_on: bool,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Veil - Fade & Blur")
                        .with_inner_size(winit::dpi::LogicalSize::new(1280u32, 720u32)),
                )
                .expect("Failed to create window"),
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .expect("Failed to create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("Failed to find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .expect("Failed to create device");

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let mut shaders = ShaderLibrary::new(device.clone()).expect("Failed to load blit program");
        // A program that fails to compile leaves its effect switched off
        if let Err(e) = veil_pass_fade::register_program(&mut shaders) {
            log::warn!("Camera fade unavailable: {}", e);
        }
        if let Err(e) = veil_pass_blur::register_program(&mut shaders) {
            log::warn!("Blur unavailable: {}", e);
        }

        let features = FeatureRegistry::builder()
            .with_feature(FadeFeature::new())
            .with_feature(BlurFeature::new())
            .build()
            .expect("Failed to build feature registry");
        let stack = PostProcessStack::new(PostProcessConfig::default(), features, &shaders)
            .expect("Failed to create post-process stack");

        let backend = WgpuBackend::new(device.clone());
        let scene = SceneTargets::new(&device, &queue, size.width, size.height);

        self.state = Some(AppState {
            window,
            surface,
            device,
            queue,
            surface_config,
            shaders,
            backend,
            stack,
            scene,
            start: std::time::Instant::now(),
            fade_on: true,
            blur_on: true,
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else { return };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutting down");
                state.shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(key),
                    repeat: false,
                    ..
                },
                ..
            } => match key {
                KeyCode::Escape => {
                    state.shutdown();
                    event_loop.exit();
                }
                KeyCode::KeyF => state.fade_on = !state.fade_on,
                KeyCode::KeyB => state.blur_on = !state.blur_on,
                KeyCode::KeyG => {
                    let mode = match state.stack.config().mode {
                        ScheduleMode::Graph => ScheduleMode::Immediate,
                        ScheduleMode::Immediate => ScheduleMode::Graph,
                    };
                    log::info!("Schedule mode: {:?}", mode);
                    state.stack.set_mode(mode);
                    state.window.set_title(&format!("Veil - Fade & Blur ({:?})", mode));
                }
                _ => {}
            },

            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                state.surface_config.width = size.width;
                state.surface_config.height = size.height;
                state.surface.configure(&state.device, &state.surface_config);
                state.scene = SceneTargets::new(&state.device, &state.queue, size.width, size.height);
            }

            WindowEvent::RedrawRequested => {
                state.render();
                state.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl AppState {
    fn render(&mut self) {
        let t = self.start.elapsed().as_secs_f32();
        let pulse = |speed: f32| (t * speed).sin() * 0.5 + 0.5;

        // The application stands in for volume blending and writes the
        // frame's parameters directly.
        let mut params = ParameterStack::new();
        if self.fade_on {
            params.set(
                FadeSettings::new()
                    .with_color(glam::Vec4::new(0.05, 0.02, 0.1, 1.0))
                    .with_progress(pulse(0.6) * 0.8),
            );
        }
        if self.blur_on {
            params.set(BlurSettings::new().with_max_radius(24).with_progress(pulse(0.9)));
        }

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                return;
            }
        };
        let surface_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Veil Frame"),
        });
        encoder.copy_texture_to_texture(
            self.scene.pattern.as_image_copy(),
            self.scene.color.as_image_copy(),
            wgpu::Extent3d {
                width: self.scene.width,
                height: self.scene.height,
                depth_or_array_layers: 1,
            },
        );

        let view = ViewDescriptor::new(self.scene.width, self.scene.height, SCENE_FORMAT);
        let mut frame = self
            .backend
            .begin_frame(&self.shaders, &mut encoder, &self.scene.color_view, SCENE_FORMAT);

        let report = self.stack.render_frame(&params, &view, &self.shaders, &mut frame);
        log::trace!("Frame {}: ran {:?}, {} blits", report.frame, report.executed, report.blits);
        for (name, error) in &report.failed {
            log::error!("'{}' failed: {}", name, error);
        }

        if let Err(e) = frame.present(ResourceHandle::CAMERA_COLOR, &surface_view, self.surface_config.format) {
            log::error!("Present error: {:?}", e);
        }
        frame.finish();

        self.queue.submit(Some(encoder.finish()));
        output.present();
    }

    fn shutdown(&mut self) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Veil Shutdown"),
        });
        let mut frame = self
            .backend
            .begin_frame(&self.shaders, &mut encoder, &self.scene.color_view, SCENE_FORMAT);
        self.stack.dispose(&mut frame);
        frame.finish();
    }
}
