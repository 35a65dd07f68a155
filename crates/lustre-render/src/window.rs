//! Desktop host: a winit window driving one scene

// Format inlining not always clearer
#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;
use std::time::Instant;

use lustre_core::card::Edition;
use lustre_core::interact::{ContainerRect, GyroSupport, HostRequest, InputEvent, OrientationController};
use lustre_core::lifecycle::{SceneHandle, SurfaceSize, TickOutcome};
use lustre_core::tuning::Tuning;
use tracing::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::gpu::{Output, init_with_surface};
use crate::stage::{GpuStage, SceneSource};

/// Configuration for the preview window
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        // Card proportions
        Self {
            width: 500,
            height: 700,
        }
    }
}

fn surface_size(size: PhysicalSize<u32>) -> SurfaceSize {
    SurfaceSize::new(size.width, size.height)
}

fn container(size: PhysicalSize<u32>) -> ContainerRect {
    ContainerRect::new(0.0, 0.0, size.width as f32, size.height as f32)
}

struct PreviewApp {
    config: WindowConfig,
    source: SceneSource,
    tuning: Tuning,
    window: Option<Arc<Window>>,
    scene: Option<SceneHandle<GpuStage>>,
    /// Cursor is over the window
    hovering: bool,
    start_time: Instant,
    instance: wgpu::Instance,
}

impl PreviewApp {
    fn new(config: WindowConfig, source: SceneSource, tuning: Tuning) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        Self {
            config,
            source,
            tuning,
            window: None,
            scene: None,
            hovering: false,
            start_time: Instant::now(),
            instance,
        }
    }

    fn now(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn mount(&self, window: &Arc<Window>) -> lustre_core::Result<SceneHandle<GpuStage>> {
        let size = window.inner_size();
        let surface = self.instance.create_surface(Arc::clone(window)).map_err(crate::RenderError::from)?;

        // Desktop windows have no orientation sensor
        let controller = OrientationController::new(
            self.tuning.interaction,
            GyroSupport::Unavailable,
            container(size),
            self.now(),
        );
        let mut scene = SceneHandle::new(controller, surface_size(size));
        if let SceneSource::Card { edition, .. } = &self.source {
            scene.set_edition(*edition);
        }

        let (instance, source, tuning) = (&self.instance, &self.source, self.tuning);
        pollster::block_on(scene.init(move |_| async move {
            let (gpu, format) = init_with_surface(instance, &surface).await?;
            let output = Output::surface(&gpu.device, surface, format, size.width, size.height);
            source.build(gpu, output, tuning)
        }))?;
        Ok(scene)
    }

    fn input(&mut self, event: InputEvent) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let Some(HostRequest::RequestOrientationPermission) = scene.handle_input(event) {
            debug!("no orientation permission api, reporting denied");
            scene.handle_input(InputEvent::PermissionResult { granted: false });
        }
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        let (x, y) = (position.x as f32, position.y as f32);
        if self.hovering {
            self.input(InputEvent::PointerMove { x, y });
        } else {
            self.hovering = true;
            self.input(InputEvent::PointerEnter { x, y });
        }
    }

    fn touch(&mut self, touch: Touch) {
        let (x, y) = (touch.location.x as f32, touch.location.y as f32);
        let event = match touch.phase {
            TouchPhase::Started => InputEvent::TouchStart { x, y },
            TouchPhase::Moved => InputEvent::TouchMove { x, y },
            TouchPhase::Ended | TouchPhase::Cancelled => InputEvent::TouchEnd,
        };
        self.input(event);
    }

    fn switch_edition(&mut self, edition: Edition) {
        let SceneSource::Card { edition: current, .. } = &mut self.source else {
            return;
        };
        if *current == edition {
            return;
        }
        *current = edition;
        let title = self.source.title();
        if let Some(scene) = self.scene.as_mut() {
            scene.set_edition(edition);
            scene.kick(1.0);
        }
        if let Some(window) = &self.window {
            window.set_title(&title);
        }
        info!(%edition, "edition changed");
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take() {
            scene.dispose();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for PreviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.source.title())
            .with_transparent(true)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match self.mount(&window) {
            Ok(scene) => self.scene = Some(scene),
            Err(e) => {
                error!("Failed to start scene: {}", e);
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(new_size) => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.set_container(container(new_size));
                    scene.resize(surface_size(new_size));
                }
            }
            WindowEvent::RedrawRequested => {
                let now = self.now();
                let Some(scene) = self.scene.as_mut() else {
                    return;
                };
                if scene.tick(now) == TickOutcome::Stopped {
                    self.shutdown(event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(position),
            WindowEvent::CursorLeft { .. } => {
                self.hovering = false;
                self.input(InputEvent::PointerLeave);
            }
            WindowEvent::Touch(touch) => self.touch(touch),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.input(InputEvent::Click),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => self.shutdown(event_loop),
                    Key::Named(NamedKey::Space) => {
                        if let Some(scene) = self.scene.as_mut() {
                            scene.kick(1.0);
                        }
                    }
                    Key::Character(ref c) => match c.as_str() {
                        "1" => self.switch_edition(Edition::Foil),
                        "2" => self.switch_edition(Edition::Holographic),
                        "3" => self.switch_edition(Edition::Polychrome),
                        _ => {}
                    },
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open a window and run `source` until it is closed
pub fn run_preview(config: WindowConfig, source: SceneSource, tuning: Tuning) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PreviewApp::new(config, source, tuning);
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Preview controls help text
pub fn controls_help() -> &'static str {
    r"
Preview Controls:
  Move Mouse   - Tilt towards the cursor
  Touch Drag   - Tilt towards the finger
  Space        - Kick the card
  1 / 2 / 3    - Foil / holographic / polychrome edition
  Escape       - Close preview
"
}
