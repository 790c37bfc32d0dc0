//! Window and event pump driving the frame loop

use std::sync::Arc;
use std::time::Instant;
use stlview_core::{DragButton, FrameDriver, InputTracker, KeyAction, Mesh, ViewerConfig, Viewport};
use tracing::{error, info};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use crate::error::{ViewerError, ViewerResult};
use crate::renderer::WgpuBackend;

/// Pixel scroll deltas (touchpads) are converted to wheel lines at this rate
const PIXELS_PER_LINE: f64 = 40.0;

/// Keyboard binding for a physical key
pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Escape => Some(KeyAction::Close),
        KeyCode::KeyN => Some(KeyAction::ToggleShading),
        KeyCode::KeyR => Some(KeyAction::ToggleSpin),
        _ => None,
    }
}

/// Vertical scroll amount in wheel lines; positive is away from the user
pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
    }
}

/// Main application struct for the windowed viewer
pub struct ViewerApp {
    window: Arc<Window>,
    driver: FrameDriver<WgpuBackend>,
    input: InputTracker,
    started: Instant,
    fatal: Option<ViewerError>,
}

impl ViewerApp {
    /// Open a window showing `mesh` and block until it is closed
    pub fn run(mesh: Mesh, config: &ViewerConfig) -> ViewerResult<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let window = Arc::new(
            WindowBuilder::new()
                .with_title(config.title.as_str())
                .with_inner_size(PhysicalSize::new(config.window_width, config.window_height))
                .build(&event_loop)?,
        );

        let backend = pollster::block_on(WgpuBackend::new(Arc::clone(&window), config))?;
        let driver = FrameDriver::new(mesh, config, backend)?;
        info!("Controls: left drag = orbit, right drag = pan, wheel = zoom, N = normals, R = spin, Esc = quit");

        let mut app = Self {
            window,
            driver,
            input: InputTracker::new(),
            started: Instant::now(),
            fatal: None,
        };

        event_loop.run(|event, elwt| app.handle_event(event, elwt))?;

        match app.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn handle_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                self.handle_window_event(event, elwt);
            }
            Event::AboutToWait => {
                if self.input.close_requested() {
                    elwt.exit();
                } else {
                    self.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => self.input.request_close(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(action) = key_action(code) {
                    self.input.key_pressed(action);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.input.button(DragButton::Left, pressed),
                    MouseButton::Right => self.input.button(DragButton::Right, pressed),
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(position.x as f32, position.y as f32);
            }

            WindowEvent::MouseWheel { delta, .. } => self.input.scrolled(scroll_lines(delta)),

            WindowEvent::RedrawRequested => self.redraw(elwt),

            _ => {}
        }
    }

    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if self.fatal.is_some() {
            return;
        }

        let size = self.window.inner_size();
        let snapshot = self.input.begin_frame();
        let time = self.started.elapsed().as_secs_f32();

        if let Err(err) = self
            .driver
            .frame(Viewport::new(size.width, size.height), &snapshot, time)
        {
            error!(%err, "frame failed");
            self.fatal = Some(err);
            elwt.exit();
        }
    }
}
