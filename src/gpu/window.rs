use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, error};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Fullscreen, Window, WindowId},
};

use crate::events::InputEvent;
use crate::platform::DisplayMode;

#[derive(Debug, Clone, Copy)]
pub(crate) struct WindowRequest {
    pub mode: DisplayMode,
    pub fullscreen: bool,
}

/// Application handler driven by `pump_app_events`.
///
/// Window creation has to happen inside a handler callback, so requests are
/// parked here and served on the next resume or idle tick.
#[derive(Default)]
pub(crate) struct WindowPump {
    pub monitor: Option<DisplayMode>,
    pub request: Option<WindowRequest>,
    pub created: Option<Result<Arc<Window>, String>>,
    pub events: VecDeque<InputEvent>,
    /// Set once the event loop reports exit; it must not be pumped again.
    pub exited: bool,
}

impl WindowPump {
    /// Queues a single `Quit` for the first exit report and ignores the rest.
    pub fn mark_exited(&mut self) {
        if !self.exited {
            self.exited = true;
            self.events.push_back(InputEvent::Quit);
        }
    }

    fn service(&mut self, event_loop: &ActiveEventLoop) {
        if self.monitor.is_none() {
            self.monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .map(|monitor| {
                    let size = monitor.size();
                    DisplayMode {
                        width: size.width,
                        height: size.height,
                    }
                });
            if let Some(mode) = self.monitor {
                debug!(display = %mode, "monitor detected");
            }
        }

        if let Some(request) = self.request.take() {
            self.created = Some(open_window(event_loop, request));
        }
    }
}

fn open_window(event_loop: &ActiveEventLoop, request: WindowRequest) -> Result<Arc<Window>, String> {
    let attrs = Window::default_attributes()
        .with_title("Photo Splash")
        .with_inner_size(PhysicalSize::new(request.mode.width, request.mode.height))
        .with_decorations(!request.fullscreen)
        .with_fullscreen(request.fullscreen.then_some(Fullscreen::Borderless(None)));
    match event_loop.create_window(attrs) {
        Ok(window) => {
            window.set_cursor_visible(false);
            Ok(Arc::new(window))
        }
        Err(err) => {
            error!(error = %err, "failed to create splash window");
            Err(err.to_string())
        }
    }
}

impl ApplicationHandler for WindowPump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.service(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.service(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let input = match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => InputEvent::Quit,
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                InputEvent::KeyDown
            }
            WindowEvent::RedrawRequested => return,
            _ => InputEvent::Other,
        };
        self.events.push_back(input);
    }
}
