use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

pub trait AppLoop: Sized {
    fn init(window: Arc<Window>) -> Result<Self>;

    fn draw(&mut self) -> Result<()>;

    fn resized(&mut self, _size: PhysicalSize<u32>) -> Result<()> {
        Ok(())
    }
}

pub struct App {
    title: String,
    frame_rate: f32,
    window_size: (u32, u32),
}

impl App {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_framerate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window_size.0 == 0 || self.window_size.1 == 0 {
            return Err(anyhow!("Window size must be non-zero."));
        }
        Ok(())
    }

    fn frame_period(&self) -> Duration {
        if self.frame_rate > 0.0 {
            Duration::from_secs_f32(1.0 / self.frame_rate)
        } else {
            Duration::ZERO
        }
    }

    /// Opens the window and drives `T` until the window is closed or `T` fails.
    pub fn run<T: AppLoop + 'static>(self) -> Result<()> {
        self.validate()?;
        let event_loop = EventLoop::new()?;
        let mut runner = Runner::<T> {
            frame_period: self.frame_period(),
            app: self,
            window: None,
            app_loop: None,
            last_frame: Instant::now(),
            error: None,
        };
        event_loop.run_app(&mut runner)?;

        match runner.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Runner<T> {
    app: App,
    frame_period: Duration,
    window: Option<Arc<Window>>,
    app_loop: Option<T>,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl<T: AppLoop> Runner<T> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (width, height) = self.app.window_size;
        let attributes = Window::default_attributes()
            .with_title(self.app.title.clone())
            .with_inner_size(LogicalSize::new(width, height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        self.app_loop = Some(T::init(window.clone())?);
        self.window = Some(window);
        Ok(())
    }
}

impl<T: AppLoop> ApplicationHandler for Runner<T> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.open(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(app_loop) = self.app_loop.as_mut() else {
            return;
        };
        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => {
                log::debug!("resized {:?}", size);
                app_loop.resized(size)
            }
            WindowEvent::RedrawRequested => app_loop.draw(),
            _ => Ok(()),
        };
        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if self.last_frame.elapsed() >= self.frame_period {
            self.last_frame = Instant::now();
            window.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.last_frame + self.frame_period));
    }
}

pub fn make_window() -> App {
    let _ = env_logger::try_init();

    App {
        title: "ascii text".into(),
        frame_rate: 60.0,
        window_size: (800, 600),
    }
}
