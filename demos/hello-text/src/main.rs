use std::{path::Path, sync::Arc};

use anyhow::Result;
use ascii_text::{
    config::TextConfig,
    pipeline::{ProgramBuilder, TEXT_SHADER},
    render::Render,
    text::renderer::{init_renderer, TextRenderer},
    window::{make_window, AppLoop},
};
use wgpu::Color;
use winit::{dpi::PhysicalSize, window::Window};

const CONFIG_PATH: &str = "text.toml";

struct HelloText {
    render: Render,
    text: Option<TextRenderer>,
    frames: u64,
}

impl AppLoop for HelloText {
    fn init(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let mut render = Render::new(window)?;
        let program = ProgramBuilder::new()
            .with_shader(TEXT_SHADER)
            .build(&mut render)?;

        let config = if Path::new(CONFIG_PATH).exists() {
            TextConfig::load(CONFIG_PATH)?
        } else {
            log::info!("{} not found, using defaults", CONFIG_PATH);
            TextConfig::default()
        };

        let text = init_renderer(
            &mut render,
            program,
            &config,
            size.width.max(1) as f32,
            size.height.max(1) as f32,
        )?;

        Ok(Self {
            render,
            text: Some(text),
            frames: 0,
        })
    }

    fn draw(&mut self) -> Result<()> {
        let Some(text) = self.text.as_mut() else {
            return Ok(());
        };
        self.render.begin_frame(Color {
            r: 0.2,
            g: 0.3,
            b: 0.3,
            a: 1.0,
        })?;

        let frames = self.frames;
        let render = &mut self.render;
        let drawn = (|| -> Result<()> {
            text.render(render, "This is sample text", 25.0, 25.0, 1.0, [0.5, 0.8, 0.2])?;
            text.render(
                render,
                &format!("frame {}", frames),
                540.0,
                570.0,
                0.5,
                [0.3, 0.7, 0.9],
            )?;
            Ok(())
        })();
        // ended on both paths; an open frame blocks begin_frame
        self.render.end_frame();
        drawn?;

        self.frames += 1;
        Ok(())
    }

    fn resized(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        // minimized
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.render.resize(size);
        if let Some(text) = self.text.as_mut() {
            text.update_size(&mut self.render, size.width as f32, size.height as f32)?;
        }
        Ok(())
    }
}

impl Drop for HelloText {
    fn drop(&mut self) {
        if let Some(text) = self.text.take() {
            text.destroy(&mut self.render);
        }
    }
}

fn main() -> Result<()> {
    make_window()
        .with_title("hello text")
        .with_window_size(800, 600)
        .run::<HelloText>()
}
