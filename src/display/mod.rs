use dither::ditherer::Dither;

use crate::error::{Error, Result};
#[cfg(feature = "cairo")]
use crate::view::Dashboard;

pub mod framebuffer;

pub use framebuffer::Framebuffer;

/// A grayscale output device.
pub trait Display {
    /// Initialize the display.
    fn on(&mut self) -> Result<()>;

    /// Put the display in low-power mode, releasing whatever `on` acquired.
    fn sleep(&mut self) -> Result<()>;

    /// Draw an image on the display. The image is represented as bytes in the range
    /// `0..self.levels()`, with 0 being black, so the input should have length
    /// `display_width * display_height`.
    fn draw(&mut self, image: impl IntoIterator<Item = u8>) -> Result<()>;

    /// Get the dimensions of the display in pixels (width, height).
    fn dimensions(&self) -> (usize, usize);

    /// Number of gray levels the display can show. Used for dithering.
    fn levels(&self) -> u16;

    /// Draw an RGB image dithered down to the available levels. The input should
    /// have length `display_width * display_height * 3`.
    fn draw_dithered(&mut self, image: impl IntoIterator<Item = u8>) -> Result<()> {
        let (width, height) = self.dimensions();
        let levels = self.levels();

        let rgb: Vec<u8> = image.into_iter().collect();
        if rgb.len() != width * height * 3 {
            return Err(Error::Display(format!(
                "expected {}x{} RGB pixels, got {} bytes",
                width,
                height,
                rgb.len()
            )));
        }

        let luma = rgb.chunks_exact(3).map(|pixel| {
            dither::color::RGB(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64)
                .to_chroma_corrected_black_and_white()
        });

        if levels >= 256 {
            return self.draw(luma.map(|value| value.round().max(0.).min(255.) as u8));
        }

        let quantize = dither::create_quantize_n_bits_func(bits_for(levels)?)
            .map_err(|err| Error::Display(format!("quantizer: {:?}", err)))?;
        let image = dither::prelude::Img::new(luma, width as u32)
            .ok_or_else(|| Error::Display("empty image".to_string()))?;
        let dithered = dither::ditherer::FLOYD_STEINBERG.dither(image, quantize);

        let scale = (levels - 1) as f64;
        self.draw(
            dithered
                .iter()
                .map(|x| (x / 255. * scale).round().max(0.).min(scale) as u8),
        )
    }

    /// Render `dashboard` to an off-screen bitmap and push it out dithered.
    #[cfg(feature = "cairo")]
    fn draw_dashboard(&mut self, dashboard: &Dashboard) -> Result<()> {
        use piet::RenderContext;

        let (width, height) = self.dimensions();
        let mut device = piet_common::Device::new()?;
        let mut bitmap_target = device.bitmap_target(width, height, 1.)?;

        {
            let mut render_context = bitmap_target.render_context();
            crate::render::render(&mut render_context, dashboard)?;
            render_context.finish()?;
        }

        let image = bitmap_target.to_image_buf(piet_common::ImageFormat::RgbaPremul)?;
        let rgb: Vec<u8> = image
            .raw_pixels()
            .chunks_exact(4)
            .flat_map(|pixel| pixel[..3].iter().copied())
            .collect();

        self.draw_dithered(rgb)
    }
}

/// Bits per pixel for a power-of-two level count below 256.
fn bits_for(levels: u16) -> Result<u8> {
    if levels.is_power_of_two() && (2..256).contains(&levels) {
        Ok(levels.trailing_zeros() as u8)
    } else {
        Err(Error::Display(format!("unsupported level count {}", levels)))
    }
}
