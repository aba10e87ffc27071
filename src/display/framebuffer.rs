use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use log::{debug, info};

use super::Display;
use crate::error::{Error, Result};

/// An 8-bit grayscale framebuffer exposed as a file, e.g. `/dev/fb0` on a
/// panel configured for `GRAY8`, or a plain file for inspection.
pub struct Framebuffer {
    path: PathBuf,
    width: usize,
    height: usize,
    file: Option<File>,
}

impl Framebuffer {
    pub fn new(path: impl Into<PathBuf>, width: usize, height: usize) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            file: None,
        }
    }
}

impl Display for Framebuffer {
    fn on(&mut self) -> Result<()> {
        if self.file.is_none() {
            info!("Opening framebuffer {}", self.path.display());
            self.file = Some(
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .open(&self.path)?,
            );
        }
        Ok(())
    }

    fn sleep(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            debug!("Releasing framebuffer {}", self.path.display());
            file.flush()?;
        }
        Ok(())
    }

    fn draw(&mut self, image: impl IntoIterator<Item = u8>) -> Result<()> {
        let frame: Vec<u8> = image.into_iter().collect();
        if frame.len() != self.width * self.height {
            return Err(Error::Display(format!(
                "frame of {} bytes for a {}x{} framebuffer",
                frame.len(),
                self.width,
                self.height
            )));
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Display("framebuffer is not on".to_string()))?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&frame)?;
        file.flush()?;

        Ok(())
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn levels(&self) -> u16 {
        256
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn frames_overwrite_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fb");
        let mut framebuffer = Framebuffer::new(&path, 2, 2);

        framebuffer.on().unwrap();
        framebuffer.draw(vec![0, 255, 10, 20]).unwrap();
        framebuffer.draw(vec![1, 2, 3, 4]).unwrap();
        framebuffer.sleep().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn drawing_needs_on() {
        let dir = tempfile::tempdir().unwrap();
        let mut framebuffer = Framebuffer::new(dir.path().join("fb"), 1, 1);
        assert!(framebuffer.draw(vec![0]).is_err());
    }

    #[test]
    fn dithered_gray_reaches_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fb");
        let mut framebuffer = Framebuffer::new(&path, 2, 1);

        framebuffer.on().unwrap();
        framebuffer
            .draw_dithered(vec![255, 255, 255, 0, 0, 0])
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![255, 0]);
    }
}
