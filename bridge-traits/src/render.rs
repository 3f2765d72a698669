//! Render Surface Abstractions
//!
//! A render surface is the pixel presentation primitive (texture view, GL
//! surface, compositor layer). It owns exactly one node in the host view tree,
//! see [`RenderSurface::view`]; the display coordinator moves that node between
//! containers when the screen mode changes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::decoder::DecoderBackend;
use crate::display::ViewId;
use crate::error::Result;
use crate::platform::PlatformSend;

/// How decoded frames are fitted into the surface bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatioMode {
    /// Keep the video's own aspect ratio, letterboxed.
    #[default]
    Default,
    Ratio16x9,
    Ratio4x3,
    Ratio18x9,
    /// Stretch to the surface bounds.
    MatchParent,
    /// Native pixel size, centered.
    Original,
    /// Fill the bounds, cropping the overflow.
    CenterCrop,
}

impl AspectRatioMode {
    /// Width/height ratio forced by the mode, if it forces one.
    pub fn fixed_ratio(&self) -> Option<f32> {
        match self {
            AspectRatioMode::Ratio16x9 => Some(16.0 / 9.0),
            AspectRatioMode::Ratio4x3 => Some(4.0 / 3.0),
            AspectRatioMode::Ratio18x9 => Some(2.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8888,
    Rgb565,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgb565 => 2,
        }
    }
}

/// A captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl Screenshot {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// `true` when the buffer holds exactly `width * height` pixels.
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Render surface contract.
pub trait RenderSurface: PlatformSend {
    fn name(&self) -> &str;

    /// The surface's node in the host view tree.
    fn view(&self) -> ViewId;

    /// Route a backend's video output to this surface, or detach it with `None`.
    ///
    /// Implementations call [`DecoderBackend::set_video_output`] on the backend
    /// they are given.
    fn bind_backend(&mut self, backend: Option<&mut dyn DecoderBackend>) -> Result<()>;

    fn set_video_size(&mut self, width: u32, height: u32);

    fn set_rotation(&mut self, degrees: u16);

    fn set_aspect_ratio_mode(&mut self, mode: AspectRatioMode);

    fn set_mirror(&mut self, mirrored: bool);

    /// Capture the current frame. `high_quality` trades speed for a full
    /// colour-depth copy. `None` when nothing has been rendered.
    fn screenshot(&self, high_quality: bool) -> Option<Screenshot>;

    fn release(&mut self);
}

impl<T: RenderSurface + ?Sized> RenderSurface for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn view(&self) -> ViewId {
        (**self).view()
    }

    fn bind_backend(&mut self, backend: Option<&mut dyn DecoderBackend>) -> Result<()> {
        (**self).bind_backend(backend)
    }

    fn set_video_size(&mut self, width: u32, height: u32) {
        (**self).set_video_size(width, height)
    }

    fn set_rotation(&mut self, degrees: u16) {
        (**self).set_rotation(degrees)
    }

    fn set_aspect_ratio_mode(&mut self, mode: AspectRatioMode) {
        (**self).set_aspect_ratio_mode(mode)
    }

    fn set_mirror(&mut self, mirrored: bool) {
        (**self).set_mirror(mirrored)
    }

    fn screenshot(&self, high_quality: bool) -> Option<Screenshot> {
        (**self).screenshot(high_quality)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ratio() {
        assert_eq!(AspectRatioMode::Ratio18x9.fixed_ratio(), Some(2.0));
        assert!(AspectRatioMode::Default.fixed_ratio().is_none());
        assert!(AspectRatioMode::CenterCrop.fixed_ratio().is_none());
        assert_eq!(AspectRatioMode::default(), AspectRatioMode::Default);
    }

    #[test]
    fn test_screenshot_completeness() {
        let full = Screenshot::new(2, 2, PixelFormat::Rgb565, vec![0u8; 8]);
        assert!(full.is_complete());

        let short = Screenshot::new(2, 2, PixelFormat::Rgba8888, vec![0u8; 8]);
        assert!(!short.is_complete());
    }
}
