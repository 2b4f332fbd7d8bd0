use crate::error::FrameError;
use image::{DynamicImage, RgbImage};
use std::time::Duration;
use uuid::Uuid;

/// Kind of media track a pipeline is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Video,
    Audio,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Pixel storage borrowed from the video pipeline. Only valid for the
/// duration of the frame-delivery call.
#[derive(Debug, Clone, Copy)]
pub enum PixelBuffer<'a> {
    I420 {
        y: &'a [u8],
        u: &'a [u8],
        v: &'a [u8],
        stride_y: usize,
        stride_u: usize,
        stride_v: usize,
    },
    Rgb8 {
        data: &'a [u8],
        stride: usize,
    },
    Rgba8 {
        data: &'a [u8],
        stride: usize,
    },
}

/// A frame as delivered by the producer.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation needed to display the frame upright.
    pub rotation: u32,
    /// Monotonic capture time.
    pub timestamp: Duration,
    pub buffer: PixelBuffer<'a>,
}

impl<'a> VideoFrame<'a> {
    pub fn new(width: u32, height: u32, timestamp: Duration, buffer: PixelBuffer<'a>) -> Self {
        Self {
            width,
            height,
            rotation: 0,
            timestamp,
            buffer,
        }
    }

    pub fn with_rotation(mut self, rotation: u32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn rotated_dimensions(&self) -> (u32, u32) {
        if self.rotation % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Owned, upright copy of an admitted frame, safe to hand to the worker.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub id: Uuid,
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
    pub image: DynamicImage,
}

impl FrameSnapshot {
    /// Copies the borrowed buffer out synchronously and applies the rotation.
    pub fn capture(frame: &VideoFrame<'_>) -> Result<Self, FrameError> {
        let (width, height) = (frame.width, frame.height);
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        if !matches!(frame.rotation, 0 | 90 | 180 | 270) {
            return Err(FrameError::InvalidRotation(frame.rotation));
        }

        let rgb = match frame.buffer {
            PixelBuffer::I420 {
                y,
                u,
                v,
                stride_y,
                stride_u,
                stride_v,
            } => i420_to_rgb(width, height, (y, stride_y), (u, stride_u), (v, stride_v))?,
            PixelBuffer::Rgb8 { data, stride } => packed_to_rgb(width, height, data, stride, 3)?,
            PixelBuffer::Rgba8 { data, stride } => packed_to_rgb(width, height, data, stride, 4)?,
        };

        let image = match frame.rotation {
            90 => DynamicImage::ImageRgb8(rgb).rotate90(),
            180 => DynamicImage::ImageRgb8(rgb).rotate180(),
            270 => DynamicImage::ImageRgb8(rgb).rotate270(),
            _ => DynamicImage::ImageRgb8(rgb),
        };
        let (width, height) = frame.rotated_dimensions();

        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: frame.timestamp,
            width,
            height,
            image,
        })
    }
}

fn required_len(stride: usize, row_bytes: usize, rows: usize) -> usize {
    stride * rows.saturating_sub(1) + row_bytes
}

fn check_plane(
    plane: &'static str,
    data: &[u8],
    stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<(), FrameError> {
    let expected = required_len(stride.max(row_bytes), row_bytes, rows);
    if data.len() < expected {
        return Err(FrameError::BufferTooSmall {
            plane,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn packed_to_rgb(
    width: u32,
    height: u32,
    data: &[u8],
    stride: usize,
    channels: usize,
) -> Result<RgbImage, FrameError> {
    let (w, h) = (width as usize, height as usize);
    let stride = stride.max(w * channels);
    check_plane("packed", data, stride, w * channels, h)?;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let line = &data[row * stride..row * stride + w * channels];
        for px in line.chunks_exact(channels) {
            pixels.extend_from_slice(&px[..3]);
        }
    }
    RgbImage::from_raw(width, height, pixels).ok_or(FrameError::InvalidDimensions { width, height })
}

// BT.601 limited-range conversion, integer arithmetic.
fn i420_to_rgb(
    width: u32,
    height: u32,
    (y, stride_y): (&[u8], usize),
    (u, stride_u): (&[u8], usize),
    (v, stride_v): (&[u8], usize),
) -> Result<RgbImage, FrameError> {
    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
    let stride_y = stride_y.max(w);
    let stride_u = stride_u.max(cw);
    let stride_v = stride_v.max(cw);
    check_plane("Y", y, stride_y, w, h)?;
    check_plane("U", u, stride_u, cw, ch)?;
    check_plane("V", v, stride_v, cw, ch)?;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        for col in 0..w {
            let luma = y[row * stride_y + col] as i32 - 16;
            let cb = u[(row / 2) * stride_u + col / 2] as i32 - 128;
            let cr = v[(row / 2) * stride_v + col / 2] as i32 - 128;
            let c = 298 * luma;
            let r = (c + 409 * cr + 128) >> 8;
            let g = (c - 100 * cb - 208 * cr + 128) >> 8;
            let b = (c + 516 * cb + 128) >> 8;
            pixels.push(r.clamp(0, 255) as u8);
            pixels.push(g.clamp(0, 255) as u8);
            pixels.push(b.clamp(0, 255) as u8);
        }
    }
    RgbImage::from_raw(width, height, pixels).ok_or(FrameError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn capture_copies_rgba_and_drops_alpha() {
        let data: Vec<u8> = vec![10, 20, 30, 255, 40, 50, 60, 255];
        let frame = VideoFrame::new(
            2,
            1,
            Duration::from_millis(5),
            PixelBuffer::Rgba8 {
                data: &data,
                stride: 8,
            },
        );
        let snapshot = FrameSnapshot::capture(&frame).unwrap();
        let rgb = snapshot.image.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(rgb.get_pixel(1, 0).0, [40, 50, 60]);
        assert_eq!(snapshot.timestamp, Duration::from_millis(5));
    }

    #[test]
    fn capture_applies_rotation_to_dimensions() {
        let data = vec![0u8; 4 * 2 * 3];
        let frame = VideoFrame::new(
            4,
            2,
            Duration::ZERO,
            PixelBuffer::Rgb8 {
                data: &data,
                stride: 12,
            },
        )
        .with_rotation(90);
        let snapshot = FrameSnapshot::capture(&frame).unwrap();
        assert_eq!((snapshot.width, snapshot.height), (2, 4));
        assert_eq!(snapshot.image.dimensions(), (2, 4));
    }

    #[test]
    fn i420_grey_converts_to_neutral_rgb() {
        let y = vec![126u8; 4 * 4];
        let u = vec![128u8; 2 * 2];
        let v = vec![128u8; 2 * 2];
        let frame = VideoFrame::new(
            4,
            4,
            Duration::ZERO,
            PixelBuffer::I420 {
                y: &y,
                u: &u,
                v: &v,
                stride_y: 4,
                stride_u: 2,
                stride_v: 2,
            },
        );
        let snapshot = FrameSnapshot::capture(&frame).unwrap();
        let [r, g, b] = snapshot.image.to_rgb8().get_pixel(3, 3).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn short_buffers_and_bad_rotation_are_rejected() {
        let data = vec![0u8; 5];
        let frame = VideoFrame::new(
            2,
            2,
            Duration::ZERO,
            PixelBuffer::Rgb8 {
                data: &data,
                stride: 6,
            },
        );
        assert!(matches!(
            FrameSnapshot::capture(&frame),
            Err(FrameError::BufferTooSmall { plane: "packed", .. })
        ));

        let data = vec![0u8; 12];
        let frame = VideoFrame::new(
            2,
            2,
            Duration::ZERO,
            PixelBuffer::Rgb8 {
                data: &data,
                stride: 6,
            },
        )
        .with_rotation(45);
        assert_eq!(
            FrameSnapshot::capture(&frame).unwrap_err(),
            FrameError::InvalidRotation(45)
        );
    }
}
