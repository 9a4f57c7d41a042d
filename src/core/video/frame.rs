use crate::core::video::error::VideoError;

/// One captured video frame, RGBA.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, VideoError> {
        if width == 0 || height == 0 {
            return Err(VideoError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(VideoError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Nearest-neighbour scaling keeps hard bar edges intact.
    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Result<Frame, VideoError> {
        if target_width == 0 || target_height == 0 {
            return Err(VideoError::InvalidDimensions {
                width: target_width,
                height: target_height,
            });
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            VideoError::BufferSize {
                expected: self.pixel_count() * 4,
                actual: self.data.len(),
            },
        )?;
        let resized = image::imageops::resize(
            &img,
            target_width,
            target_height,
            image::imageops::FilterType::Nearest,
        );

        Ok(Frame {
            width: target_width,
            height: target_height,
            data: resized.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4];
        let frame = Frame::new(100, 100, data).unwrap();

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.pixel(99, 99), [255, 255, 255, 255]);
    }

    #[test]
    fn test_frame_rejects_bad_buffers() {
        assert!(matches!(
            Frame::new(0, 10, Vec::new()),
            Err(VideoError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Frame::new(10, 10, vec![0u8; 399]),
            Err(VideoError::BufferSize { expected: 400, actual: 399 })
        ));
    }

    #[test]
    fn test_frame_resize_keeps_hard_edges() {
        // top half black, bottom half white
        let mut data = vec![0u8; 100 * 100 * 4];
        for px in data[100 * 50 * 4..].iter_mut() {
            *px = 255;
        }
        let frame = Frame::new(100, 100, data).unwrap();
        let resized = frame.resize_to(32, 32).unwrap();

        assert_eq!(resized.width, 32);
        assert_eq!(resized.height, 32);
        assert_eq!(resized.data.len(), 32 * 32 * 4);
        assert_eq!(resized.pixel(10, 0), [0, 0, 0, 0]);
        assert_eq!(resized.pixel(10, 31), [255, 255, 255, 255]);
        assert!(frame.resize_to(0, 32).is_err());
    }
}
