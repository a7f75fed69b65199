//! Lightweight image views and the binary lane mask.
//!
//! All buffers are row-major without padding. These types only borrow or own
//! raw bytes; decoding and encoding images is left to the caller.

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Interleaved 3-channel view. Channel order is up to the producer: `RGB`
/// for camera frames, `HLS` after [`crate::rgb_to_hls`].
#[derive(Clone, Copy, Debug)]
pub struct ColorImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

impl ColorImageView<'_> {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * self.width + x);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl ColorImage {
    pub fn view(&self) -> ColorImageView<'_> {
        ColorImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Binary lane mask: each pixel is `0` (background) or `1` (lane candidate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl BinaryMask {
    /// All-zero mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Build a mask from a per-pixel predicate `f(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(u8::from(f(x, y)));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing buffer; any non-zero byte counts as set.
    ///
    /// Returns `None` when the buffer length does not match `width * height`.
    pub fn from_raw(width: usize, height: usize, raw: Vec<u8>) -> Option<Self> {
        if width.checked_mul(height)? != raw.len() {
            return None;
        }
        let data = raw.into_iter().map(|v| u8::from(v != 0)).collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = u8::from(on);
        }
    }

    /// Pixel-wise AND.
    ///
    /// # Panics
    /// Panics if the masks differ in size.
    pub fn and(&self, other: &BinaryMask) -> BinaryMask {
        self.zip_with(other, |a, b| a && b)
    }

    /// Pixel-wise OR.
    ///
    /// # Panics
    /// Panics if the masks differ in size.
    pub fn or(&self, other: &BinaryMask) -> BinaryMask {
        self.zip_with(other, |a, b| a || b)
    }

    fn zip_with(&self, other: &BinaryMask, op: impl Fn(bool, bool) -> bool) -> BinaryMask {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "mask size mismatch"
        );
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| u8::from(op(a != 0, b != 0)))
            .collect();
        BinaryMask {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Coordinates `(x, y)` of all set pixels in row-major order.
    pub fn nonzero_points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(move |(i, _)| (i % w, i / w))
    }
}
