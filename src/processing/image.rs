use image::{GrayImage, ImageBuffer};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::horizontal_scharr;

use crate::models::BoundingBox;

/// Grayscale primitives used by the MRZ locator: blur, rectangular
/// morphology, horizontal gradient and Otsu binarization.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Gaussian blur; a sigma that is not positive leaves the image as is.
    pub fn blur(img: &GrayImage, sigma: f32) -> GrayImage {
        if sigma.is_nan() || sigma <= 0.0 {
            return img.clone();
        }
        gaussian_blur_f32(img, sigma)
    }

    /// Grayscale dilation (local max) with a `kw` x `kh` rectangle anchored
    /// at its centre. Pixels outside the image are ignored.
    pub fn dilate_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
        Self::rect_filter(img, kw, kh, u8::max, u8::MIN)
    }

    /// Grayscale erosion (local min), same geometry as `dilate_rect`.
    pub fn erode_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
        Self::rect_filter(img, kw, kh, u8::min, u8::MAX)
    }

    /// Morphological closing: dilate then erode.
    pub fn close_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
        Self::erode_rect(&Self::dilate_rect(img, kw, kh), kw, kh)
    }

    /// Closing minus the original: highlights dark features narrower than
    /// the structuring element on a lighter background.
    pub fn blackhat(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
        let closed = Self::close_rect(img, kw, kh);
        let mut out = GrayImage::new(img.width(), img.height());
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let c = closed.get_pixel(x, y)[0];
            let o = img.get_pixel(x, y)[0];
            pixel[0] = c.saturating_sub(o);
        }
        out
    }

    /// |d/dx| via the Scharr kernel, min-max normalized to 0..=255.
    pub fn horizontal_gradient(img: &GrayImage) -> GrayImage {
        let grad = horizontal_scharr(img);
        let magnitudes: Vec<u16> = grad.pixels().map(|p| p[0].unsigned_abs()).collect();

        let min = magnitudes.iter().copied().min().unwrap_or(0);
        let max = magnitudes.iter().copied().max().unwrap_or(0);
        let range = (max - min) as f32;

        let data: Vec<u8> = magnitudes
            .iter()
            .map(|&m| {
                if range == 0.0 {
                    0
                } else {
                    (((m - min) as f32 / range) * 255.0).round() as u8
                }
            })
            .collect();

        ImageBuffer::from_raw(img.width(), img.height(), data)
            .unwrap_or_else(|| GrayImage::new(img.width(), img.height()))
    }

    /// Binary image (0/255) split at the Otsu level.
    pub fn otsu_binarize(img: &GrayImage) -> GrayImage {
        let level = otsu_level(img);
        threshold(img, level)
    }

    pub fn crop(img: &GrayImage, bbox: &BoundingBox) -> GrayImage {
        image::imageops::crop_imm(img, bbox.x, bbox.y, bbox.w, bbox.h).to_image()
    }

    // Separable: a rectangle max/min is a row pass followed by a column pass.
    fn rect_filter(
        img: &GrayImage,
        kw: u32,
        kh: u32,
        pick: fn(u8, u8) -> u8,
        identity: u8,
    ) -> GrayImage {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return img.clone();
        }
        let (w, h) = (width as usize, height as usize);
        let kw = kw.max(1) as usize;
        let kh = kh.max(1) as usize;

        let mut scratch = RunningExtreme::new(pick, identity);

        let mut rows = vec![0u8; w * h];
        for (src, dst) in img.as_raw().chunks_exact(w).zip(rows.chunks_exact_mut(w)) {
            scratch.apply(src, kw / 2, kw - 1 - kw / 2, dst);
        }

        let mut out = vec![0u8; w * h];
        let mut column = vec![0u8; h];
        let mut filtered = vec![0u8; h];
        for x in 0..w {
            for (y, value) in column.iter_mut().enumerate() {
                *value = rows[y * w + x];
            }
            scratch.apply(&column, kh / 2, kh - 1 - kh / 2, &mut filtered);
            for (y, value) in filtered.iter().enumerate() {
                out[y * w + x] = *value;
            }
        }

        ImageBuffer::from_raw(width, height, out).unwrap_or_else(|| img.clone())
    }
}

/// Sliding-window max/min over one line in O(1) per sample (van Herk /
/// Gil-Werman). The line is padded with `identity` so samples outside it
/// never win, which matches clamping the window to the line.
struct RunningExtreme {
    pick: fn(u8, u8) -> u8,
    identity: u8,
    padded: Vec<u8>,
    forward: Vec<u8>,
    backward: Vec<u8>,
}

impl RunningExtreme {
    fn new(pick: fn(u8, u8) -> u8, identity: u8) -> Self {
        RunningExtreme {
            pick,
            identity,
            padded: Vec::new(),
            forward: Vec::new(),
            backward: Vec::new(),
        }
    }

    /// `out[i]` is the extreme of `line[i - before ..= i + after]`.
    fn apply(&mut self, line: &[u8], before: usize, after: usize, out: &mut [u8]) {
        let k = before + after + 1;
        let len = line.len() + k - 1;
        let pick = self.pick;

        self.padded.clear();
        self.padded.resize(len, self.identity);
        self.padded[before..before + line.len()].copy_from_slice(line);

        // prefix extremes restarting at every block of k, suffix extremes
        // ending at every block boundary
        self.forward.clear();
        self.forward.extend_from_slice(&self.padded);
        for j in 1..len {
            if j % k != 0 {
                self.forward[j] = pick(self.forward[j - 1], self.padded[j]);
            }
        }
        self.backward.clear();
        self.backward.extend_from_slice(&self.padded);
        for j in (0..len - 1).rev() {
            if (j + 1) % k != 0 {
                self.backward[j] = pick(self.backward[j + 1], self.padded[j]);
            }
        }

        for (i, value) in out.iter_mut().enumerate().take(line.len()) {
            *value = pick(self.backward[i], self.forward[i + k - 1]);
        }
    }
}
