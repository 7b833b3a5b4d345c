use crate::shared::raster_image::RasterImage;

/// Normalised 1D Gaussian weights.
///
/// `size` is forced odd. Sigma is `size / 6`, so the kernel spans roughly
/// three standard deviations either side of the centre.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    weights: Vec<f32>,
}

impl GaussianKernel {
    pub fn new(size: usize) -> Self {
        let size = size.max(1) | 1;
        let sigma = size as f64 / 6.0;
        let half = (size / 2) as f64;
        let raw: Vec<f64> = (0..size)
            .map(|i| {
                let d = i as f64 - half;
                (-d * d / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        Self {
            weights: raw.iter().map(|w| (w / sum) as f32).collect(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Horizontal then vertical pass over the whole raster, clamping at edges.
    pub fn apply(&self, raster: &mut RasterImage) {
        let width = raster.width() as usize;
        let height = raster.height() as usize;
        let channels = raster.channels() as usize;
        if self.weights.len() <= 1 || width == 0 || height == 0 {
            return;
        }
        let half = (self.weights.len() / 2) as isize;
        let data = raster.data_mut();
        let mut temp = vec![0.0f32; width * height * channels];

        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (k, &w) in self.weights.iter().enumerate() {
                        let sx = clamp_index(x as isize + k as isize - half, width);
                        acc += data[(y * width + sx) * channels + c] as f32 * w;
                    }
                    temp[(y * width + x) * channels + c] = acc;
                }
            }
        }

        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (k, &w) in self.weights.iter().enumerate() {
                        let sy = clamp_index(y as isize + k as isize - half, height);
                        acc += temp[(sy * width + x) * channels + c] * w;
                    }
                    data[(y * width + x) * channels + c] = acc.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Shrinks by an integer factor, averaging each `factor` x `factor` block.
pub fn downscale(raster: &RasterImage, factor: usize) -> RasterImage {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let channels = raster.channels() as usize;
    let out_w = (width / factor).max(1);
    let out_h = (height / factor).max(1);
    let src = raster.data();
    let mut out = vec![0u8; out_w * out_h * channels];

    for oy in 0..out_h {
        for ox in 0..out_w {
            for c in 0..channels {
                let mut sum = 0u32;
                let mut count = 0u32;
                for sy in (oy * factor)..((oy + 1) * factor).min(height) {
                    for sx in (ox * factor)..((ox + 1) * factor).min(width) {
                        sum += u32::from(src[(sy * width + sx) * channels + c]);
                        count += 1;
                    }
                }
                out[(oy * out_w + ox) * channels + c] = (sum / count.max(1)) as u8;
            }
        }
    }
    RasterImage::new(out, out_w as u32, out_h as u32, raster.channels())
}

/// Bilinear resize back up to `width` x `height`.
pub fn upscale(raster: &RasterImage, width: u32, height: u32) -> RasterImage {
    let src_w = raster.width() as usize;
    let src_h = raster.height() as usize;
    let channels = raster.channels() as usize;
    let (dst_w, dst_h) = (width as usize, height as usize);
    let src = raster.data();
    let mut out = vec![0u8; dst_w * dst_h * channels];

    let step_x = (src_w as f32 - 1.0) / (dst_w as f32 - 1.0).max(1.0);
    let step_y = (src_h as f32 - 1.0) / (dst_h as f32 - 1.0).max(1.0);

    for y in 0..dst_h {
        let fy_src = y as f32 * step_y;
        let y0 = (fy_src.floor() as usize).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = fy_src - y0 as f32;
        for x in 0..dst_w {
            let fx_src = x as f32 * step_x;
            let x0 = (fx_src.floor() as usize).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = fx_src - x0 as f32;
            for c in 0..channels {
                let at = |yy: usize, xx: usize| src[(yy * src_w + xx) * channels + c] as f32;
                let top = at(y0, x0) * (1.0 - fx) + at(y0, x1) * fx;
                let bottom = at(y1, x0) * (1.0 - fx) + at(y1, x1) * fx;
                let v = top * (1.0 - fy) + bottom * fy;
                out[(y * dst_w + x) * channels + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    RasterImage::new(out, width, height, raster.channels())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> RasterImage {
        RasterImage::new(vec![value; (width * height * 3) as usize], width, height, 3)
    }

    #[test]
    fn test_kernel_sums_to_one_and_is_symmetric() {
        let k = GaussianKernel::new(7);
        let sum: f32 = k.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        for i in 0..k.len() / 2 {
            assert!((k.weights[i] - k.weights[k.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_even_size_is_made_odd() {
        assert_eq!(GaussianKernel::new(8).len(), 9);
        assert_eq!(GaussianKernel::new(0).len(), 1);
    }

    #[test]
    fn test_uniform_raster_unchanged() {
        let mut raster = solid(10, 10, 128);
        GaussianKernel::new(5).apply(&mut raster);
        assert!(raster.data().iter().all(|&v| (v as i32 - 128).abs() <= 1));
    }

    #[test]
    fn test_bright_pixel_is_spread() {
        let mut raster = solid(10, 10, 0);
        let centre = (5 * 10 + 5) * 3;
        raster.data_mut()[centre..centre + 3].copy_from_slice(&[255, 255, 255]);

        GaussianKernel::new(5).apply(&mut raster);

        assert!(raster.data()[centre] < 255);
        assert!(raster.data()[(5 * 10 + 6) * 3] > 0);
    }

    #[test]
    fn test_size_one_is_identity() {
        let mut raster = solid(5, 5, 42);
        raster.data_mut()[0] = 7;
        let original = raster.clone();
        GaussianKernel::new(1).apply(&mut raster);
        assert_eq!(raster, original);
    }

    #[test]
    fn test_downscale_upscale_keeps_flat_field() {
        let raster = solid(8, 8, 100);
        let small = downscale(&raster, 2);
        assert_eq!(small.dimensions(), (4, 4));
        let big = upscale(&small, 8, 8);
        assert_eq!(big.dimensions(), (8, 8));
        assert!(big.data().iter().all(|&v| (v as i32 - 100).abs() <= 1));
    }

    #[test]
    fn test_upscale_to_odd_size() {
        let small = solid(3, 3, 50);
        assert_eq!(upscale(&small, 7, 5).dimensions(), (7, 5));
    }
}
