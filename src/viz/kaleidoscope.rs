//! Kaleidoscope tile generation and per-frame transforms.
//!
//! The pipeline per frame: rotate the base tile about its center
//! (bounding box unchanged), zoom and crop back to the base size,
//! mirror into four-fold symmetry, then shift colors with wraparound.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use rand::Rng;

use crate::params::{RenderConfig, VisualMapping};
use crate::viz::spectrum::BandEnergies;

/// Per-frame visual parameters derived from the band energies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParams {
    pub rotation_degrees: f32,
    pub scale: f32,
    pub color: [u8; 3],
}

impl VisualParams {
    /// Apply the band mapping: mid drives rotation, low drives scale,
    /// and the color channels are (high, mid, low).
    pub fn derive(bands: &BandEnergies, mapping: &VisualMapping) -> Self {
        let depth = mapping.color_depth;
        Self {
            rotation_degrees: bands.mid * mapping.mid_to_rotation_degrees,
            scale: 1.0 + bands.low * mapping.low_to_scale,
            color: [
                (bands.high * depth).clamp(0.0, 255.0) as u8,
                (bands.mid * depth).clamp(0.0, 255.0) as u8,
                (bands.low * depth).clamp(0.0, 255.0) as u8,
            ],
        }
    }
}

/// The base square pattern a visualization run transforms each frame.
pub struct Kaleidoscope {
    base: RgbImage,
}

impl Kaleidoscope {
    /// Uniform random RGB noise, generated once per run.
    pub fn new<R: Rng>(size: u32, rng: &mut R) -> Self {
        let mut base = RgbImage::new(size, size);
        for pixel in base.pixels_mut() {
            *pixel = Rgb([rng.random(), rng.random(), rng.random()]);
        }
        Self { base }
    }

    /// Base tile edge length in pixels.
    pub fn size(&self) -> u32 {
        self.base.width()
    }

    /// One frame's mirrored, color-shifted tile (twice the base size per
    /// axis).
    pub fn frame(&self, params: &VisualParams) -> RgbImage {
        let rotated = rotate_keep_bounds(&self.base, params.rotation_degrees);
        let scaled = zoom_crop(&rotated, params.scale);
        let mirrored = mirror_four(&scaled);
        color_shift(mirrored, params.color)
    }
}

/// Rotate about the image center without changing the bounding box.
/// Destination pixels that map outside the source are filled black.
pub fn rotate_keep_bounds(img: &RgbImage, degrees: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = RgbImage::new(w, h);
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    for y in 0..h {
        for x in 0..w {
            // Inverse mapping: rotate the destination coordinate back
            // into source space, then sample bilinearly.
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = cx + dx * cos + dy * sin;
            let sy = cy - dx * sin + dy * cos;
            out.put_pixel(x, y, sample_bilinear(img, sx, sy));
        }
    }
    out
}

/// Zoom by `factor` (bilinear) and crop back to the original size from
/// the top-left corner. Factors below 1 are clamped to 1 so the crop
/// never needs padding.
pub fn zoom_crop(img: &RgbImage, factor: f32) -> RgbImage {
    let factor = factor.max(1.0);
    let (w, h) = img.dimensions();
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(
                x,
                y,
                sample_bilinear(img, x as f32 / factor, y as f32 / factor),
            );
        }
    }
    out
}

fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > (w - 1) as f32 || y > (h - 1) as f32 {
        return Rgb([0, 0, 0]);
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let p00 = img.get_pixel(x0, y0)[c] as f32;
        let p10 = img.get_pixel(x1, y0)[c] as f32;
        let p01 = img.get_pixel(x0, y1)[c] as f32;
        let p11 = img.get_pixel(x1, y1)[c] as f32;
        let top = p00 + (p10 - p00) * fx;
        let bottom = p01 + (p11 - p01) * fx;
        *slot = (top + (bottom - top) * fy).round() as u8;
    }
    Rgb(out)
}

/// Concatenate with the horizontal mirror, then with the vertical mirror
/// of that: a tile four times the area with point symmetry about its
/// center.
pub fn mirror_four(img: &RgbImage) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = RgbImage::new(w * 2, h * 2);
    let flipped_h = imageops::flip_horizontal(img);
    let flipped_v = imageops::flip_vertical(img);
    let flipped_both = imageops::flip_vertical(&flipped_h);
    imageops::replace(&mut out, img, 0, 0);
    imageops::replace(&mut out, &flipped_h, w as i64, 0);
    imageops::replace(&mut out, &flipped_v, 0, h as i64);
    imageops::replace(&mut out, &flipped_both, w as i64, h as i64);
    out
}

/// Additive color shift with wraparound: each channel advances modulo
/// 255, producing cyclic rather than saturating color drift.
pub fn color_shift(mut img: RgbImage, shift: [u8; 3]) -> RgbImage {
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            pixel[c] = ((pixel[c] as u16 + shift[c] as u16) % 255) as u8;
        }
    }
    img
}

/// Radii of the concentric ring overlays: one ring per `spacing` step
/// across the base tile, grown by the mid-band energy.
pub fn ring_radii(tile_size: u32, spacing: u32, mid: f32) -> Vec<u32> {
    (0..tile_size)
        .step_by(spacing.max(1) as usize)
        .map(|i| (i as f32 * mid) as u32)
        .filter(|&r| r > 0)
        .collect()
}

/// Compose the full canvas: the mirrored tile scaled to the window with
/// the ring overlays drawn on top, centered.
pub fn compose_canvas(
    tile: &RgbImage,
    rings: &[u32],
    ring_color: [u8; 3],
    render: &RenderConfig,
) -> RgbaImage {
    let (w, h) = (render.window_width, render.window_height);
    let scaled = imageops::resize(tile, w, h, FilterType::Triangle);
    let mut canvas = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));
    for (x, y, pixel) in scaled.enumerate_pixels() {
        canvas.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], 255]));
    }
    let color = Rgba([ring_color[0], ring_color[1], ring_color[2], 255]);
    for &radius in rings {
        draw_ring(&mut canvas, (w as i32 / 2, h as i32 / 2), radius as i32, color);
    }
    canvas
}

/// Midpoint circle outline, one pixel wide, clipped to the canvas.
fn draw_ring(canvas: &mut RgbaImage, center: (i32, i32), radius: i32, color: Rgba<u8>) {
    if radius <= 0 {
        return;
    }
    let (cx, cy) = center;
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (cx + x, cy + y),
            (cx - x, cy + y),
            (cx + x, cy - y),
            (cx - x, cy - y),
            (cx + y, cy + x),
            (cx - y, cy + x),
            (cx + y, cy - x),
            (cx - y, cy - x),
        ] {
            if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height()
            {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noise_tile(size: u32, seed: u64) -> RgbImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut img = RgbImage::new(size, size);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([rng.random(), rng.random(), rng.random()]);
        }
        img
    }

    #[test]
    fn base_tile_is_deterministic_per_seed() {
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = Kaleidoscope::new(16, &mut rng_a);
        let b = Kaleidoscope::new(16, &mut rng_b);
        assert_eq!(a.base, b.base);
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = noise_tile(20, 1);
        assert_eq!(rotate_keep_bounds(&img, 0.0), img);
    }

    #[test]
    fn rotation_preserves_bounding_box() {
        let img = noise_tile(20, 2);
        for degrees in [17.0, 90.0, 233.5] {
            let rotated = rotate_keep_bounds(&img, degrees);
            assert_eq!(rotated.dimensions(), img.dimensions());
            assert_ne!(rotated, img);
        }
    }

    #[test]
    fn unit_zoom_is_identity_and_zoom_anchors_top_left() {
        let img = noise_tile(20, 3);
        assert_eq!(zoom_crop(&img, 1.0), img);

        let zoomed = zoom_crop(&img, 2.0);
        assert_eq!(zoomed.dimensions(), img.dimensions());
        assert_eq!(zoomed.get_pixel(0, 0), img.get_pixel(0, 0));
        assert_eq!(zoomed.get_pixel(2, 2), img.get_pixel(1, 1));
    }

    #[test]
    fn mirror_four_doubles_size_with_point_symmetry() {
        let img = noise_tile(9, 4);
        let mirrored = mirror_four(&img);
        let (w, h) = mirrored.dimensions();
        assert_eq!((w, h), (18, 18));
        for y in 0..h {
            for x in 0..w {
                let p = mirrored.get_pixel(x, y);
                assert_eq!(p, mirrored.get_pixel(w - 1 - x, y));
                assert_eq!(p, mirrored.get_pixel(x, h - 1 - y));
                assert_eq!(p, mirrored.get_pixel(w - 1 - x, h - 1 - y));
            }
        }
    }

    #[test]
    fn color_shift_wraps_modulo_255() {
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([250, 100, 255]));
        let shifted = color_shift(img, [10, 0, 0]);
        assert_eq!(shifted.get_pixel(0, 0), &Rgb([5, 100, 0]));
    }

    #[test]
    fn params_derive_from_band_extremes() {
        let mapping = VisualMapping::default();
        let quiet = VisualParams::derive(&BandEnergies::default(), &mapping);
        assert_eq!(quiet.rotation_degrees, 0.0);
        assert_eq!(quiet.scale, 1.0);
        assert_eq!(quiet.color, [0, 0, 0]);

        let loud = VisualParams::derive(
            &BandEnergies {
                low: 1.0,
                mid: 1.0,
                high: 1.0,
            },
            &mapping,
        );
        assert_eq!(loud.rotation_degrees, 360.0);
        assert_eq!(loud.scale, 3.0);
        assert_eq!(loud.color, [255, 255, 255]);
    }

    #[test]
    fn ring_radii_scale_with_mid_energy() {
        assert!(ring_radii(100, 10, 0.0).is_empty());
        let radii = ring_radii(100, 10, 1.0);
        assert_eq!(radii, vec![10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let half = ring_radii(100, 10, 0.5);
        assert_eq!(half, vec![5, 10, 15, 20, 25, 30, 35, 40, 45]);
    }

    #[test]
    fn frame_produces_mirrored_tile_at_twice_the_base_size() {
        let mut rng = StdRng::seed_from_u64(5);
        let kaleidoscope = Kaleidoscope::new(25, &mut rng);
        let params = VisualParams {
            rotation_degrees: 42.0,
            scale: 1.5,
            color: [9, 8, 7],
        };
        let frame = kaleidoscope.frame(&params);
        assert_eq!(frame.dimensions(), (50, 50));
    }

    #[test]
    fn compose_canvas_matches_window_and_draws_rings() {
        let render = RenderConfig {
            window_width: 64,
            window_height: 48,
            target_fps: 60,
        };
        let tile = noise_tile(16, 6);
        let canvas = compose_canvas(&tile, &[10], [255, 0, 0], &render);
        assert_eq!(canvas.dimensions(), (64, 48));
        // Ring pixels carry the ring color; the rightmost point of the
        // radius-10 ring sits at (center.x + 10, center.y).
        assert_eq!(canvas.get_pixel(32 + 10, 24), &Rgba([255, 0, 0, 255]));
    }
}
