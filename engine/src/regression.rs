//! Frame hashing for render regression tests.
//!
//! `CpuRenderer` is integer-exact, so "the same scene renders the same way"
//! can be asserted by comparing SHA-256 digests of the RGBA frames instead of
//! keeping image files around.

use sha2::{Digest, Sha256};

use crate::graphics::{CpuRenderer, Renderer2d};
use crate::surface::{RgbaBufferSurface, SurfaceSize};

pub fn frame_hash(frame: &[u8]) -> String {
    hex::encode(Sha256::digest(frame))
}

/// Renders `f` into a fresh offscreen buffer and returns the frame hash.
pub fn render_hash<F>(width: u32, height: u32, f: F) -> String
where
    F: FnOnce(&mut dyn Renderer2d),
{
    let size = SurfaceSize::new(width, height);
    let mut surface = RgbaBufferSurface::new(size);
    {
        let mut gfx = CpuRenderer::new(surface.frame_mut(), size);
        gfx.begin_frame(size);
        f(&mut gfx);
    }
    frame_hash(surface.frame())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Rect;

    #[test]
    fn identical_draws_hash_identically() {
        let draw = |gfx: &mut dyn Renderer2d| {
            gfx.clear([10, 10, 14, 255]);
            gfx.fill_circle(20, 20, 8, [0, 229, 255, 255]);
            gfx.draw_line(0, 0, 39, 39, [255, 255, 255, 255]);
            gfx.fill_rect(Rect::new(2, 30, 10, 6), [40, 40, 55, 255]);
        };
        assert_eq!(render_hash(40, 40, draw), render_hash(40, 40, draw));
    }

    #[test]
    fn different_draws_hash_differently() {
        let a = render_hash(40, 40, |gfx| gfx.clear([0, 0, 0, 255]));
        let b = render_hash(40, 40, |gfx| gfx.clear([0, 0, 1, 255]));
        assert_ne!(a, b);
    }
}
