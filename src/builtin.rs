//! Stock kernels over premultiplied-agnostic RGBA8 elements (4 bytes per element).
//!
//! Elements narrower than [`RGBA8_BYTES`] are skipped; bytes past the fourth are left untouched.

use crate::kernel::{ElementArgs, Kernel, KernelSignature, kernel_fn};

/// Bytes per RGBA8 element.
pub const RGBA8_BYTES: usize = 4;

/// `out = 255 - in` on colour channels, alpha copied.
pub fn invert_rgba8() -> impl Kernel + Send + 'static {
    kernel_fn(|args: ElementArgs<'_>| {
        let (Some(i), Some(o)) = (pixel(args.input), pixel_mut(args.output)) else {
            return;
        };
        o[0] = 255 - i[0];
        o[1] = 255 - i[1];
        o[2] = 255 - i[2];
        o[3] = i[3];
    })
    .with_signature(KernelSignature::IN | KernelSignature::OUT)
}

/// Integer BT.601 luma written to all colour channels, alpha copied.
pub fn grayscale_rgba8() -> impl Kernel + Send + 'static {
    kernel_fn(|args: ElementArgs<'_>| {
        let (Some(i), Some(o)) = (pixel(args.input), pixel_mut(args.output)) else {
            return;
        };
        let l = luma(i[0], i[1], i[2]);
        o[0] = l;
        o[1] = l;
        o[2] = l;
        o[3] = i[3];
    })
    .with_signature(KernelSignature::IN | KernelSignature::OUT)
}

/// Scale colour channels by an `f32` gain read from the user bytes (see [`gain_params`]).
///
/// Missing or short user bytes mean a gain of 1.0.
pub fn gain_rgba8() -> impl Kernel + Send + 'static {
    kernel_fn(|args: ElementArgs<'_>| {
        let (Some(i), Some(o)) = (pixel(args.input), pixel_mut(args.output)) else {
            return;
        };
        let gain = read_gain(args.user);
        for (dst, &src) in o[..3].iter_mut().zip(&i[..3]) {
            *dst = (f32::from(src) * gain).round().clamp(0.0, 255.0) as u8;
        }
        o[3] = i[3];
    })
    .with_signature(KernelSignature::IN | KernelSignature::OUT | KernelSignature::USER_DATA)
}

/// User bytes for [`gain_rgba8`].
pub fn gain_params(gain: f32) -> [u8; 4] {
    gain.to_le_bytes()
}

/// Output-only gradient: red follows X, green follows Y over a `width` x `height` canvas.
pub fn gradient_rgba8(width: u32, height: u32) -> impl Kernel + Send + 'static {
    let sx = width.saturating_sub(1).max(1);
    let sy = height.saturating_sub(1).max(1);
    kernel_fn(move |args: ElementArgs<'_>| {
        let Some(o) = pixel_mut(args.output) else {
            return;
        };
        o[0] = (args.coord.x.min(sx) * 255 / sx) as u8;
        o[1] = (args.coord.y.min(sy) * 255 / sy) as u8;
        o[2] = 128;
        o[3] = 255;
    })
    .with_signature(KernelSignature::OUT | KernelSignature::X | KernelSignature::Y)
}

fn pixel(bytes: Option<&[u8]>) -> Option<&[u8; RGBA8_BYTES]> {
    bytes?.first_chunk()
}

fn pixel_mut(bytes: Option<&mut [u8]>) -> Option<&mut [u8; RGBA8_BYTES]> {
    bytes?.first_chunk_mut()
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b) + 128) >> 8) as u8
}

fn read_gain(user: &[u8]) -> f32 {
    match user.first_chunk::<4>() {
        Some(bytes) => f32::from_le_bytes(*bytes),
        None => 1.0,
    }
}

#[cfg(test)]
#[path = "../tests/unit/builtin.rs"]
mod tests;
