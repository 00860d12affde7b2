#![forbid(unsafe_code)]

//! Packed RGBA color with compositing and HSV construction.

/// A compact RGBA color.
///
/// - **Size:** 4 bytes.
/// - **Layout:** `0xRRGGBBAA` (R in bits 31..24, A in bits 7..0).
///
/// Straight alpha storage. Terminals cannot blend, so translucent colors are
/// resolved against the background with [`Rgba::over`] before they reach a
/// cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct Rgba(pub u32);

impl Rgba {
    /// Fully transparent (alpha = 0).
    pub const TRANSPARENT: Self = Self(0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create an opaque RGB color (alpha = 255).
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Create an RGBA color with explicit alpha.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    /// Opaque color from a `(r, g, b)` tuple.
    #[inline]
    pub const fn from_tuple((r, g, b): (u8, u8, u8)) -> Self {
        Self::rgb(r, g, b)
    }

    /// Opaque color from hue in degrees and saturation/value in `[0, 1]`.
    ///
    /// Hue wraps, so `-30.0` and `330.0` are the same color.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_u8 = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(to_u8(r), to_u8(g), to_u8(b))
    }

    /// Red channel.
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Alpha channel.
    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// Same color with alpha replaced.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r(), self.g(), self.b(), a)
    }

    #[inline]
    const fn div_round_u8(numer: u64, denom: u64) -> u8 {
        debug_assert!(denom != 0);
        let v = (numer + (denom / 2)) / denom;
        if v > 255 { 255 } else { v as u8 }
    }

    /// Porter-Duff SourceOver: `src over dst`.
    ///
    /// Computes the exact rational form and rounds once at the end.
    #[inline]
    pub fn over(self, dst: Self) -> Self {
        let s_a = self.a() as u64;
        if s_a == 255 {
            return self;
        }
        if s_a == 0 {
            return dst;
        }

        let d_a = dst.a() as u64;
        let inv_s_a = 255 - s_a;

        // numer_a = 255*s_a + d_a*(255 - s_a), in the 255^2 domain.
        let numer_a = 255 * s_a + d_a * inv_s_a;
        if numer_a == 0 {
            return Self::TRANSPARENT;
        }
        let out_a = Self::div_round_u8(numer_a, 255);

        let channel = |s: u8, d: u8| {
            Self::div_round_u8((s as u64) * s_a * 255 + (d as u64) * d_a * inv_s_a, numer_a)
        };
        Self::rgba(
            channel(self.r(), dst.r()),
            channel(self.g(), dst.g()),
            channel(self.b(), dst.b()),
            out_a,
        )
    }

    /// Apply uniform opacity in `[0.0, 1.0]` by scaling alpha.
    #[inline]
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        let a = ((self.a() as f32) * opacity).round().clamp(0.0, 255.0) as u8;
        self.with_alpha(a)
    }

    /// Scale RGB toward black by `factor` in `[0.0, 1.0]`. Alpha is kept.
    #[inline]
    pub fn dimmed(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        let scale = |c: u8| ((c as f32) * f).round() as u8;
        Self::rgba(scale(self.r()), scale(self.g()), scale(self.b()), self.a())
    }

    /// Perceived brightness, 0..=255.
    #[inline]
    pub fn luma(self) -> u8 {
        ((299 * self.r() as u32 + 587 * self.g() as u32 + 114 * self.b() as u32) / 1000) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::Rgba;

    fn reference_over(src: Rgba, dst: Rgba) -> Rgba {
        let sa = src.a() as f64 / 255.0;
        let da = dst.a() as f64 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        let c = |s: u8, d: u8| {
            let v = (s as f64 / 255.0 * sa + d as f64 / 255.0 * da * (1.0 - sa)) / out_a;
            (v * 255.0).round() as u8
        };
        Rgba::rgba(
            c(src.r(), dst.r()),
            c(src.g(), dst.g()),
            c(src.b(), dst.b()),
            (out_a * 255.0).round() as u8,
        )
    }

    #[test]
    fn channels_round_trip() {
        let c = Rgba::rgba(1, 2, 3, 4);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (1, 2, 3, 4));
        assert_eq!(c.0, 0x0102_0304);
    }

    #[test]
    fn over_extremes() {
        let red = Rgba::rgb(255, 0, 0);
        assert_eq!(red.over(Rgba::BLACK), red);
        assert_eq!(Rgba::TRANSPARENT.over(red), red);
    }

    #[test]
    fn over_matches_float_reference() {
        for &(src, dst) in &[
            (Rgba::rgba(255, 0, 0, 128), Rgba::BLACK),
            (Rgba::rgba(0, 200, 100, 50), Rgba::rgb(10, 20, 30)),
            (Rgba::rgba(120, 200, 255, 200), Rgba::rgba(0, 0, 0, 0)),
        ] {
            let got = src.over(dst);
            let want = reference_over(src, dst);
            for (g, w) in [
                (got.r(), want.r()),
                (got.g(), want.g()),
                (got.b(), want.b()),
                (got.a(), want.a()),
            ] {
                assert!(g.abs_diff(w) <= 1, "{got:?} vs {want:?}");
            }
        }
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(Rgba::from_hsv(0.0, 1.0, 1.0), Rgba::rgb(255, 0, 0));
        assert_eq!(Rgba::from_hsv(120.0, 1.0, 1.0), Rgba::rgb(0, 255, 0));
        assert_eq!(Rgba::from_hsv(240.0, 1.0, 1.0), Rgba::rgb(0, 0, 255));
        assert_eq!(Rgba::from_hsv(360.0, 1.0, 1.0), Rgba::rgb(255, 0, 0));
        assert_eq!(Rgba::from_hsv(-120.0, 1.0, 1.0), Rgba::rgb(0, 0, 255));
    }

    #[test]
    fn hsv_gray_and_black() {
        assert_eq!(Rgba::from_hsv(77.0, 0.0, 1.0), Rgba::WHITE);
        assert_eq!(Rgba::from_hsv(77.0, 1.0, 0.0), Rgba::BLACK);
    }

    #[test]
    fn opacity_and_dim() {
        assert_eq!(Rgba::WHITE.with_opacity(0.5).a(), 128);
        assert_eq!(Rgba::WHITE.with_opacity(2.0).a(), 255);
        assert_eq!(Rgba::rgb(200, 100, 50).dimmed(0.5), Rgba::rgb(100, 50, 25));
    }

    #[test]
    fn luma_orders_brightness() {
        assert!(Rgba::WHITE.luma() > Rgba::rgb(0, 128, 0).luma());
        assert_eq!(Rgba::BLACK.luma(), 0);
    }
}
