/// Opaque handle to a host-owned drawable surface.
///
/// The bridge never dereferences this; it only compares tokens to decide
/// whether two descriptors refer to the same underlying surface. The runtime
/// layer maps tokens back to real window handles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SurfaceToken(pub u64);

impl From<u64> for SurfaceToken {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Pixel-format preference carried by a surface descriptor.
///
/// This is a preference, not a guarantee: the context controller picks the
/// closest supported swapchain format at initialize time.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelFormat {
    /// 8-bit BGRA, sRGB-encoded. The common UI default.
    Bgra8Srgb,
    /// 8-bit RGBA, sRGB-encoded.
    Rgba8Srgb,
    /// Host did not express a preference.
    Unspecified,
}

/// Snapshot of a host surface at the moment an event was delivered.
///
/// A descriptor is only valid between the surface event that produced it and
/// the next surface-destroyed event; the bridge drops it at that boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceDescriptor {
    pub token: SurfaceToken,
    /// Drawable width in physical pixels.
    pub width: u32,
    /// Drawable height in physical pixels.
    pub height: u32,
    pub format: PixelFormat,
}

impl SurfaceDescriptor {
    pub fn new(token: impl Into<SurfaceToken>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            token: token.into(),
            width,
            height,
            format,
        }
    }

    /// True when both descriptors describe the same surface at the same
    /// extent and format. Drives the resize-dedup rule.
    pub fn same_geometry(&self, other: &SurfaceDescriptor) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(w: u32, h: u32) -> SurfaceDescriptor {
        SurfaceDescriptor::new(1u64, w, h, PixelFormat::Bgra8Srgb)
    }

    #[test]
    fn same_geometry_is_full_equality() {
        assert!(d(100, 200).same_geometry(&d(100, 200)));
        assert!(!d(100, 200).same_geometry(&d(100, 201)));
    }

    #[test]
    fn different_token_is_a_different_surface() {
        let a = SurfaceDescriptor::new(1u64, 10, 10, PixelFormat::Unspecified);
        let b = SurfaceDescriptor::new(2u64, 10, 10, PixelFormat::Unspecified);
        assert!(!a.same_geometry(&b));
    }
}
