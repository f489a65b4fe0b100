use winit::dpi::PhysicalSize;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = *caps.formats.first()?;
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| caps.formats.contains(f)) {
            return Some(f);
        }
    }
    Some(first)
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Surface configuration extent; wgpu rejects zero-sized surfaces.
#[inline]
pub(crate) fn surface_extent(size: PhysicalSize<u32>) -> (u32, u32) {
    (size.width.max(1), size.height.max(1))
}

/// Maps a surface error to an action, and whether the surface should be
/// reconfigured first. Reconfiguring a zero-sized surface is skipped.
pub(crate) fn classify_surface_error(
    err: &wgpu::SurfaceError,
    size: PhysicalSize<u32>,
) -> (SurfaceErrorAction, bool) {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            (SurfaceErrorAction::Reconfigured, size.width > 0 && size.height > 0)
        }
        wgpu::SurfaceError::OutOfMemory => (SurfaceErrorAction::Fatal, false),
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => (SurfaceErrorAction::SkipFrame, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities { formats, ..Default::default() }
    }

    #[test]
    fn prefers_srgb_when_available() {
        let c = caps(vec![wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Bgra8UnormSrgb]);
        assert_eq!(choose_surface_format(&c, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&c, false), Some(wgpu::TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn no_formats_is_none() {
        assert_eq!(choose_surface_format(&caps(Vec::new()), true), None);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let c = caps(Vec::new());
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Auto
        );
    }

    #[test]
    fn lost_surface_reconfigures_unless_zero_sized() {
        let err = wgpu::SurfaceError::Lost;
        assert_eq!(
            classify_surface_error(&err, PhysicalSize::new(640, 480)),
            (SurfaceErrorAction::Reconfigured, true)
        );
        assert_eq!(
            classify_surface_error(&err, PhysicalSize::new(0, 480)),
            (SurfaceErrorAction::Reconfigured, false)
        );
    }

    #[test]
    fn zero_sized_window_configures_one_pixel() {
        assert_eq!(surface_extent(PhysicalSize::new(0, 0)), (1, 1));
        assert_eq!(surface_extent(PhysicalSize::new(640, 0)), (640, 1));
        assert_eq!(surface_extent(PhysicalSize::new(800, 600)), (800, 600));
    }

    #[test]
    fn out_of_memory_is_fatal() {
        let (action, _) = classify_surface_error(&wgpu::SurfaceError::OutOfMemory, PhysicalSize::new(1, 1));
        assert_eq!(action, SurfaceErrorAction::Fatal);
    }
}
