//! Native context controller.
//!
//! Facade over the rendering engine's setup/teardown entry points. Owns the
//! wgpu surface + configuration built for one host surface, and nothing
//! else. It is driven exclusively by bridge effects; it never observes host
//! events directly, and `initialize`/`teardown` are kept non-reentrant by
//! the bridge's serialized event order rather than by locking.

use std::time::Duration;

use kishar_lifecycle::{BridgeError, PixelFormat, RenderFence, SurfaceDescriptor};
use winit::window::Window;

/// Result of a frame submission attempt.
///
/// `Skipped` is a soft failure: host event races can legitimately deliver a
/// render tick just after teardown, and that must not be fatal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderOutcome {
    Rendered,
    Skipped,
}

/// Owns the live native context, if any.
///
/// The `'w` lifetime ties the wgpu surface to the window it draws into; the
/// runtime keeps both inside one self-referencing binding so the window is
/// guaranteed to outlive the surface.
pub struct ContextController<'w> {
    window: &'w Window,
    context: Option<NativeContext<'w>>,
}

struct NativeContext<'w> {
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

enum FrameResult {
    Rendered,
    Skipped,
    /// The device is gone (OOM or loss); the context must be dropped.
    Lost,
}

impl<'w> ContextController<'w> {
    pub fn new(window: &'w Window) -> Self {
        Self {
            window,
            context: None,
        }
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Builds a surface + swapchain configuration for `desc` using the
    /// loaded module's device.
    pub fn initialize(
        &mut self,
        module: &crate::loader::EngineModule,
        desc: &SurfaceDescriptor,
    ) -> Result<(), BridgeError> {
        if self.context.is_some() {
            // The bridge tears down before re-initializing; reaching this
            // point means an ordering bug upstream.
            log::error!("{}", BridgeError::Sequencing("initialize over a live context"));
            self.context = None;
        }

        let surface = module
            .instance
            .create_surface(self.window)
            .map_err(|e| BridgeError::engine("initialize", e.to_string()))?;

        let caps = surface.get_capabilities(&module.adapter);
        let format = choose_surface_format(&caps.formats, desc.format)
            .ok_or_else(|| BridgeError::engine("initialize", "no supported surface formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.width.max(1),
            height: desc.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&module.device, &config);

        log::info!(
            "context initialized: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );

        self.context = Some(NativeContext {
            surface,
            device: module.device.clone(),
            queue: module.queue.clone(),
            config,
        });
        Ok(())
    }

    /// Reconfigures the swapchain for a new extent.
    ///
    /// wgpu cannot configure a 0x0 surface; a zero dimension leaves the old
    /// configuration in place until a usable extent arrives.
    pub fn resize(&mut self, desc: &SurfaceDescriptor) -> Result<(), BridgeError> {
        let Some(ctx) = self.context.as_mut() else {
            log::error!("{}", BridgeError::Sequencing("resize without a context"));
            return Ok(());
        };

        if desc.width == 0 || desc.height == 0 {
            log::debug!("resize to zero extent deferred");
            return Ok(());
        }

        ctx.config.width = desc.width;
        ctx.config.height = desc.height;
        ctx.surface.configure(&ctx.device, &ctx.config);
        Ok(())
    }

    /// Submits one clear-pass frame under the fence.
    ///
    /// Soft-fails when no context exists or teardown has already closed the
    /// gate. Surface loss is absorbed by reconfiguring; device loss drops
    /// the context and leaves recovery to the next surface event.
    pub fn render(&mut self, fence: &RenderFence, tick: u64, clear: wgpu::Color) -> RenderOutcome {
        let Some(_guard) = fence.begin() else {
            return RenderOutcome::Skipped;
        };

        let result = match self.context.as_mut() {
            None => {
                // Tick raced past teardown; drop it rather than escalate.
                log::debug!("render tick {tick} with no context; skipping");
                return RenderOutcome::Skipped;
            }
            Some(ctx) => ctx.render_frame(self.window, clear),
        };

        match result {
            FrameResult::Rendered => {
                log::trace!("frame {tick} presented");
                RenderOutcome::Rendered
            }
            FrameResult::Skipped => RenderOutcome::Skipped,
            FrameResult::Lost => {
                log::error!("device lost during frame {tick}; dropping context");
                self.context = None;
                RenderOutcome::Skipped
            }
        }
    }

    /// Destroys the context. Never fails outward.
    ///
    /// Acts as the teardown barrier: the fence is closed before the drop so
    /// no new frame can start, and in-flight frames get `wait` to drain.
    /// On timeout the context is torn down anyway; stalling the host past
    /// its watchdog budget is the worse outcome.
    pub fn teardown(&mut self, fence: &RenderFence, wait: Duration) {
        if self.context.is_none() {
            return;
        }

        if !fence.close_and_wait(wait) {
            log::warn!(
                "teardown fence did not drain within {wait:?} ({} in flight); proceeding",
                fence.in_flight()
            );
        }

        self.context = None;
        fence.reopen();
        log::info!("context torn down");
    }
}

impl NativeContext<'_> {
    fn render_frame(&mut self, window: &Window, clear: wgpu::Color) -> FrameResult {
        let frame = match self.surface.get_current_texture() {
            Ok(f) => f,
            Err(err) => return self.absorb_surface_error(err),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kishar frame encoder"),
            });

        // Clear pass — dropped before the encoder is finished.
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kishar clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();

        FrameResult::Rendered
    }

    fn absorb_surface_error(&mut self, err: wgpu::SurfaceError) -> FrameResult {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if self.config.width > 0 && self.config.height > 0 {
                    self.surface.configure(&self.device, &self.config);
                }
                FrameResult::Skipped
            }
            wgpu::SurfaceError::OutOfMemory => FrameResult::Lost,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => FrameResult::Skipped,
        }
    }
}

fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    preference: PixelFormat,
) -> Option<wgpu::TextureFormat> {
    if formats.is_empty() {
        return None;
    }

    let preferred: &[wgpu::TextureFormat] = match preference {
        PixelFormat::Bgra8Srgb => &[
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ],
        PixelFormat::Rgba8Srgb => &[
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ],
        PixelFormat::Unspecified => &[],
    };

    for f in preferred {
        if formats.contains(f) {
            return Some(*f);
        }
    }

    Some(formats[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── format selection ──────────────────────────────────────────────────

    #[test]
    fn prefers_bgra_srgb_when_available() {
        let formats = [
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(
            choose_surface_format(&formats, PixelFormat::Bgra8Srgb),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
    }

    #[test]
    fn falls_back_to_alternate_srgb_format() {
        let formats = [
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureFormat::Rgba8Unorm,
        ];
        assert_eq!(
            choose_surface_format(&formats, PixelFormat::Bgra8Srgb),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
    }

    #[test]
    fn unspecified_preference_takes_first_supported() {
        let formats = [wgpu::TextureFormat::Rgba16Float];
        assert_eq!(
            choose_surface_format(&formats, PixelFormat::Unspecified),
            Some(wgpu::TextureFormat::Rgba16Float)
        );
    }

    #[test]
    fn empty_format_list_is_an_error() {
        assert_eq!(choose_surface_format(&[], PixelFormat::Bgra8Srgb), None);
    }
}
