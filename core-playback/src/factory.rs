//! # Backend Factories
//!
//! The orchestrator never constructs decoders or render surfaces itself. It
//! asks a [`DecoderFactory`] / [`RenderFactory`] when it needs a new binding,
//! so the concrete engine is a host decision and can be swapped between
//! sources with `set_decoder_factory`.
//!
//! Closures can be used directly through [`decoder_factory_fn`] and
//! [`render_factory_fn`]:
//!
//! ```ignore
//! let decoders = decoder_factory_fn(|ctx: &RuntimeContext| {
//!     Ok(NativeDecoder::new(ctx.prefer_hardware_decoding))
//! });
//! ```

use bridge_traits::context::RuntimeContext;
use bridge_traits::decoder::DecoderBackend;
use bridge_traits::render::RenderSurface;
use std::fmt;

use crate::error::Result;

/// Produces decoder backends.
pub trait DecoderFactory {
    type Backend: DecoderBackend + 'static;

    /// Create a fresh, unbound backend.
    ///
    /// Failures should be reported as [`PlaybackError::BackendCreation`](crate::PlaybackError::BackendCreation).
    fn create(&self, context: &RuntimeContext) -> Result<Self::Backend>;
}

/// Produces render surfaces.
pub trait RenderFactory {
    type Surface: RenderSurface + 'static;

    fn create(&self, context: &RuntimeContext) -> Result<Self::Surface>;
}

/// [`DecoderFactory`] backed by a closure.
pub struct FnDecoderFactory<F> {
    create: F,
}

/// [`RenderFactory`] backed by a closure.
pub struct FnRenderFactory<F> {
    create: F,
}

pub fn decoder_factory_fn<F, B>(create: F) -> FnDecoderFactory<F>
where
    F: Fn(&RuntimeContext) -> Result<B>,
    B: DecoderBackend + 'static,
{
    FnDecoderFactory { create }
}

pub fn render_factory_fn<F, S>(create: F) -> FnRenderFactory<F>
where
    F: Fn(&RuntimeContext) -> Result<S>,
    S: RenderSurface + 'static,
{
    FnRenderFactory { create }
}

impl<F, B> DecoderFactory for FnDecoderFactory<F>
where
    F: Fn(&RuntimeContext) -> Result<B>,
    B: DecoderBackend + 'static,
{
    type Backend = B;

    fn create(&self, context: &RuntimeContext) -> Result<B> {
        (self.create)(context)
    }
}

impl<F, S> RenderFactory for FnRenderFactory<F>
where
    F: Fn(&RuntimeContext) -> Result<S>,
    S: RenderSurface + 'static,
{
    type Surface = S;

    fn create(&self, context: &RuntimeContext) -> Result<S> {
        (self.create)(context)
    }
}

impl<F> fmt::Debug for FnDecoderFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnDecoderFactory")
    }
}

impl<F> fmt::Debug for FnRenderFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnRenderFactory")
    }
}

/// Type-erased decoder factory, for hosts that pick the engine at runtime.
pub type BoxedDecoderFactory =
    FnDecoderFactory<Box<dyn Fn(&RuntimeContext) -> Result<Box<dyn DecoderBackend>>>>;

/// Type-erased render factory.
pub type BoxedRenderFactory =
    FnRenderFactory<Box<dyn Fn(&RuntimeContext) -> Result<Box<dyn RenderSurface>>>>;

/// Erase a decoder factory's concrete backend type.
pub fn boxed_decoder_factory<D>(factory: D) -> BoxedDecoderFactory
where
    D: DecoderFactory + 'static,
{
    FnDecoderFactory {
        create: Box::new(move |context: &RuntimeContext| {
            let backend: Box<dyn DecoderBackend> = Box::new(factory.create(context)?);
            Ok(backend)
        }),
    }
}

/// Erase a render factory's concrete surface type.
pub fn boxed_render_factory<R>(factory: R) -> BoxedRenderFactory
where
    R: RenderFactory + 'static,
{
    FnRenderFactory {
        create: Box::new(move |context: &RuntimeContext| {
            let surface: Box<dyn RenderSurface> = Box::new(factory.create(context)?);
            Ok(surface)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;
    use bridge_traits::decoder::{DecoderEventSink, MediaSource, VideoOutput};
    use bridge_traits::error::Result as BridgeResult;
    use std::sync::Arc;

    struct NullDecoder(&'static str);

    impl DecoderBackend for NullDecoder {
        fn name(&self) -> &str {
            self.0
        }
        fn set_event_sink(&mut self, _sink: Option<Arc<dyn DecoderEventSink>>) {}
        fn set_data_source(&mut self, _source: &MediaSource) -> BridgeResult<()> {
            Ok(())
        }
        fn set_video_output(&mut self, _output: Option<VideoOutput>) -> BridgeResult<()> {
            Ok(())
        }
        fn prepare_async(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn start(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn pause(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn stop(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn seek_to(&mut self, _position_ms: u64) -> BridgeResult<()> {
            Ok(())
        }
        fn reset(&mut self) -> BridgeResult<()> {
            Ok(())
        }
        fn release(&mut self) {}
        fn is_playing(&self) -> bool {
            false
        }
        fn current_position(&self) -> u64 {
            0
        }
        fn duration(&self) -> u64 {
            0
        }
        fn buffered_percentage(&self) -> u8 {
            0
        }
        fn set_volume(&mut self, _left: f32, _right: f32) -> BridgeResult<()> {
            Ok(())
        }
        fn set_looping(&mut self, _looping: bool) -> BridgeResult<()> {
            Ok(())
        }
        fn set_speed(&mut self, _speed: f32) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_closure_factory_sees_context() {
        let factory = decoder_factory_fn(|ctx: &RuntimeContext| {
            Ok(NullDecoder(if ctx.prefer_hardware_decoding {
                "hardware"
            } else {
                "software"
            }))
        });

        let context = RuntimeContext::new("test").with_hardware_decoding(true);
        let backend = factory.create(&context).unwrap();
        assert_eq!(backend.name(), "hardware");

        let backend = factory
            .create(&context.with_hardware_decoding(false))
            .unwrap();
        assert_eq!(backend.name(), "software");
    }

    #[test]
    fn test_boxed_factory_erases_backend() {
        let boxed = boxed_decoder_factory(decoder_factory_fn(|_: &RuntimeContext| {
            Ok(NullDecoder("null"))
        }));
        let backend = boxed.create(&RuntimeContext::new("test")).unwrap();
        assert_eq!(backend.name(), "null");
    }

    #[test]
    fn test_factory_failure_propagates() {
        let factory = decoder_factory_fn(|_: &RuntimeContext| -> Result<NullDecoder> {
            Err(PlaybackError::BackendCreation("no codec".into()))
        });
        assert!(matches!(
            factory.create(&RuntimeContext::new("test")),
            Err(PlaybackError::BackendCreation(_))
        ));
    }
}
