//! Decoder Backend Abstractions
//!
//! The decoder backend is the engine that demuxes and decodes media. The core
//! never decodes anything itself; it drives a backend through
//! [`DecoderBackend`] and learns about progress through [`DecoderEvent`]s the
//! backend posts into a [`DecoderEventSink`].
//!
//! ## Threading Model
//!
//! Control methods on [`DecoderBackend`] are called from the control thread
//! only. Backends usually decode on internal threads; whatever they need to
//! report goes through the sink, which is `Send + Sync` and never blocks. The
//! core marshals those events back onto the control thread before acting on
//! them, so a backend may post from any thread at any time, including after
//! it has been released.
//!
//! ## Lifecycle
//!
//! ```text
//! set_data_source -> prepare_async ~~> Prepared -> start <-> pause
//!                                                     \-> seek_to
//! reset (back to before set_data_source)   release (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::platform::{PlatformSend, PlatformSendSync};

/// Unspecified decoder failure.
pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
/// The decoder process or service went away.
pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;
/// File or network related failure.
pub const MEDIA_ERROR_IO: i32 = -1004;
/// Bitstream does not conform to the container/codec specification.
pub const MEDIA_ERROR_MALFORMED: i32 = -1007;
/// Container or codec is not supported by the backend.
pub const MEDIA_ERROR_UNSUPPORTED: i32 = -1010;
/// Operation timed out.
pub const MEDIA_ERROR_TIMED_OUT: i32 = -110;

/// A media location plus the request headers needed to fetch it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub uri: String,
    pub headers: HashMap<String, String>,
}

impl MediaSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// `true` for network sources (as opposed to local files or assets).
    pub fn is_remote(&self) -> bool {
        let lower = self.uri.to_ascii_lowercase();
        ["http://", "https://", "rtmp://", "rtsp://"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
    }
}

// Headers routinely carry credentials, so only their names are printed.
impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.headers.keys().collect();
        names.sort();
        f.debug_struct("MediaSource")
            .field("uri", &self.uri)
            .field("headers", &names)
            .finish()
    }
}

/// Opaque handle to a video output a render surface hands to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoOutput(pub u64);

/// Asynchronous notifications raised by a decoder backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoderEvent {
    /// `prepare_async` finished; duration and tracks are known.
    Prepared,
    /// Decoding failed. Codes are opaque diagnostics.
    Error { what: i32, extra: i32 },
    /// Playback reached the end of the media.
    Completion,
    /// Playback stalled waiting for data.
    BufferingStart,
    /// Enough data is buffered to continue.
    BufferingEnd,
    /// Percentage of the media that is buffered.
    BufferingUpdate(u8),
    VideoSizeChanged { width: u32, height: u32 },
    /// Rotation metadata of the video stream, in degrees.
    RotationChanged(u16),
    /// The first frame was presented.
    RenderingStart,
}

/// Where a backend posts its callbacks.
///
/// `post` must be cheap and non-blocking; implementations queue the event for
/// the control thread.
pub trait DecoderEventSink: PlatformSendSync {
    fn post(&self, event: DecoderEvent);
}

/// Decoder engine contract.
///
/// Methods returning `Result` fail synchronously only when the request could
/// not even be issued. Failures discovered while decoding are reported through
/// [`DecoderEvent::Error`] instead.
pub trait DecoderBackend: PlatformSend {
    /// Short engine name, e.g. `"exo"` or `"ffmpeg"`.
    fn name(&self) -> &str;

    /// Install (or clear) the sink callbacks are posted into.
    fn set_event_sink(&mut self, sink: Option<Arc<dyn DecoderEventSink>>);

    fn set_data_source(&mut self, source: &MediaSource) -> Result<()>;

    /// Attach the backend to a render surface's video output.
    fn set_video_output(&mut self, output: Option<VideoOutput>) -> Result<()>;

    /// Begin preparing. Completion is signalled with [`DecoderEvent::Prepared`].
    fn prepare_async(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn seek_to(&mut self, position_ms: u64) -> Result<()>;

    /// Return to the state before `set_data_source` so the instance can be reused.
    fn reset(&mut self) -> Result<()>;

    /// Free engine resources. The instance is unusable afterwards.
    fn release(&mut self);

    fn is_playing(&self) -> bool;

    fn current_position(&self) -> u64;

    /// Media duration in milliseconds, `0` while unknown.
    fn duration(&self) -> u64;

    fn buffered_percentage(&self) -> u8;

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    fn set_looping(&mut self, looping: bool) -> Result<()>;

    fn set_speed(&mut self, speed: f32) -> Result<()>;

    fn speed(&self) -> f32 {
        1.0
    }
}

impl<T: DecoderBackend + ?Sized> DecoderBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set_event_sink(&mut self, sink: Option<Arc<dyn DecoderEventSink>>) {
        (**self).set_event_sink(sink)
    }

    fn set_data_source(&mut self, source: &MediaSource) -> Result<()> {
        (**self).set_data_source(source)
    }

    fn set_video_output(&mut self, output: Option<VideoOutput>) -> Result<()> {
        (**self).set_video_output(output)
    }

    fn prepare_async(&mut self) -> Result<()> {
        (**self).prepare_async()
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        (**self).seek_to(position_ms)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn current_position(&self) -> u64 {
        (**self).current_position()
    }

    fn duration(&self) -> u64 {
        (**self).duration()
    }

    fn buffered_percentage(&self) -> u8 {
        (**self).buffered_percentage()
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        (**self).set_volume(left, right)
    }

    fn set_looping(&mut self, looping: bool) -> Result<()> {
        (**self).set_looping(looping)
    }

    fn set_speed(&mut self, speed: f32) -> Result<()> {
        (**self).set_speed(speed)
    }

    fn speed(&self) -> f32 {
        (**self).speed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_media_source_builder() {
        let mut extra = HashMap::new();
        extra.insert("Referer".to_string(), "https://example.com".to_string());

        let source = MediaSource::new("https://cdn.example.com/a.m3u8")
            .with_header("Authorization", "Bearer secret")
            .with_headers(extra);

        assert_eq!(source.headers.len(), 2);
        assert!(source.is_remote());
        assert!(!MediaSource::new("/sdcard/a.mp4").is_remote());
        assert!(MediaSource::new("RTSP://camera/stream").is_remote());
    }

    #[test]
    fn test_media_source_debug_hides_header_values() {
        let source = MediaSource::new("a.mp4").with_header("Authorization", "Bearer secret");
        let printed = format!("{:?}", source);

        assert!(printed.contains("Authorization"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_event_sink_is_object_safe() {
        #[derive(Default)]
        struct Collect(Mutex<Vec<DecoderEvent>>);

        impl DecoderEventSink for Collect {
            fn post(&self, event: DecoderEvent) {
                self.0.lock().unwrap().push(event);
            }
        }

        let collect = Arc::new(Collect::default());
        let sink: Arc<dyn DecoderEventSink> = collect.clone();
        sink.post(DecoderEvent::Prepared);
        sink.post(DecoderEvent::Error {
            what: MEDIA_ERROR_IO,
            extra: 0,
        });

        assert_eq!(
            *collect.0.lock().unwrap(),
            vec![
                DecoderEvent::Prepared,
                DecoderEvent::Error {
                    what: MEDIA_ERROR_IO,
                    extra: 0
                }
            ]
        );
    }
}
