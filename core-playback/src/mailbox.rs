//! # Control-Thread Mailbox
//!
//! Everything that reaches the orchestrator from outside the control thread
//! goes through one unbounded `tokio::sync::mpsc` channel:
//!
//! - decoder callbacks, posted by [`BackendSink`] from the backend's threads
//! - [`PlayerCommand`]s, sent by control components through a [`PlayerHandle`]
//! - audio focus changes, reported by the host through [`FocusListener`]
//!
//! The orchestrator drains the channel on the control thread, so the state
//! machine, display coordinator and hub are only ever touched from there.
//!
//! ## Liveness
//!
//! Each backend binding gets a generation number and its sink stamps every
//! event with it. Releasing or replacing the binding advances the generation,
//! and envelopes stamped with an older one are dropped when processed, so a
//! callback that was in flight during `release()` cannot resurrect state.
//!
//! ## Coalescing
//!
//! A `BufferingStart` immediately followed by a `BufferingEnd` from the same
//! binding within one drained batch cancels out.

use bridge_traits::audio::{AudioFocusChange, AudioFocusListener};
use bridge_traits::decoder::{DecoderEvent, DecoderEventSink};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Requests a control component can make of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    Start,
    Pause,
    TogglePlay,
    SeekTo(i64),
    Replay { reset_position: bool },
    RequestFullScreen { reversed: bool },
    RequestTinyScreen,
    RequestNormal,
    ToggleFullScreen,
    SetLocked(bool),
    ToggleLock,
    ShowControls,
    HideControls,
    ToggleControls,
    SetMute(bool),
    SetSpeed(f32),
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Envelope {
    Decoder { generation: u64, event: DecoderEvent },
    Command(PlayerCommand),
    AudioFocus(AudioFocusChange),
}

/// Cloneable, thread-safe handle for sending commands to an orchestrator.
///
/// Commands are queued and executed the next time the orchestrator drains
/// its mailbox, never re-entrantly from inside a notification.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: UnboundedSender<Envelope>,
}

impl PlayerHandle {
    /// Queue a command. Returns `false` if the orchestrator is gone.
    pub fn send(&self, command: PlayerCommand) -> bool {
        self.tx.send(Envelope::Command(command)).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(PlayerCommand::Start)
    }

    pub fn pause(&self) -> bool {
        self.send(PlayerCommand::Pause)
    }

    pub fn toggle_play(&self) -> bool {
        self.send(PlayerCommand::TogglePlay)
    }

    pub fn seek_to(&self, position_ms: i64) -> bool {
        self.send(PlayerCommand::SeekTo(position_ms))
    }

    pub fn toggle_full_screen(&self) -> bool {
        self.send(PlayerCommand::ToggleFullScreen)
    }

    pub fn toggle_lock(&self) -> bool {
        self.send(PlayerCommand::ToggleLock)
    }

    pub fn toggle_controls(&self) -> bool {
        self.send(PlayerCommand::ToggleControls)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sink handed to a backend; stamps events with the binding's generation.
#[derive(Debug)]
pub(crate) struct BackendSink {
    generation: u64,
    tx: UnboundedSender<Envelope>,
}

impl DecoderEventSink for BackendSink {
    fn post(&self, event: DecoderEvent) {
        // The receiver only disappears with the orchestrator.
        let _ = self.tx.send(Envelope::Decoder {
            generation: self.generation,
            event,
        });
    }
}

/// Listener handed to the audio focus host. Focus belongs to the player,
/// not to a binding, so changes carry no generation.
#[derive(Debug)]
pub(crate) struct FocusListener {
    tx: UnboundedSender<Envelope>,
}

impl AudioFocusListener for FocusListener {
    fn on_focus_change(&self, change: AudioFocusChange) {
        let _ = self.tx.send(Envelope::AudioFocus(change));
    }
}

#[derive(Debug)]
pub(crate) struct Mailbox {
    tx: UnboundedSender<Envelope>,
    rx: UnboundedReceiver<Envelope>,
    generation: u64,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, generation: 0 }
    }

    pub(crate) fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Start a new binding generation and return the sink for it.
    pub(crate) fn bind(&mut self) -> (u64, Arc<dyn DecoderEventSink>) {
        self.generation += 1;
        let sink: Arc<dyn DecoderEventSink> = Arc::new(BackendSink {
            generation: self.generation,
            tx: self.tx.clone(),
        });
        (self.generation, sink)
    }

    pub(crate) fn focus_listener(&self) -> Arc<dyn AudioFocusListener> {
        Arc::new(FocusListener {
            tx: self.tx.clone(),
        })
    }

    /// Invalidate the current generation without starting a new binding.
    pub(crate) fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Everything queued right now.
    pub(crate) fn drain(&mut self) -> Vec<Envelope> {
        let mut batch = Vec::new();
        self.collect_into(&mut batch);
        coalesce(batch)
    }

    /// Wait for at least one envelope, then drain the rest.
    pub(crate) async fn next_batch(&mut self) -> Vec<Envelope> {
        // `self.tx` keeps the channel open, so `recv` only yields `Some`.
        let Some(first) = self.rx.recv().await else {
            return Vec::new();
        };
        let mut batch = vec![first];
        self.collect_into(&mut batch);
        coalesce(batch)
    }

    fn collect_into(&mut self, batch: &mut Vec<Envelope>) {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => batch.push(envelope),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

/// Drop adjacent `BufferingStart`/`BufferingEnd` pairs of the same generation.
fn coalesce(batch: Vec<Envelope>) -> Vec<Envelope> {
    let mut out: Vec<Envelope> = Vec::with_capacity(batch.len());
    for envelope in batch {
        if let Envelope::Decoder {
            generation,
            event: DecoderEvent::BufferingEnd,
        } = envelope
        {
            if let Some(Envelope::Decoder {
                generation: previous,
                event: DecoderEvent::BufferingStart,
            }) = out.last()
            {
                if *previous == generation {
                    trace!(generation, "Coalesced buffering start/end pair");
                    out.pop();
                    continue;
                }
            }
        }
        out.push(envelope);
    }
    out
}
