//! Shared per-call coordination state.
//!
//! The only object mutated by more than one stage. Flags are independent
//! relaxed atomics: each is set and cleared on its own, and stages tolerate
//! observing a peer's update one window late. No business logic lives here.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub struct CallContext {
    voice_detected: AtomicBool,
    speech_ended: AtomicBool,
    cancel: CancellationToken,
    wake: Notify,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            voice_detected: AtomicBool::new(false),
            speech_ended: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            wake: Notify::new(),
        }
    }

    pub fn set_voice_detected(&self, detected: bool) {
        self.voice_detected.store(detected, Ordering::Relaxed);
    }

    pub fn voice_detected(&self) -> bool {
        self.voice_detected.load(Ordering::Relaxed)
    }

    /// One-shot utterance boundary: set by the segmenter, consumed by the
    /// selector via [`take_speech_ended`](Self::take_speech_ended).
    pub fn signal_speech_ended(&self) {
        self.speech_ended.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Read and clear the speech-ended flag in one step.
    pub fn take_speech_ended(&self) -> bool {
        self.speech_ended.swap(false, Ordering::Relaxed)
    }

    /// Idempotent. Wakes anything parked on the wake event so shutdown is
    /// observed promptly.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.wake.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when shutdown has been signalled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Parks until the next utterance-boundary notification.
    pub async fn utterance_wake(&self) {
        self.wake.notified().await;
    }
}
