//! The per-call streaming pipeline.
//!
//! Six stage workers connected by bounded queues, one set per call:
//!
//! ```text
//! wire -> [framer] -> denoise -> segmenter -> selector -> transcribe
//!                                                -> respond -> synthesize -> wire
//! ```
//!
//! Data flows strictly forward through the queues. Control flows backward
//! only through [`context::CallContext`]: the segmenter signals utterance
//! boundaries, the session signals shutdown. Stages never call each other.

pub mod context;
pub mod denoise;
pub mod msg;
pub mod respond;
pub mod segmenter;
pub mod selector;
pub mod session;
pub mod synthesize;
pub mod transcribe;

pub use context::CallContext;
pub use msg::{AudioFrame, AudioSegment, Feed, Reply, SynthesizedAudio, Transcript};
pub use session::{CallSession, CallStats};
