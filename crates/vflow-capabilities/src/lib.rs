//! Clients for the external media capability services.
//!
//! Every media operation (transcription, scene generation, clip rendering,
//! audio normalization, CFR re-encoding, silence compression, speech
//! synthesis, concatenation) runs in an external service. This crate exposes
//! them behind the [`Capabilities`] trait, with an HTTP implementation and a
//! chat-style [`Notifier`].

pub mod client;
pub mod config;
pub mod error;
pub mod notifier;
pub mod traits;
pub mod types;

pub use client::HttpCapabilityClient;
pub use config::CapabilityClientConfig;
pub use error::{CapabilityError, CapabilityResult};
pub use notifier::{NoopNotifier, Notifier, WebhookNotifier};
pub use traits::{ByteStream, Capabilities};
pub use types::{CaptionSegment, SilenceOptions, SpeechTarget, Transcription};
