//! Explainer Services Layer
//!
//! Question answering and speech synthesis on top of ingested repositories.
//! Both talk to third-party HTTP APIs through narrow provider traits so the
//! API crate (and tests) can swap the backing implementation.

pub mod audio;
pub mod error;
pub mod explain;
pub mod providers;
pub mod question;

pub use audio::AudioService;
pub use error::{ServiceError, ServiceResult};
pub use providers::{
    AnswerProvider, GeminiProvider, HttpSpeechSynthesizer, SpeechSynthesizer, SynthesizedSpeech,
};
pub use question::QuestionService;
