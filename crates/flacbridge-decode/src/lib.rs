//! FLAC to interleaved f32 PCM decoding core.
//!
//! `FlacStream` is the streaming session (open, bounded reads, seek by
//! frame index); `decode_file` is the whole-file convenience built on the
//! same primitives. The actual bitstream work is symphonia's, wrapped by
//! [`engine::SymphoniaBackend`].

pub mod engine;
pub mod error;
pub mod stream;
pub mod support;
pub mod types;

pub use engine::{DecodeBackend, SymphoniaBackend};
pub use error::DecodeError;
pub use stream::{FlacStream, decode_all, decode_file};
pub use support::{supports_extension, supports_path};
pub use types::StreamSpec;
