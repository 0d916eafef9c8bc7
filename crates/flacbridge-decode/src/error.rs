use std::io;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("missing audio track")]
    MissingTrack,

    #[error("track codec is not flac")]
    NotFlac,

    #[error("missing sample rate in codec parameters")]
    MissingSampleRate,

    #[error("missing channel layout in codec parameters")]
    MissingChannels,

    #[error("missing total frame count in codec parameters")]
    MissingFrameCount,

    #[error("seek target {frame} is past the last frame (stream has {total})")]
    SeekOutOfRange { frame: u64, total: u64 },

    #[error("stream ended after {produced} of {expected} declared frames")]
    ShortRead { produced: u64, expected: u64 },

    #[error("decoder error: {0}")]
    Symphonia(#[from] SymphoniaError),
}
