/// Stream parameters captured from the FLAC STREAMINFO block at open time.
/// Immutable for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Total PCM frames (samples per channel) the stream declares.
    pub total_frames: u64,
}

impl StreamSpec {
    /// Interleaved sample count for the whole stream.
    pub fn total_samples(&self) -> u64 {
        self.total_frames * u64::from(self.channels)
    }
}
