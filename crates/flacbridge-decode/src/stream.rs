use std::path::Path;

use tracing::debug;

use crate::engine::{DecodeBackend, SymphoniaBackend};
use crate::error::DecodeError;
use crate::types::StreamSpec;

/// Streaming decode session: a decode backend plus the read cursor.
///
/// The cursor stays within `0..=total_frames`. End of stream is observable
/// only as a read producing 0 frames; the session stays open and remains
/// seekable backward afterwards. A session is single-owner and must be
/// externally serialized; independent sessions are fully independent.
pub struct FlacStream {
    backend: Box<dyn DecodeBackend>,
    spec: StreamSpec,
    cursor: u64,
}

impl FlacStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let backend = SymphoniaBackend::open(path)?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Wrap an already-open backend. This is how alternative engines (and
    /// scripted test backends) enter the session state machine.
    pub fn with_backend(backend: Box<dyn DecodeBackend>) -> Self {
        let spec = backend.spec();
        Self {
            backend,
            spec,
            cursor: 0,
        }
    }

    pub fn spec(&self) -> StreamSpec {
        self.spec
    }

    /// Current cursor position in PCM frames.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Decode up to `frames` interleaved frames into `out`, advancing the
    /// cursor by the count actually produced. Returns 0 at end of stream.
    /// Short reads are legal; callers loop when they need an exact count.
    ///
    /// `out` must hold `frames * channels` floats for the frames actually
    /// requested; the request is capped at the frames remaining so a read
    /// can never cross `total_frames`.
    pub fn read(&mut self, out: &mut [f32], frames: usize) -> Result<usize, DecodeError> {
        let remaining = self.spec.total_frames - self.cursor;
        let want = (frames as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let produced = self.backend.read_interleaved(out, want)?.min(want);
        self.cursor += produced as u64;
        Ok(produced)
    }

    /// Drain every remaining frame into `out`, returning the count read.
    /// `out` must hold `(total_frames - position) * channels` floats.
    pub fn read_all(&mut self, out: &mut [f32]) -> Result<u64, DecodeError> {
        let channels = self.spec.channels.max(1) as usize;
        let mut filled = 0u64;
        loop {
            let remaining = (self.spec.total_frames - self.cursor) as usize;
            if remaining == 0 {
                break;
            }
            let offset = filled as usize * channels;
            let produced = self.read(&mut out[offset..], remaining)?;
            if produced == 0 {
                break;
            }
            filled += produced as u64;
        }
        Ok(filled)
    }

    /// Move the cursor to `frame`. Target validation belongs to the
    /// backend: anything past `total_frames` is rejected there, while
    /// `total_frames` itself positions at end of stream. The cursor is
    /// left unchanged when the backend refuses.
    pub fn seek(&mut self, frame: u64) -> Result<(), DecodeError> {
        self.backend.seek_to_frame(frame)?;
        self.cursor = frame;
        Ok(())
    }
}

/// Decode every frame of an open session into one freshly allocated
/// interleaved buffer. A stream that stops short of its declared total is
/// treated as corrupt, not as partial success.
pub fn decode_all(mut stream: FlacStream) -> Result<(StreamSpec, Vec<f32>), DecodeError> {
    let spec = stream.spec();
    let mut pcm = vec![0.0f32; spec.total_samples() as usize];
    let filled = stream.read_all(&mut pcm)?;
    if filled != spec.total_frames {
        return Err(DecodeError::ShortRead {
            produced: filled,
            expected: spec.total_frames,
        });
    }
    debug!(frames = filled, "bulk decode complete");
    Ok((spec, pcm))
}

/// Whole-file convenience: open, decode everything, close.
pub fn decode_file(path: impl AsRef<Path>) -> Result<(StreamSpec, Vec<f32>), DecodeError> {
    decode_all(FlacStream::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted backend standing in for the symphonia engine.
    struct ScriptedBackend {
        spec: StreamSpec,
        samples: Vec<f32>,
        pos: u64,
        /// Caps frames per read to force partial reads.
        chunk_limit: Option<usize>,
        /// Pretend the stream ends at this frame despite the declared total.
        truncate_at: Option<u64>,
    }

    impl ScriptedBackend {
        fn new(sample_rate: u32, channels: u16, frames: u64) -> Self {
            let samples = (0..frames * u64::from(channels))
                .map(|i| i as f32 / 1000.0)
                .collect();
            Self {
                spec: StreamSpec {
                    sample_rate,
                    channels,
                    total_frames: frames,
                },
                samples,
                pos: 0,
                chunk_limit: None,
                truncate_at: None,
            }
        }
    }

    impl DecodeBackend for ScriptedBackend {
        fn spec(&self) -> StreamSpec {
            self.spec
        }

        fn read_interleaved(
            &mut self,
            out: &mut [f32],
            frames: usize,
        ) -> Result<usize, DecodeError> {
            let channels = self.spec.channels as usize;
            let end = self.truncate_at.unwrap_or(self.spec.total_frames);
            let avail = end.saturating_sub(self.pos);
            let mut n = (frames as u64).min(avail) as usize;
            if let Some(limit) = self.chunk_limit {
                n = n.min(limit);
            }
            let start = self.pos as usize * channels;
            out[..n * channels].copy_from_slice(&self.samples[start..start + n * channels]);
            self.pos += n as u64;
            Ok(n)
        }

        fn seek_to_frame(&mut self, frame: u64) -> Result<(), DecodeError> {
            if frame > self.spec.total_frames {
                return Err(DecodeError::SeekOutOfRange {
                    frame,
                    total: self.spec.total_frames,
                });
            }
            self.pos = frame;
            Ok(())
        }
    }

    fn stream_over(backend: ScriptedBackend) -> FlacStream {
        FlacStream::with_backend(Box::new(backend))
    }

    #[test]
    fn chunked_reads_drain_exactly_the_declared_frames() {
        // 2ch 44100Hz 4-frame stream read 2 frames at a time: two full
        // reads, then 0.
        let mut stream = stream_over(ScriptedBackend::new(44100, 2, 4));
        assert_eq!(
            stream.spec(),
            StreamSpec {
                sample_rate: 44100,
                channels: 2,
                total_frames: 4
            }
        );

        let mut out = [0.0f32; 4];
        assert_eq!(stream.read(&mut out, 2).expect("read"), 2);
        assert_eq!(stream.position(), 2);
        assert_eq!(stream.read(&mut out, 2).expect("read"), 2);
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.read(&mut out, 2).expect("read"), 0);
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn concatenated_reads_match_bulk_decode() {
        let frames = 13u64;
        let mut stream = stream_over(ScriptedBackend::new(48000, 2, frames));
        let mut streamed = Vec::new();
        let mut out = [0.0f32; 10];
        loop {
            let n = stream.read(&mut out, 5).expect("read");
            if n == 0 {
                break;
            }
            streamed.extend_from_slice(&out[..n * 2]);
        }
        assert_eq!(streamed.len() as u64, frames * 2);

        let (spec, bulk) = decode_all(stream_over(ScriptedBackend::new(48000, 2, frames)))
            .expect("bulk decode");
        assert_eq!(spec.total_frames, frames);
        assert_eq!(bulk, streamed);
    }

    #[test]
    fn partial_reads_are_not_errors() {
        let mut backend = ScriptedBackend::new(44100, 1, 8);
        backend.chunk_limit = Some(3);
        let mut stream = stream_over(backend);

        let mut out = [0.0f32; 8];
        assert_eq!(stream.read(&mut out, 8).expect("read"), 3);
        assert_eq!(stream.read(&mut out, 8).expect("read"), 3);
        assert_eq!(stream.read(&mut out, 8).expect("read"), 2);
        assert_eq!(stream.read(&mut out, 8).expect("read"), 0);
        assert_eq!(stream.position(), 8);
    }

    #[test]
    fn seek_restarts_and_eof_seek_reads_zero() {
        let mut stream = stream_over(ScriptedBackend::new(44100, 2, 4));
        let mut first = [0.0f32; 4];
        stream.read(&mut first, 2).expect("read");

        stream.seek(0).expect("seek to start");
        assert_eq!(stream.position(), 0);
        let mut again = [0.0f32; 4];
        assert_eq!(stream.read(&mut again, 2).expect("read"), 2);
        assert_eq!(again, first);

        stream.seek(4).expect("seek to total");
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.read(&mut again, 2).expect("read"), 0);
    }

    #[test]
    fn seek_past_total_fails_and_leaves_cursor_unchanged() {
        let mut stream = stream_over(ScriptedBackend::new(44100, 2, 4));
        let mut out = [0.0f32; 4];
        stream.read(&mut out, 2).expect("read");

        let err = stream.seek(5).expect_err("seek past total");
        assert!(matches!(
            err,
            DecodeError::SeekOutOfRange { frame: 5, total: 4 }
        ));
        assert_eq!(stream.position(), 2);
    }

    #[test]
    fn reads_never_cross_the_declared_total() {
        /// Lies about its produced count.
        struct OverReporting(ScriptedBackend);

        impl DecodeBackend for OverReporting {
            fn spec(&self) -> StreamSpec {
                self.0.spec()
            }
            fn read_interleaved(
                &mut self,
                out: &mut [f32],
                frames: usize,
            ) -> Result<usize, DecodeError> {
                self.0.read_interleaved(out, frames).map(|n| n + 7)
            }
            fn seek_to_frame(&mut self, frame: u64) -> Result<(), DecodeError> {
                self.0.seek_to_frame(frame)
            }
        }

        let mut stream =
            FlacStream::with_backend(Box::new(OverReporting(ScriptedBackend::new(44100, 1, 4))));
        let mut out = [0.0f32; 4];
        assert_eq!(stream.read(&mut out, 4).expect("read"), 4);
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.read(&mut out, 4).expect("read"), 0);
    }

    #[test]
    fn truncated_stream_is_a_short_read_error_in_bulk() {
        let mut backend = ScriptedBackend::new(44100, 2, 6);
        backend.truncate_at = Some(4);
        let err = decode_all(stream_over(backend)).expect_err("short stream");
        assert!(matches!(
            err,
            DecodeError::ShortRead {
                produced: 4,
                expected: 6
            }
        ));
    }

    #[test]
    fn bulk_buffer_is_total_frames_times_channels() {
        let (spec, pcm) = decode_all(stream_over(ScriptedBackend::new(22050, 2, 4))).expect("bulk");
        assert_eq!(pcm.len(), 8);
        assert_eq!(spec.total_samples(), 8);
    }
}
