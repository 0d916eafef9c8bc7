use std::fs::File;
use std::io;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CODEC_TYPE_FLAC, Decoder as SymphoniaDecoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::DecodeError;
use crate::support::{extension_from_path, supports_extension};
use crate::types::StreamSpec;

/// Seam between the session state machine and the underlying engine.
///
/// [`SymphoniaBackend`] is the production implementation; session tests
/// drive the state machine through scripted stand-ins instead.
pub trait DecodeBackend: Send {
    fn spec(&self) -> StreamSpec;

    /// Decode up to `frames` interleaved frames into `out`, returning the
    /// count actually produced. 0 means end-of-stream.
    fn read_interleaved(&mut self, out: &mut [f32], frames: usize) -> Result<usize, DecodeError>;

    /// Reposition so the next read produces `frame` first. `total_frames`
    /// positions at end-of-stream; anything past it is rejected.
    fn seek_to_frame(&mut self, frame: u64) -> Result<(), DecodeError>;
}

pub struct SymphoniaBackend {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn SymphoniaDecoder>,
    track_id: u32,
    spec: StreamSpec,
    sample_buf: Option<SampleBuffer<f32>>,
    pending: Vec<f32>,
    /// Frames still to drop after an accurate seek landed on the packet
    /// boundary before the requested frame.
    skip_frames: u64,
    exhausted: bool,
}

impl SymphoniaBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let ext = extension_from_path(path);

        let mut hint = Hint::new();
        if supports_extension(&ext) {
            hint.with_extension(&ext);
        }

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        let format = probed.format;
        let track = format.default_track().ok_or(DecodeError::MissingTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        if params.codec != CODEC_TYPE_FLAC {
            return Err(DecodeError::NotFlac);
        }
        let sample_rate = params.sample_rate.ok_or(DecodeError::MissingSampleRate)?;
        let channels = params
            .channels
            .as_ref()
            .map(|v| v.count() as u16)
            .filter(|&c| c > 0)
            .ok_or(DecodeError::MissingChannels)?;
        // STREAMINFO may legally omit the total; the session contract needs
        // it, so such streams are rejected at open.
        let total_frames = params.n_frames.ok_or(DecodeError::MissingFrameCount)?;

        let decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

        debug!(
            path = %path.display(),
            sample_rate,
            channels,
            total_frames,
            "opened flac stream"
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            spec: StreamSpec {
                sample_rate,
                channels,
                total_frames,
            },
            sample_buf: None,
            pending: Vec::new(),
            skip_frames: 0,
            exhausted: false,
        })
    }

    fn append_decoded(
        sample_buf: &mut Option<SampleBuffer<f32>>,
        pending: &mut Vec<f32>,
        skip_frames: &mut u64,
        spec_channels: u16,
        audio_buf: AudioBufferRef<'_>,
    ) {
        let spec = SignalSpec::new(audio_buf.spec().rate, audio_buf.spec().channels);
        let duration = audio_buf.capacity() as u64;
        let needs_realloc = sample_buf
            .as_ref()
            .is_none_or(|buf| buf.capacity() < audio_buf.capacity());
        if needs_realloc {
            *sample_buf = Some(SampleBuffer::<f32>::new(duration, spec));
        }

        let Some(sample_buf) = sample_buf.as_mut() else {
            return;
        };
        sample_buf.copy_interleaved_ref(audio_buf);

        let channels = spec_channels.max(1) as usize;
        let mut samples = sample_buf.samples();
        if *skip_frames > 0 {
            let frames_in_buf = (samples.len() / channels) as u64;
            let drop = (*skip_frames).min(frames_in_buf) as usize;
            samples = &samples[drop * channels..];
            *skip_frames -= drop as u64;
        }
        pending.extend_from_slice(samples);
    }
}

impl DecodeBackend for SymphoniaBackend {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn read_interleaved(&mut self, out: &mut [f32], frames: usize) -> Result<usize, DecodeError> {
        let channels = self.spec.channels.max(1) as usize;
        let mut want = frames.saturating_mul(channels);
        if want > out.len() {
            want = out.len() / channels * channels;
        }

        while self.pending.len() < want && !self.exhausted {
            match self.format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != self.track_id {
                        continue;
                    }
                    match self.decoder.decode(&packet) {
                        Ok(audio_buf) => Self::append_decoded(
                            &mut self.sample_buf,
                            &mut self.pending,
                            &mut self.skip_frames,
                            self.spec.channels,
                            audio_buf,
                        ),
                        Err(SymphoniaError::DecodeError(_)) => continue,
                        Err(SymphoniaError::ResetRequired) => {
                            self.decoder.reset();
                            continue;
                        },
                        Err(e) => return Err(e.into()),
                    }
                },
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.exhausted = true;
                },
                Err(e) => return Err(e.into()),
            }
        }

        if self.pending.is_empty() {
            return Ok(0);
        }
        let take = want.min(self.pending.len());
        out[..take].copy_from_slice(&self.pending[..take]);
        self.pending.drain(..take);
        Ok(take / channels)
    }

    fn seek_to_frame(&mut self, frame: u64) -> Result<(), DecodeError> {
        let total = self.spec.total_frames;
        if frame > total {
            return Err(DecodeError::SeekOutOfRange { frame, total });
        }
        if frame == total {
            // Nothing decodable remains past the last frame; park at EOF
            // without asking the format reader to land there.
            self.decoder.reset();
            self.pending.clear();
            self.skip_frames = 0;
            self.exhausted = true;
            return Ok(());
        }

        // State stays untouched when the reader refuses the seek, so a
        // caller that ignores the failure keeps reading from the old spot.
        let seeked = self.format.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: frame,
                track_id: self.track_id,
            },
        )?;
        self.decoder.reset();
        self.pending.clear();
        self.skip_frames = frame.saturating_sub(seeked.actual_ts);
        self.exhausted = false;
        debug!(frame, actual_ts = seeked.actual_ts, "seeked flac stream");
        Ok(())
    }
}
