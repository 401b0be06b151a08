//! Reverse reverb.
//!
//! The reverb tail is recorded in segments of `length_ms` and each finished
//! segment is played back backwards while the next one records, so the wash
//! swells up into the moment the note started instead of decaying after it.
//!
//! ```text
//!   record   |-- seg 0 --|-- seg 1 --|-- seg 2 --|
//!   play                 |<- seg 0 --|<- seg 1 --|
//! ```
//!
//! Output lags input by one segment. Segment edges are faded in and out over
//! an eighth of the segment so the boundaries don't click. A length change
//! takes effect at the next boundary, and the segment recorded at the old
//! length is dropped rather than played back at the wrong size.

use crate::dsp::mix::fade_gain;
use crate::dsp::reverb::{room_feedback, ReverbNetwork};
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const ROOM_SIZE: &str = "room_size";
pub const DAMPING: &str = "damping";
pub const LENGTH_MS: &str = "length_ms";

const MIN_LENGTH_MS: f32 = 50.0;
const MAX_LENGTH_MS: f32 = 2000.0;
const DAMPING_SCALE: f32 = 0.5;

struct SegmentBuffers {
    recording: Vec<f32>,
    playback: Vec<f32>,
}

pub struct ReverseReverbKernel {
    network: ReverbNetwork,
    segments: Vec<SegmentBuffers>,
    sample_rate: f32,
    /// Frames in the segment currently recording and playing
    segment_len: usize,
    position: usize,
    room_size: f32,
    damping: f32,
    length_ms: f32,
}

impl ReverseReverbKernel {
    pub fn new(format: StreamFormat) -> Self {
        let capacity = format.ms_to_frames(MAX_LENGTH_MS).ceil() as usize;
        let channels = format.channel_count();
        let length_ms = 500.0;

        Self {
            network: ReverbNetwork::new(format.sample_rate_f32(), channels),
            segments: (0..channels)
                .map(|_| SegmentBuffers {
                    recording: vec![0.0; capacity],
                    playback: vec![0.0; capacity],
                })
                .collect(),
            sample_rate: format.sample_rate_f32(),
            segment_len: segment_frames(length_ms, format.sample_rate_f32(), capacity),
            position: 0,
            room_size: 0.6,
            damping: 0.5,
            length_ms,
        }
    }

    /// Frames per segment at the current setting.
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    fn start_segment(&mut self) {
        let capacity = self.segments.first().map_or(0, |s| s.recording.len());
        let target = segment_frames(self.length_ms, self.sample_rate, capacity);

        for segment in &mut self.segments {
            std::mem::swap(&mut segment.recording, &mut segment.playback);
            if target != self.segment_len {
                segment.playback.fill(0.0);
            }
        }
        self.segment_len = target;
        self.position = 0;
    }
}

fn segment_frames(length_ms: f32, sample_rate: f32, capacity: usize) -> usize {
    ((length_ms * sample_rate / 1000.0).round() as usize).clamp(1, capacity.max(1))
}

impl Kernel for ReverseReverbKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(ROOM_SIZE, 0.6, 0.0..=1.0);
        params.register_ranged(DAMPING, 0.5, 0.0..=1.0);
        params.register_ranged(LENGTH_MS, 500.0, MIN_LENGTH_MS..=MAX_LENGTH_MS);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            ROOM_SIZE => self.room_size = value,
            DAMPING => self.damping = value,
            LENGTH_MS => self.length_ms = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        self.network.set_feedback(room_feedback(self.room_size));
        self.network.set_damping(self.damping * DAMPING_SCALE);

        let channels = format.channel_count();
        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            let len = self.segment_len;
            let fade = (len / 8).max(1);
            let pos = self.position;
            let gain = fade_gain(pos, fade).min(fade_gain(len - 1 - pos, fade));

            for (c, (&x, y)) in frame_in.iter().zip(frame_out).enumerate() {
                let segment = &mut self.segments[c];
                segment.recording[pos] = self.network.process(c, x);
                *y = segment.playback[len - 1 - pos] * gain;
            }

            self.position += 1;
            if self.position == len {
                self.start_segment();
            }
        }
    }

    fn reset(&mut self) {
        self.network.reset();
        for segment in &mut self.segments {
            segment.recording.fill(0.0);
            segment.playback.fill(0.0);
        }
        self.position = 0;
    }
}

pub type ReverseReverb<S> = Effect<S, ReverseReverbKernel>;

impl<S: AudioSource> Effect<S, ReverseReverbKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(
            source,
            "Reverse Reverb",
            ReverseReverbKernel::new(format),
            0.5,
        )
    }

    pub fn room_size(&self) -> f32 {
        self.parameter(ROOM_SIZE)
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.set_parameter(ROOM_SIZE, room_size);
    }

    pub fn damping(&self) -> f32 {
        self.parameter(DAMPING)
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.set_parameter(DAMPING, damping);
    }

    pub fn length_ms(&self) -> f32 {
        self.parameter(LENGTH_MS)
    }

    /// Segment length in milliseconds, clamped to [50, 2000]. Applied at the
    /// next segment boundary.
    pub fn set_length_ms(&mut self, length_ms: f32) {
        self.set_parameter(LENGTH_MS, length_ms);
    }
}
