//! Offline renderer: pulls a chain in fixed blocks and reports levels.

use color_eyre::eyre::{eyre, Result as EyreResult};

use fxchain::AudioSource;

/// Blocks between level reports.
const REPORT_EVERY: usize = 64;

/// Levels over a whole render.
#[derive(Debug, Default, Clone, Copy)]
pub struct Summary {
    pub frames: usize,
    pub peak: f32,
    pub sum_squares: f64,
    pub samples: usize,
}

impl Summary {
    fn add(&mut self, block: &[f32]) {
        for &sample in block {
            self.peak = self.peak.max(sample.abs());
            self.sum_squares += f64::from(sample * sample);
        }
        self.samples += block.len();
    }

    pub fn rms(&self) -> f32 {
        if self.samples == 0 {
            return 0.0;
        }
        (self.sum_squares / self.samples as f64).sqrt() as f32
    }

    pub fn peak_db(&self) -> f32 {
        to_db(self.peak)
    }

    pub fn rms_db(&self) -> f32 {
        to_db(self.rms())
    }
}

fn to_db(level: f32) -> f32 {
    20.0 * level.max(1e-9).log10()
}

/// Render builder
pub struct Render<S> {
    chain: S,
    seconds: f32,
    block_frames: usize,
    output: Option<String>,
}

impl<S: AudioSource> Render<S> {
    pub fn new(chain: S) -> Self {
        Self {
            chain,
            seconds: 4.0,
            block_frames: 512,
            output: None,
        }
    }

    pub fn seconds(mut self, seconds: f32) -> Self {
        self.seconds = seconds;
        self
    }

    pub fn block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames.clamp(1, fxchain::MAX_BLOCK_SIZE);
        self
    }

    /// Write the render to a WAV file as well (needs the `wav` feature).
    pub fn output(mut self, path: Option<String>) -> Self {
        self.output = path;
        self
    }

    /// Pull the chain until the duration is covered or it runs dry.
    pub fn run(mut self) -> EyreResult<Summary> {
        let format = self.chain.format();
        let channels = format.channel_count();
        let total_frames = (self.seconds * format.sample_rate_f32()).round() as usize;

        log::info!(
            "rendering {:.2}s at {} Hz, {} ch, {} frame blocks",
            self.seconds,
            format.sample_rate,
            format.channels,
            self.block_frames
        );

        let mut block = vec![0.0f32; self.block_frames * channels];
        let mut rendered = Vec::with_capacity(if self.output.is_some() {
            total_frames * channels
        } else {
            0
        });
        let mut summary = Summary::default();
        let mut group = Summary::default();
        let mut blocks = 0usize;

        while summary.frames < total_frames {
            let frames = self.block_frames.min(total_frames - summary.frames);
            let wanted = frames * channels;
            let produced = self.chain.read(&mut block, 0, wanted);
            if produced == 0 {
                log::warn!("chain ended after {} frames", summary.frames);
                break;
            }

            let samples = &block[..produced];
            summary.add(samples);
            group.add(samples);
            summary.frames += produced / channels;
            if self.output.is_some() {
                rendered.extend_from_slice(samples);
            }

            blocks += 1;
            if blocks % REPORT_EVERY == 0 {
                log::debug!(
                    "blocks {}..{}: peak {:.2} dBFS, rms {:.2} dBFS",
                    blocks - REPORT_EVERY,
                    blocks,
                    group.peak_db(),
                    group.rms_db()
                );
                group = Summary::default();
            }
        }

        if !summary.peak.is_finite() {
            return Err(eyre!("chain produced non-finite samples"));
        }

        if let Some(path) = &self.output {
            write_wav(path, format, &rendered)?;
        }

        Ok(summary)
    }
}

#[cfg(feature = "wav")]
fn write_wav(path: &str, format: fxchain::StreamFormat, samples: &[f32]) -> EyreResult<()> {
    use color_eyre::eyre::WrapErr;

    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).wrap_err_with(|| format!("creating {path}"))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    log::info!("wrote {path}");
    Ok(())
}

#[cfg(not(feature = "wav"))]
fn write_wav(path: &str, _format: fxchain::StreamFormat, _samples: &[f32]) -> EyreResult<()> {
    Err(eyre!("cannot write {path}: built without the `wav` feature"))
}
