//! fxrender - offline effect chain renderer
//!
//! Run with: cargo run -- [seconds] [output.wav]
//!
//! Set `RUST_LOG=debug` to see effect construction and per-block levels.

mod render;

use color_eyre::eyre::{eyre, WrapErr};
use fxchain::effects::{
    Delay, Dither, EnhancedReverb, Exciter, Flanger, StereoWidener, TapeSaturation,
};
use fxchain::source::SineSource;
use fxchain::StreamFormat;

use render::Render;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seconds = match args.next() {
        Some(arg) => arg
            .parse::<f32>()
            .wrap_err_with(|| format!("invalid duration {arg:?}"))?,
        None => 4.0,
    };
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(eyre!("duration must be positive, got {seconds}"));
    }
    let output = args.next();

    // Build the chain: tone -> color -> motion -> space -> output stage
    let format = StreamFormat::stereo(48_000);
    let tone = SineSource::new(format, 220.0, 0.4);

    let mut exciter = Exciter::new(tone)?;
    exciter.set_amount(0.2);
    let mut tape = TapeSaturation::new(exciter)?;
    tape.set_drive(2.5);
    let flanger = Flanger::new(tape)?;
    let mut delay = Delay::new(flanger)?;
    delay.set_time_ms(375.0);
    let mut reverb = EnhancedReverb::new(delay)?;
    reverb.set_room_size(0.7);
    let widener = StereoWidener::new(reverb)?;
    let dither = Dither::new(widener)?;

    let summary = Render::new(dither)
        .seconds(seconds)
        .block_frames(512)
        .output(output)
        .run()?;

    log::info!(
        "rendered {} frames: peak {:.3} dBFS, rms {:.3} dBFS",
        summary.frames,
        summary.peak_db(),
        summary.rms_db()
    );
    Ok(())
}
