//! Print the three lowest LPC formants of a WAV file, one per line.
//!
//! Missing formants print as 0, the same as in the classifier input.

use vocalcheck::{FeatureConfig, Waveform};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: dump_formants <file.wav>")?;

    let config = FeatureConfig::default();
    let sound = Waveform::load(&path, config.sample_rate)?
        .normalized(config.silence_floor)?
        .pre_emphasis(config.pre_emphasis);

    let formants = sound.to_formants(config.lpc_order)?;
    for f in formants.padded() {
        println!("{f:.2}");
    }
    Ok(())
}
