//! Extract glottal and spectral features from WAV files and print them as JSON.
//!
//! ```text
//! cargo run --example extract_features -- speech.wav [more.wav ...]
//! ```
//!
//! Set `RUST_LOG=vocalcheck=debug` to see timing and resampling logs.

use vocalcheck::FeatureExtractor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: extract_features <file.wav> [file.wav ...]");
        std::process::exit(2);
    }

    let extractor = FeatureExtractor::default();
    for (path, result) in paths.iter().zip(extractor.extract_batch(&paths)) {
        match result {
            Ok(features) => {
                let summary = serde_json::json!({
                    "path": path,
                    "duration": features.duration,
                    "spectrogram_frames": features.spectrogram.n_signal_frames(),
                    "glottal": features.glottal.summary(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Err(e) => eprintln!("{path}: {e}"),
        }
    }

    Ok(())
}
