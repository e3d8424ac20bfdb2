//! Integration tests for the beat tracking engine

use beat_tracker::{
    analyze_beats, calculate_onset_detection_function, detect_beats, detect_beats_from_odf,
    AnalysisFlag, BeatAnalysis, BeatTracker, OnsetMethod, TempoUpdate, TrackerConfig,
    TrackerError, TrackingMode, ODF_OFFSET,
};
use float_cmp::approx_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

const SAMPLE_RATE: u32 = 44100;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Decaying 1 kHz clicks at a fixed tempo, the first one at `offset` seconds
fn click_track(bpm: f64, seconds: f64, offset: f64) -> Vec<f64> {
    let fs = SAMPLE_RATE as f64;
    let mut samples = vec![0.0; (fs * seconds) as usize];
    let click_len = (0.02 * fs) as usize;

    let mut t = offset;
    while t < seconds {
        let start = (t * fs).round() as usize;
        for k in 0..click_len {
            if let Some(sample) = samples.get_mut(start + k) {
                let tt = k as f64 / fs;
                *sample += (2.0 * std::f64::consts::PI * 1000.0 * tt).sin() * (-tt / 0.005).exp();
            }
        }
        t += 60.0 / bpm;
    }

    samples
}

fn noise(seconds: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..(SAMPLE_RATE as f64 * seconds) as usize)
        .map(|_| rng.random_range(-0.5..0.5))
        .collect()
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values[values.len() / 2]
}

fn gaps(beats: &[f64]) -> Vec<f64> {
    beats.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Distance from `time` to the nearest click of a track built by [`click_track`]
fn click_error(time: f64, bpm: f64, offset: f64) -> f64 {
    let period = 60.0 / bpm;
    let k = ((time - offset) / period).round();
    (time - (offset + k * period)).abs()
}

#[test]
fn test_click_track_causal() {
    init_logger();
    let samples = click_track(120.0, 20.0, 0.1);
    let beats = detect_beats(&samples, SAMPLE_RATE, &TrackerConfig::default()).unwrap();

    assert!(beats.len() >= 35 && beats.len() <= 42, "{} beats", beats.len());
    assert!(approx_eq!(f64, median(gaps(&beats)), 0.5, epsilon = 0.02));

    // Locked onto the clicks once the tempo has settled
    for &beat in beats.iter().filter(|&&t| t > 5.0) {
        assert!(click_error(beat, 120.0, 0.1) < 0.05, "beat at {:.3}s is off the grid", beat);
    }
}

#[test]
fn test_click_track_offline() {
    init_logger();
    let samples = click_track(120.0, 20.0, 0.1);
    let config = TrackerConfig {
        tracking_mode: TrackingMode::Offline,
        ..Default::default()
    };
    let beats = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();

    assert!(beats.len() >= 37 && beats.len() <= 41, "{} beats", beats.len());
    assert!(approx_eq!(f64, median(gaps(&beats)), 0.5, epsilon = 0.02));
    for &beat in beats.iter().filter(|&&t| t > 2.0) {
        assert!(click_error(beat, 120.0, 0.1) < 0.05, "beat at {:.3}s is off the grid", beat);
    }
}

#[test]
fn test_beats_strictly_increasing() {
    init_logger();
    let samples = noise(15.0, 7);

    for mode in [TrackingMode::Causal, TrackingMode::Offline] {
        let config = TrackerConfig {
            tracking_mode: mode,
            ..Default::default()
        };
        let beats = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();

        assert!(!beats.is_empty(), "{} mode found no beats", mode);
        assert!(beats[0] >= 0.0);
        assert!(beats.windows(2).all(|w| w[0] < w[1]), "{} mode beats not increasing", mode);
    }
}

#[test]
fn test_offline_beat_spacing() {
    let samples = noise(15.0, 11);
    let config = TrackerConfig {
        tracking_mode: TrackingMode::Offline,
        ..Default::default()
    };
    let beats = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();

    // Periods lie between 32 hops (160 BPM) and 65 hops (80 BPM), beats
    // between half and twice a period apart
    let hop_seconds = 512.0 / SAMPLE_RATE as f64;
    for gap in gaps(&beats) {
        assert!(
            gap >= 16.0 * hop_seconds - 1e-9 && gap <= 130.0 * hop_seconds + 1e-9,
            "gap {:.3}s out of range",
            gap
        );
    }
}

#[test]
fn test_offline_is_deterministic() {
    let samples = noise(10.0, 3);
    let config = TrackerConfig {
        tracking_mode: TrackingMode::Offline,
        ..Default::default()
    };

    let first = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();
    let second = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_audio_and_odf_paths_agree() {
    init_logger();
    let samples = click_track(100.0, 12.0, 0.3);

    for mode in [TrackingMode::Causal, TrackingMode::Offline] {
        let config = TrackerConfig {
            tracking_mode: mode,
            ..Default::default()
        };
        let odf = calculate_onset_detection_function(&samples, SAMPLE_RATE, &config).unwrap();
        let from_odf = detect_beats_from_odf(&odf, SAMPLE_RATE, &config).unwrap();
        let from_audio = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();

        assert_eq!(from_audio.len(), from_odf.len());
        for (a, b) in from_audio.iter().zip(&from_odf) {
            assert!(approx_eq!(f64, *a, *b, ulps = 2));
        }
    }
}

#[test]
fn test_odf_non_negative_for_every_method() {
    let samples = noise(2.0, 5);

    for method in OnsetMethod::ALL {
        let config = TrackerConfig {
            onset_method: method,
            ..Default::default()
        };
        let odf = calculate_onset_detection_function(&samples, SAMPLE_RATE, &config).unwrap();

        assert_eq!(odf.len(), samples.len() / config.hop_size);
        assert!(odf.iter().all(|&v| v >= 0.0 && v.is_finite()), "{} produced a negative value", method);
    }
}

#[test]
fn test_odf_is_idempotent() {
    let samples = noise(3.0, 9);
    let config = TrackerConfig::default();

    let first = calculate_onset_detection_function(&samples, SAMPLE_RATE, &config).unwrap();
    let second = calculate_onset_detection_function(&samples, SAMPLE_RATE, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_audio_shorter_than_one_window() {
    let config = TrackerConfig::default();

    // Less than one hop: nothing to analyse
    let beats = detect_beats(&[0.1; 300], SAMPLE_RATE, &config).unwrap();
    assert!(beats.is_empty());

    // One hop, still shorter than a frame
    let beats = detect_beats(&[0.1; 700], SAMPLE_RATE, &config).unwrap();
    assert!(beats.len() <= 1);

    let odf = calculate_onset_detection_function(&[0.1; 700], SAMPLE_RATE, &config).unwrap();
    assert_eq!(odf.len(), 1);
}

#[test]
fn test_empty_odf_yields_no_beats() {
    let beats = detect_beats_from_odf(&[], SAMPLE_RATE, &TrackerConfig::default()).unwrap();
    assert!(beats.is_empty());
}

#[test]
fn test_input_errors() {
    let config = TrackerConfig::default();

    assert!(matches!(
        detect_beats(&[], SAMPLE_RATE, &config),
        Err(TrackerError::InvalidInput(_))
    ));
    assert!(matches!(
        detect_beats(&[0.0; 2048], 0, &config),
        Err(TrackerError::InvalidInput(_))
    ));

    let mut samples = vec![0.0; 4096];
    samples[1000] = f64::NAN;
    assert!(matches!(
        calculate_onset_detection_function(&samples, SAMPLE_RATE, &config),
        Err(TrackerError::InvalidInput(_))
    ));

    assert!(matches!(
        detect_beats_from_odf(&[1.0, f64::INFINITY], SAMPLE_RATE, &config),
        Err(TrackerError::InvalidInput(_))
    ));
}

#[test]
fn test_configuration_errors() {
    let samples = vec![0.0; 4096];

    let config = TrackerConfig {
        hop_size: 0,
        ..Default::default()
    };
    assert!(matches!(
        detect_beats(&samples, SAMPLE_RATE, &config),
        Err(TrackerError::InvalidConfig(_))
    ));

    let config = TrackerConfig {
        min_bpm: 160.0,
        max_bpm: 80.0,
        ..Default::default()
    };
    assert!(matches!(
        detect_beats_from_odf(&[1.0; 100], SAMPLE_RATE, &config),
        Err(TrackerError::InvalidConfig(_))
    ));

    assert!(matches!(
        "spectral-flux".parse::<OnsetMethod>(),
        Err(TrackerError::InvalidConfig(_))
    ));
}

#[test]
fn test_analyze_beats() {
    init_logger();
    let samples = click_track(120.0, 20.0, 0.1);
    let config = TrackerConfig {
        tracking_mode: TrackingMode::Offline,
        ..Default::default()
    };
    let result = analyze_beats(&samples, SAMPLE_RATE, &config).unwrap();

    assert_eq!(result.beats.len(), result.beat_frames.len());
    assert_eq!(result.onset_detection_function.len(), samples.len() / 512);
    assert_eq!(result.metadata.num_hops, result.onset_detection_function.len());
    assert!(approx_eq!(f64, result.metadata.duration_seconds, 20.0, epsilon = 1e-9));
    assert_eq!(result.metadata.sample_rate, SAMPLE_RATE);
    assert_eq!(result.metadata.tracking_mode, TrackingMode::Offline);
    assert_eq!(result.metadata.algorithm_version, env!("CARGO_PKG_VERSION"));

    assert!(result.tempo.bpm > 110.0 && result.tempo.bpm < 130.0, "{:.1} BPM", result.tempo.bpm);
    assert!(result.confidence.grid_stability > 0.9);
    assert!(!result.confidence.flags.contains(&AnalysisFlag::NoBeats));
    assert!(approx_eq!(f64, result.median_beat_interval().unwrap(), 0.5, epsilon = 0.02));

    let beats = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();
    assert_eq!(result.beats, beats);
}

#[test]
fn test_analysis_serialization() {
    let samples = click_track(120.0, 8.0, 0.1);
    let result = analyze_beats(&samples, SAMPLE_RATE, &TrackerConfig::default()).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let parsed: BeatAnalysis = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.beats, result.beats);
    assert_eq!(parsed.beat_frames, result.beat_frames);
    assert_eq!(parsed.onset_detection_function, result.onset_detection_function);
    assert_eq!(parsed.metadata.onset_method, result.metadata.onset_method);
}

#[test]
fn test_streaming_matches_facade() {
    let samples = click_track(120.0, 10.0, 0.1);
    let config = TrackerConfig::default();
    let odf = calculate_onset_detection_function(&samples, SAMPLE_RATE, &config).unwrap();

    // Audio hops and precomputed onset values drive the same engine
    let mut from_audio = BeatTracker::new(&config, SAMPLE_RATE).unwrap();
    let mut from_odf = BeatTracker::new(&config, SAMPLE_RATE).unwrap();
    for (hop, &value) in samples.chunks_exact(config.hop_size).zip(&odf) {
        let a = from_audio.process_hop(hop).unwrap();
        let b = from_odf.process_onset_sample(value);
        assert_eq!(a, b);
        assert_eq!(from_audio.beat_due_in_current_frame(), a.is_some());
    }

    // The facade shifts every value by ODF_OFFSET
    let mut tracker = BeatTracker::new(&config, SAMPLE_RATE).unwrap();
    let streamed: Vec<f64> = odf
        .iter()
        .filter_map(|&value| tracker.process_onset_sample(value + ODF_OFFSET))
        .map(|beat| beat.time_seconds)
        .collect();
    assert_eq!(streamed, detect_beats(&samples, SAMPLE_RATE, &config).unwrap());
}

#[test]
fn test_interval_tempo_update() {
    let samples = click_track(120.0, 20.0, 0.1);
    let config = TrackerConfig {
        tempo_update: TempoUpdate::Interval(64),
        ..Default::default()
    };
    let beats = detect_beats(&samples, SAMPLE_RATE, &config).unwrap();

    assert!(beats.len() > 30);
    assert!(beats.windows(2).all(|w| w[0] < w[1]));
}

/// Reference fixture: an onset detection function and the beats the
/// reference tracker found in it
#[derive(serde::Deserialize)]
struct OdfFixture {
    odf: Vec<f64>,
    beats: Vec<f64>,
}

fn fixture_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(filename)
}

#[test]
fn test_reference_odf_fixtures() {
    init_logger();

    for (name, expected_beats) in [("odf1.json", 94), ("odf2.json", 110), ("odf3.json", 126)] {
        let path = fixture_path(name);
        let Ok(contents) = std::fs::read_to_string(&path) else {
            eprintln!("Skipping {}: fixture not found", path.display());
            continue;
        };

        let fixture: OdfFixture = serde_json::from_str(&contents).unwrap();
        let beats = detect_beats_from_odf(&fixture.odf, SAMPLE_RATE, &TrackerConfig::default()).unwrap();

        assert_eq!(beats.len(), expected_beats, "{}", name);
        assert_eq!(beats.len(), fixture.beats.len(), "{}", name);
        for (actual, expected) in beats.iter().zip(&fixture.beats) {
            let tolerance = 1e-8 + 1e-6 * expected.abs();
            assert!((actual - expected).abs() <= tolerance, "{}: {} vs {}", name, actual, expected);
        }
    }
}
