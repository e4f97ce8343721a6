use std::f32::consts::PI;
use voice_visualizer::VisualizerError;
use voice_visualizer::audio::AtomicSpectrum;
use voice_visualizer::spectrum::{AnalyserConfig, ByteAnalyser, SampleWindow, SpectralFrame};

fn sine(n: usize, bin: usize, amp: f32) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * PI * bin as f32 * i as f32 / n as f32).sin())
        .collect()
}

#[test]
fn default_analyser_has_1024_bins() {
    let a = ByteAnalyser::new(AnalyserConfig::default()).unwrap();
    assert_eq!(a.fft_size(), 2048);
    assert_eq!(a.bin_count(), 1024);
    assert_eq!(AnalyserConfig::default().bin_count(), 1024);
}

#[test]
fn silence_maps_to_zero() {
    let mut a = ByteAnalyser::new(AnalyserConfig::default()).unwrap();
    let bytes = a.process(&vec![0.0; 2048]);
    assert_eq!(bytes.len(), 1024);
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn loud_tone_saturates_its_bin_only() {
    let mut a = ByteAnalyser::new(AnalyserConfig::default()).unwrap();
    let bytes = a.process(&sine(2048, 64, 1.0)).to_vec();
    assert_eq!(bytes[64], 255);
    assert!(bytes[900] < 10, "far bin leaked: {}", bytes[900]);
    assert!(bytes[10] < 10, "far bin leaked: {}", bytes[10]);
}

#[test]
fn smoothing_ramps_towards_steady_state() {
    let mut a = ByteAnalyser::new(AnalyserConfig::default()).unwrap();
    let tone = sine(2048, 100, 0.01);
    let first = a.process(&tone)[100];
    let second = a.process(&tone)[100];
    assert!(second > first, "{second} should exceed {first}");

    let mut last = second;
    for _ in 0..60 {
        last = a.process(&tone)[100];
    }
    // 0.01 * 0.42 / 2 => about -53.6 dBFS => about 169 on the default range.
    assert!((166..=172).contains(&last), "steady value {last}");
}

#[test]
fn zero_smoothing_reaches_steady_state_immediately() {
    let cfg = AnalyserConfig {
        smoothing: 0.0,
        ..AnalyserConfig::default()
    };
    let mut a = ByteAnalyser::new(cfg).unwrap();
    let tone = sine(2048, 100, 0.01);
    let first = a.process(&tone)[100];
    let again = a.process(&tone)[100];
    assert_eq!(first, again);
    assert!((166..=172).contains(&first));
}

#[test]
fn reset_forgets_history() {
    let mut a = ByteAnalyser::new(AnalyserConfig::default()).unwrap();
    a.process(&sine(2048, 32, 0.5));
    a.reset();
    assert!(a.bytes().iter().all(|&b| b == 0));
    let bytes = a.process(&vec![0.0; 2048]);
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn short_input_is_treated_as_leading_silence() {
    let mut a = ByteAnalyser::new(AnalyserConfig {
        fft_size: 64,
        ..AnalyserConfig::default()
    })
    .unwrap();
    assert_eq!(a.process(&[0.0; 10]).len(), 32);
}

#[test]
fn invalid_analyser_configs_are_rejected() {
    let bad = [
        AnalyserConfig {
            fft_size: 1000,
            ..AnalyserConfig::default()
        },
        AnalyserConfig {
            fft_size: 16,
            ..AnalyserConfig::default()
        },
        AnalyserConfig {
            fft_size: 65536,
            ..AnalyserConfig::default()
        },
        AnalyserConfig {
            smoothing: 1.5,
            ..AnalyserConfig::default()
        },
        AnalyserConfig {
            min_db: -30.0,
            max_db: -30.0,
            ..AnalyserConfig::default()
        },
    ];
    for cfg in bad {
        let err = ByteAnalyser::new(cfg).err().expect("config should fail");
        assert!(matches!(err, VisualizerError::Config(_)), "{cfg:?}: {err}");
    }
}

#[test]
fn non_finite_db_bounds_are_rejected() {
    for (min_db, max_db) in [
        (f32::NEG_INFINITY, -30.0),
        (-100.0, f32::INFINITY),
        (f32::NAN, -30.0),
    ] {
        let cfg = AnalyserConfig {
            min_db,
            max_db,
            ..AnalyserConfig::default()
        };
        let err = cfg.validate().expect_err("non-finite bound should fail");
        assert!(err.to_string().contains("finite"), "{cfg:?}: {err}");
    }
}

#[test]
fn sample_window_returns_chronological_order() {
    let mut w = SampleWindow::new(4);
    for s in 1..=5 {
        w.push(s as f32);
    }
    assert!(w.is_full());
    let mut out = Vec::new();
    w.copy_ordered(&mut out);
    assert_eq!(out, vec![2.0, 3.0, 4.0, 5.0]);

    let mut partial = SampleWindow::new(3);
    partial.push(1.0);
    assert!(!partial.is_full());
    partial.copy_ordered(&mut out);
    assert_eq!(out, vec![0.0, 0.0, 1.0]);
}

#[test]
fn frame_normalizes_bytes() {
    let f = SpectralFrame::new(vec![0, 255, 51]);
    assert_eq!(f.len(), 3);
    assert_eq!(f.normalized(0), 0.0);
    assert_eq!(f.normalized(1), 1.0);
    assert!((f.normalized(2) - 0.2).abs() < 1e-6);
    assert_eq!(f.normalized(9), 0.0);
    assert!(SpectralFrame::silent(8).bins().iter().all(|&b| b == 0));
}

#[test]
fn atomic_spectrum_publishes_latest_frame() {
    let slot = AtomicSpectrum::new(4);
    let mut out = Vec::new();
    assert!(!slot.load_into(&mut out));
    assert_eq!(out, vec![0, 0, 0, 0]);

    slot.store(&[1, 2, 3, 4]);
    slot.store(&[5, 6, 7, 8]);
    assert!(slot.load_into(&mut out));
    assert_eq!(out, vec![5, 6, 7, 8]);
}
