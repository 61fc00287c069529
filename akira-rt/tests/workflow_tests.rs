//! Retune Workflow State Machine & Pipeline Tests
//!
//! State machine coverage for RetuneSession plus end-to-end detection on
//! synthetic audio, exercised without ffmpeg.

use akira_rt::dsp::detector::{
    segment_verdicts, DetectorThresholds, FrameFeatures, OverstimDetector,
};
use akira_rt::dsp::loudness::loudness_dbfs;
use akira_rt::dsp::mel::MfccExtractor;
use akira_rt::dsp::retune::{retune_segment, RetuneSettings};
use akira_rt::dsp::Stft;
use akira_rt::models::{ErrorSeverity, RetuneParameters, RetuneSession, RetuneState};

/// Helper function to create test session
fn create_test_session() -> RetuneSession {
    RetuneSession::new(
        "cartoon.mp4".to_string(),
        "deadbeef".to_string(),
        RetuneParameters::default(),
    )
}

/// Deterministic pseudo-random samples in [-1.0, 1.0] (LCG)
fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / (u32::MAX >> 1) as f32) - 1.0
        })
        .collect()
}

/// TC-WF-001: New session starts in EXTRACTING
#[test]
fn tc_wf_001_new_session_starts_extracting() {
    // Given/When: A fresh session
    let session = create_test_session();

    // Then: EXTRACTING state, nothing flagged, no end timestamp
    assert_eq!(session.state, RetuneState::Extracting);
    assert_eq!(session.flagged_segments, 0);
    assert!(!session.repetition_detected);
    assert!(session.ended_at.is_none());
    assert!(!session.is_terminal());
}

/// TC-WF-002: Full phase path EXTRACTING → ... → COMPLETED
#[test]
fn tc_wf_002_full_phase_path() {
    // Given: A fresh session
    let mut session = create_test_session();

    // When: The workflow advances through every phase
    let path = [
        RetuneState::Analyzing,
        RetuneState::Classifying,
        RetuneState::Retuning,
        RetuneState::Muxing,
        RetuneState::Completed,
    ];
    let mut previous = RetuneState::Extracting;
    for state in path {
        let transition = session.transition_to(state);

        // Then: Each transition records old and new state
        assert_eq!(transition.old_state, previous);
        assert_eq!(transition.new_state, state);
        previous = state;
    }

    assert_eq!(session.state, RetuneState::Completed);
    assert!(session.is_terminal());
    assert!(session.ended_at.is_some());
}

/// TC-WF-003: Terminal transitions stamp ended_at exactly once
#[test]
fn tc_wf_003_terminal_states() {
    for terminal in [
        RetuneState::Completed,
        RetuneState::Cancelled,
        RetuneState::Failed,
    ] {
        let mut session = create_test_session();
        assert!(session.ended_at.is_none());

        session.transition_to(terminal);
        assert!(session.is_terminal());
        assert!(session.ended_at.is_some());
    }

    // Non-terminal transitions leave ended_at unset
    let mut session = create_test_session();
    session.transition_to(RetuneState::Analyzing);
    assert!(session.ended_at.is_none());
}

/// TC-WF-004: Errors accumulate with severity
#[test]
fn tc_wf_004_error_accumulation() {
    // Given: A running session
    let mut session = create_test_session();

    // When: A warning and a critical error occur
    session.add_error(akira_rt::models::RetuneSessionError::warning(
        "muxing".to_string(),
        "CLEANUP_FAILED".to_string(),
        "Could not remove work files".to_string(),
    ));
    session.add_error(akira_rt::models::RetuneSessionError::critical(
        "extracting".to_string(),
        "FFMPEG_FAILED".to_string(),
        "ffmpeg exited with status 1".to_string(),
    ));

    // Then: Both are recorded in order with their severities
    assert_eq!(session.errors.len(), 2);
    assert_eq!(session.errors[0].severity, ErrorSeverity::Warning);
    assert_eq!(session.errors[1].severity, ErrorSeverity::Critical);
    assert_eq!(session.errors[1].error_code, "FFMPEG_FAILED");
}

/// TC-WF-005: Progress percentage tracks current/total
#[test]
fn tc_wf_005_progress_tracking() {
    let mut session = create_test_session();

    session.update_progress(0, 8, "Retuning segments".to_string());
    assert_eq!(session.progress.percentage, 0.0);

    session.update_progress(4, 8, "Retuning segments".to_string());
    assert!((session.progress.percentage - 50.0).abs() < 0.01);
    assert_eq!(session.progress.current, 4);
    assert_eq!(session.progress.total, 8);

    session.update_progress(8, 8, "Retuning complete".to_string());
    assert!((session.progress.percentage - 100.0).abs() < 0.01);
}

/// TC-WF-006: Stale running sessions are cancelled at startup
#[tokio::test]
async fn tc_wf_006_stale_session_cleanup() {
    // Given: One running and one completed session in the database
    let root = tempfile::TempDir::new().unwrap();
    let db_path = akira_common::config::database_path(root.path());
    let pool = akira_rt::db::init_database_pool(&db_path).await.unwrap();

    let running = create_test_session();
    akira_rt::db::sessions::save_session(&pool, &running)
        .await
        .unwrap();

    let mut completed = create_test_session();
    completed.transition_to(RetuneState::Completed);
    akira_rt::db::sessions::save_session(&pool, &completed)
        .await
        .unwrap();

    // When: Startup cleanup runs
    let cleaned = akira_rt::db::sessions::cleanup_stale_sessions(&pool)
        .await
        .unwrap();

    // Then: Only the running session is cancelled
    assert_eq!(cleaned, 1);
    let reloaded = akira_rt::db::sessions::load_session(&pool, running.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.state, RetuneState::Cancelled);

    let untouched = akira_rt::db::sessions::load_session(&pool, completed.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.state, RetuneState::Completed);
}

/// TC-PIPE-001: A loud burst in quiet audio flags exactly its segment
///
/// Runs the real analysis chain (STFT energy, MFCC delta variance,
/// loudness) on 10 s of synthetic audio with a 1 s noise burst at 4 s.
#[test]
fn tc_pipe_001_loud_burst_flags_its_segment() {
    let sample_rate: u32 = 44_100;
    let params = RetuneParameters::default();
    let duration = 10.0f32;
    let n = (sample_rate as f32 * duration) as usize;

    // Given: Quiet 440 Hz tone with a loud noise burst in [4.0, 5.0)
    let mut samples: Vec<f32> = (0..n)
        .map(|i| {
            0.05 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin()
        })
        .collect();
    let burst = noise(sample_rate as usize, 7);
    let start = 4 * sample_rate as usize;
    for (i, &b) in burst.iter().enumerate() {
        samples[start + i] = 0.9 * b;
    }

    // When: The analysis and classification chain runs
    let stft = Stft::new(params.n_fft, params.hop_length);
    let energy = stft.energy_envelope(&samples);
    let extractor = MfccExtractor::new(sample_rate, params.n_fft, params.n_mels, params.n_mfcc);
    let mfccs = extractor.mfccs(&stft, &samples);
    let deltas = MfccExtractor::delta(&mfccs);
    let delta_variance = MfccExtractor::delta_variance(&deltas);
    let loudness = loudness_dbfs(&samples, params.n_fft, params.hop_length);

    let features = FrameFeatures {
        energy,
        mfcc_delta_variance: delta_variance,
        loudness_dbfs: loudness,
        frame_seconds: params.hop_length as f32 / sample_rate as f32,
        duration_seconds: duration,
    };

    // Monotony detection off so the burst is the only trigger
    let thresholds = DetectorThresholds {
        mfcc_delta_thresh: 0.0,
        ..DetectorThresholds::default()
    };
    let intervals = OverstimDetector::new(thresholds).detect(&features);

    // Then: Flagged time concentrates on the burst
    assert!(!intervals.is_empty());
    let flagged_in_burst: f32 = intervals
        .iter()
        .map(|iv| (iv.end_seconds.min(5.0) - iv.start_seconds.max(4.0)).max(0.0))
        .sum();
    assert!(
        flagged_in_burst > 0.5,
        "burst should be mostly flagged, got {}s",
        flagged_in_burst
    );

    // And: Segment projection flags segment 1 ([4, 8)) but not 0 or 2
    let verdicts = segment_verdicts(
        &intervals,
        duration,
        params.segment_seconds,
        params.segment_flag_ratio,
    );
    assert_eq!(verdicts.len(), 3);
    assert!(!verdicts[0].overstimulating);
    assert!(verdicts[1].overstimulating);
    assert!(!verdicts[2].overstimulating);
}

/// TC-PIPE-002: Repeating audio trips the repetition detector
#[test]
fn tc_pipe_002_repetition_detection() {
    let sample_rate: u32 = 8_000;

    // Given: A 0.7 s noise chunk repeated 6 times
    let chunk = noise((0.7 * sample_rate as f32) as usize, 42);
    let mut samples = Vec::with_capacity(chunk.len() * 6);
    for _ in 0..6 {
        samples.extend_from_slice(&chunk);
    }

    let detector = OverstimDetector::default();

    // Then: Repetition detected on the loop, not on fresh noise
    assert!(detector.detect_repetition(&samples, sample_rate));
    assert!(!detector.detect_repetition(&noise(samples.len(), 99), sample_rate));
}

/// TC-PIPE-003: Retuning softens a flagged segment
#[test]
fn tc_pipe_003_retune_softens_segment() {
    let sample_rate: u32 = 44_100;
    let mut samples = noise(sample_rate as usize * 2, 3);
    for s in &mut samples {
        *s *= 0.9;
    }

    let rms_before = akira_rt::dsp::loudness::rms(&samples);
    retune_segment(&mut samples, sample_rate, &RetuneSettings::default());
    let rms_after = akira_rt::dsp::loudness::rms(&samples);

    // Band-limited and scaled to a tenth; allow headroom for filter gain
    assert!(
        rms_after < rms_before * 0.3,
        "retune should attenuate: {} -> {}",
        rms_before,
        rms_after
    );

    // Edges are faded in
    assert!(samples[0].abs() < 1e-3);
    assert!(samples[samples.len() - 1].abs() < 1e-3);
}
