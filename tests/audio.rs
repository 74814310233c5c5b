//! Audio pipeline integration tests
//!
//! Tests the wire codec, gapless scheduling, interruption, and capture
//! state transitions without requiring audio hardware.

use kisan_gateway::audio::{
    CAPTURE_MIME_TYPE, CaptureController, CaptureState, Clock, PLAYBACK_SAMPLE_RATE, decode_blob,
    encode_blob,
};
use kisan_gateway::dashboard::{UiBridge, UiEvent};
use tokio_test::{assert_err, assert_ok};

mod common;

use common::{generate_silence, generate_sine_samples, manual_scheduler};

#[test]
fn pcm_roundtrip_within_integer_tolerance() {
    let original = generate_sine_samples(440.0, 0.05, 0.8);
    let blob = encode_blob(&original);
    assert_eq!(blob.mime_type, CAPTURE_MIME_TYPE);

    let decoded = decode_blob(&blob.data).unwrap();
    assert_eq!(decoded.len(), original.len());
    for (a, b) in original.iter().zip(&decoded) {
        assert!((a - b).abs() < 1.0 / 16384.0);
    }
}

#[test]
fn empty_samples_encode_to_empty_payload() {
    let blob = encode_blob(&[]);
    assert!(blob.data.is_empty());
    assert!(decode_blob(&blob.data).unwrap().is_empty());
}

#[test]
fn chunks_schedule_back_to_back() {
    let (scheduler, _clock, cursor) = manual_scheduler();

    // Three 100ms chunks
    let chunk = encode_blob(&generate_silence(0.1)).data;
    let duration = 0.1;

    let mut starts = Vec::new();
    for _ in 0..3 {
        starts.push(scheduler.handle_chunk(&chunk).unwrap());
    }

    // Strictly non-decreasing, each start is the prior start plus duration
    for pair in starts.windows(2) {
        assert!(pair[1] >= pair[0]);
        assert!((pair[1] - (pair[0] + duration)).abs() < 1e-9);
    }
    assert_eq!(scheduler.live_count(), 3);
    assert!((*cursor.lock().unwrap() - 0.3).abs() < 1e-9);
}

#[test]
fn late_chunk_schedules_at_current_time() {
    let (scheduler, clock, _cursor) = manual_scheduler();

    let chunk = encode_blob(&generate_silence(0.1)).data;
    scheduler.handle_chunk(&chunk).unwrap();

    // Playback has advanced past the cursor: next chunk starts "now"
    clock.set(0.5);
    let start = scheduler.handle_chunk(&chunk).unwrap();
    assert!((start - 0.5).abs() < 1e-9);
    assert!((scheduler.cursor() - 0.6).abs() < 1e-9);
}

#[test]
fn cursor_never_lags_clock_at_scheduling() {
    let (scheduler, clock, _cursor) = manual_scheduler();
    let chunk = encode_blob(&generate_silence(0.02)).data;

    for i in 0..10 {
        clock.set(f64::from(i) * 0.013);
        let start = scheduler.handle_chunk(&chunk).unwrap();
        assert!(start >= clock.now() - 1e-9);
        assert!(scheduler.cursor() >= start);
    }
}

#[test]
fn interruption_clears_live_set_and_resets_cursor() {
    let (scheduler, clock, cursor) = manual_scheduler();

    let chunk = encode_blob(&generate_sine_samples(440.0, 0.1, 0.3)).data;
    for _ in 0..5 {
        scheduler.handle_chunk(&chunk).unwrap();
    }
    clock.set(0.2);
    assert_eq!(scheduler.live_count(), 5);

    scheduler.interrupt();

    assert_eq!(scheduler.live_count(), 0);
    assert!(*cursor.lock().unwrap() <= clock.now());

    // The next chunk schedules relative to the current time
    let start = scheduler.handle_chunk(&chunk).unwrap();
    assert!((start - 0.2).abs() < 1e-9);
}

#[test]
fn malformed_chunk_is_dropped_without_stopping_the_pipeline() {
    let (scheduler, _clock, _cursor) = manual_scheduler();

    assert_err!(scheduler.handle_chunk("@@not-base64@@"));
    assert_eq!(scheduler.live_count(), 0);
    assert_eq!(scheduler.cursor(), 0.0);

    // Pipeline continues with the next valid chunk
    let chunk = encode_blob(&generate_silence(0.1)).data;
    assert_ok!(scheduler.handle_chunk(&chunk));
    assert_eq!(scheduler.live_count(), 1);
}

#[test]
fn render_mixes_scheduled_samples_and_prune_removes_ended() {
    let (scheduler, clock, _cursor) = manual_scheduler();

    let samples = vec![0.5_f32; (PLAYBACK_SAMPLE_RATE / 10) as usize];
    let chunk = encode_blob(&samples).data;
    scheduler.handle_chunk(&chunk).unwrap();

    // Stereo buffer: mono samples duplicated across both channels
    let mut out = vec![0.0_f32; 64];
    scheduler.render(0.0, &mut out, 2, 1.0);
    assert!((out[0] - 0.5).abs() < 0.01);
    assert!((out[1] - out[0]).abs() < f32::EPSILON);

    // Before the chunk's start nothing plays
    let mut before = vec![1.0_f32; 8];
    scheduler.render(-1.0, &mut before, 1, 1.0);
    assert!(before.iter().all(|s| s.abs() < f32::EPSILON));

    // Natural end removes the chunk from the live set
    clock.set(0.2);
    scheduler.prune(clock.now());
    assert_eq!(scheduler.live_count(), 0);
}

#[test]
fn render_applies_gain() {
    let (scheduler, _clock, _cursor) = manual_scheduler();

    let chunk = encode_blob(&[0.5_f32; 256]).data;
    scheduler.handle_chunk(&chunk).unwrap();

    let mut out = vec![0.0_f32; 16];
    scheduler.render(0.0, &mut out, 1, 0.5);
    assert!((out[0] - 0.25).abs() < 0.01);
}

#[test]
fn stop_twice_is_a_noop() {
    let (ui, mut events) = UiBridge::new();
    let mut capture = CaptureController::new();

    capture.stop(&ui);
    capture.stop(&ui);

    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(!capture.is_recording());
    // Nothing was active, so no status traffic either
    assert!(events.try_recv().is_err());
}

#[test]
fn start_without_prerequisites_reports_status_and_stays_idle() {
    let (ui, mut events) = UiBridge::new();
    let mut capture = CaptureController::new();

    capture.start(None, None, &ui).unwrap();

    assert_eq!(capture.state(), CaptureState::Idle);
    match events.try_recv().unwrap() {
        UiEvent::Status(status) => {
            assert_eq!(status, "Preparation for recording not complete.");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
