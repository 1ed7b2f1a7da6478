//! End-to-end orchestration tests over the in-memory encoder.

use std::io::Cursor;

use gifforge::{
    ControllerState, EncoderEvent, FailureReason, FrameSnapshot, FrameStore, GifController,
    GifforgeError, GifSettings, InMemoryGifEncoder, SessionEvent, SessionId,
};

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// 2x2 solid sources composited into a 2x2 target come out as exact solid frames.
fn store_with(colors: &[[u8; 4]]) -> FrameStore {
    let mut store = FrameStore::new();
    for &c in colors {
        store.append(png_bytes(2, 2, c)).unwrap();
    }
    store
}

fn settings_2x2() -> GifSettings {
    GifSettings::default().sized_to(2, 2)
}

fn ready_controller() -> GifController<InMemoryGifEncoder> {
    let mut controller = GifController::new(InMemoryGifEncoder::new());
    controller.load_encoder().unwrap();
    controller
}

#[test]
fn invalid_settings_are_rejected_without_state_change() {
    let store = store_with(&[[255, 0, 0, 255]]);
    let mut settings = settings_2x2();
    settings.delay_ms = 5;
    let snapshot = store.snapshot(&settings);

    let mut controller = ready_controller();
    let err = controller.generate(&snapshot).unwrap_err();
    assert!(matches!(err, GifforgeError::InvalidSettings(_)));
    assert_eq!(controller.state(), &ControllerState::Ready);
    assert!(controller.encoder().render_calls().is_empty());
    assert_eq!(controller.progress(), 0.0);
}

#[test]
fn empty_snapshot_is_rejected_without_state_change() {
    let snapshot = FrameSnapshot::from_parts(Vec::new(), settings_2x2());
    let mut controller = ready_controller();
    let err = controller.generate(&snapshot).unwrap_err();
    assert!(matches!(err, GifforgeError::InvalidState(_)));
    assert_eq!(controller.state(), &ControllerState::Ready);
}

#[test]
fn frames_reach_the_encoder_in_snapshot_order() {
    let red = [255, 0, 0, 255];
    let green = [0, 255, 0, 255];
    let blue = [0, 0, 255, 255];
    let mut store = store_with(&[red, green, blue]);

    // Reorder to B, C, A: the encoder must see snapshot order, not append order.
    let ids = store.ids();
    store.reorder(&[ids[1], ids[2], ids[0]]).unwrap();
    let snapshot = store.snapshot(&settings_2x2());

    let mut controller = ready_controller();
    controller.generate(&snapshot).unwrap();

    let frames = controller.encoder().frames();
    assert_eq!(frames.len(), 3);
    for (frame, delay) in frames {
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(*delay, 200);
    }
    assert_eq!(&frames[0].0.data[..4], &green);
    assert_eq!(&frames[1].0.data[..4], &blue);
    assert_eq!(&frames[2].0.data[..4], &red);
}

#[test]
fn one_session_in_flight_and_fresh_sessions_afterwards() {
    let store = store_with(&[[1, 2, 3, 255]]);
    let snapshot = store.snapshot(&settings_2x2());

    let mut controller = ready_controller();
    let first = controller.generate(&snapshot).unwrap();
    assert_eq!(controller.state(), &ControllerState::Encoding);

    let err = controller.generate(&snapshot).unwrap_err();
    assert!(matches!(err, GifforgeError::InvalidState(_)));
    assert_eq!(controller.state(), &ControllerState::Encoding);

    controller.pump();
    assert_eq!(controller.state(), &ControllerState::Completed);
    assert_eq!(controller.progress(), 1.0);
    assert!(controller.artifact().unwrap().starts_with(b"GIF89a"));

    let second = controller.generate(&snapshot).unwrap();
    assert!(second > first);
}

#[test]
fn stale_session_events_produce_no_observable_change() {
    let store = store_with(&[[9, 9, 9, 255]]);
    let snapshot = store.snapshot(&settings_2x2());

    let mut encoder = InMemoryGifEncoder::new();
    encoder.emit_finished = false;
    let mut controller = GifController::new(encoder);
    controller.load_encoder().unwrap();
    let session = controller.generate(&snapshot).unwrap();

    let tx = controller.event_sender();
    tx.send(SessionEvent {
        session: SessionId(999),
        event: EncoderEvent::Progress(0.7),
    })
    .unwrap();
    tx.send(SessionEvent {
        session: SessionId(999),
        event: EncoderEvent::Finished(vec![1, 2, 3]),
    })
    .unwrap();
    controller.pump();

    assert_eq!(controller.state(), &ControllerState::Encoding);
    assert_eq!(controller.progress(), 0.0);
    assert!(controller.artifact().is_none());

    // The live session's events still apply.
    tx.send(SessionEvent {
        session,
        event: EncoderEvent::Progress(0.4),
    })
    .unwrap();
    controller.pump();
    assert_eq!(controller.progress(), 0.4);

    tx.send(SessionEvent {
        session,
        event: EncoderEvent::Finished(b"GIF89a-live".to_vec()),
    })
    .unwrap();
    controller.pump();
    assert_eq!(controller.state(), &ControllerState::Completed);
}

#[test]
fn latest_progress_value_is_republished() {
    let store = store_with(&[[0, 0, 0, 255]]);
    let snapshot = store.snapshot(&settings_2x2());

    let mut encoder = InMemoryGifEncoder::new();
    encoder.emit_finished = false;
    encoder.progress_script = vec![0.2, 0.5, 0.9];
    let mut controller = GifController::new(encoder);
    controller.load_encoder().unwrap();
    controller.generate(&snapshot).unwrap();
    controller.pump();

    assert_eq!(controller.progress(), 0.9);
    assert_eq!(controller.state(), &ControllerState::Encoding);
}

#[test]
fn decode_failure_aborts_the_session_and_keeps_the_previous_artifact() {
    let good = store_with(&[[10, 10, 10, 255]]);
    let snapshot = good.snapshot(&settings_2x2());

    let mut controller = ready_controller();
    controller.generate(&snapshot).unwrap();
    controller.pump();
    let artifact_before = controller.artifact().unwrap();

    // A truncated PNG passes the upload probe but fails to decode mid-session.
    let mut bad_store = FrameStore::new();
    bad_store.append(png_bytes(2, 2, [1, 1, 1, 255])).unwrap();
    bad_store
        .append(png_bytes(8, 8, [2, 2, 2, 255])[..24].to_vec())
        .unwrap();
    let bad_snapshot = bad_store.snapshot(&settings_2x2());

    let err = controller.generate(&bad_snapshot).unwrap_err();
    assert!(matches!(err, GifforgeError::DecodeFailure(_)));
    assert!(matches!(
        controller.state(),
        ControllerState::Failed(FailureReason::Decode(_))
    ));
    assert_eq!(controller.encoder().abort_count(), 1);
    assert_eq!(
        controller.artifact().unwrap().as_slice(),
        artifact_before.as_slice()
    );

    // The controller stays usable: a fresh generate supersedes the failure.
    controller.generate(&snapshot).unwrap();
    controller.pump();
    assert_eq!(controller.state(), &ControllerState::Completed);
}

#[test]
fn encoder_error_event_fails_the_session_but_keeps_the_artifact() {
    let store = store_with(&[[7, 7, 7, 255]]);
    let snapshot = store.snapshot(&settings_2x2());

    let mut controller = ready_controller();
    controller.generate(&snapshot).unwrap();
    controller.pump();
    let artifact_before = controller.artifact().unwrap();

    controller.encoder_mut().fail_render = Some("palette exploded".to_owned());
    controller.generate(&snapshot).unwrap();
    controller.pump();

    match controller.state() {
        ControllerState::Failed(FailureReason::Encoding(msg)) => {
            assert!(msg.contains("palette exploded"));
        }
        other => panic!("expected encoding failure, got {other:?}"),
    }
    assert_eq!(
        controller.artifact().unwrap().as_slice(),
        artifact_before.as_slice()
    );
}

#[test]
fn resource_failure_disables_generate_until_explicit_reload() {
    let store = store_with(&[[3, 3, 3, 255]]);
    let snapshot = store.snapshot(&settings_2x2());

    let mut encoder = InMemoryGifEncoder::new();
    encoder.fail_load = true;
    let mut controller = GifController::new(encoder);

    assert!(controller.load_encoder().is_err());
    assert!(matches!(
        controller.state(),
        ControllerState::Failed(FailureReason::Resource(_))
    ));
    assert!(matches!(
        controller.generate(&snapshot),
        Err(GifforgeError::ResourceUnavailable(_))
    ));

    controller.encoder_mut().fail_load = false;
    controller.load_encoder().unwrap();
    assert_eq!(controller.state(), &ControllerState::Ready);
    controller.generate(&snapshot).unwrap();
    controller.pump();
    assert_eq!(controller.state(), &ControllerState::Completed);
}

#[test]
fn generate_before_load_is_an_invalid_state() {
    let store = store_with(&[[5, 5, 5, 255]]);
    let snapshot = store.snapshot(&settings_2x2());
    let mut controller = GifController::new(InMemoryGifEncoder::new());
    assert!(matches!(
        controller.generate(&snapshot),
        Err(GifforgeError::InvalidState(_))
    ));
    assert_eq!(controller.state(), &ControllerState::Idle);
}

#[test]
fn clear_revokes_the_artifact_and_is_idempotent() {
    let store = store_with(&[[8, 8, 8, 255]]);
    let snapshot = store.snapshot(&settings_2x2());

    let mut controller = ready_controller();
    controller.generate(&snapshot).unwrap();
    controller.pump();
    assert!(controller.artifact().is_some());
    let name = controller.artifact_file_name();
    assert!(name.starts_with("gifforge-") && name.ends_with(".gif"));

    controller.clear();
    assert!(controller.artifact().is_none());
    assert_eq!(controller.progress(), 0.0);
    // The state machine is untouched and a second clear is harmless.
    assert_eq!(controller.state(), &ControllerState::Completed);
    controller.clear();

    controller.generate(&snapshot).unwrap();
    controller.pump();
    assert!(controller.artifact().is_some());
}

#[test]
fn completing_a_new_session_supersedes_the_old_artifact() {
    let store = store_with(&[[4, 4, 4, 255]]);
    let one = store.snapshot(&settings_2x2());
    let mut two_store = store_with(&[[4, 4, 4, 255], [6, 6, 6, 255]]);
    two_store.append(png_bytes(2, 2, [5, 5, 5, 255])).unwrap();
    let two = two_store.snapshot(&settings_2x2());

    let mut controller = ready_controller();
    controller.generate(&one).unwrap();
    controller.pump();
    let first = controller.artifact().unwrap();

    controller.generate(&two).unwrap();
    controller.pump();
    let second = controller.artifact().unwrap();
    // The placeholder artifact encodes the frame count, so the payloads differ.
    assert_ne!(first.as_slice(), second.as_slice());
}
