use super::*;

#[test]
fn clones_share_one_recording() {
    let recorder = RecordingTransport::new(Size::new(640.0, 480.0));
    let mut boxed: Box<dyn SurfaceTransport> = Box::new(recorder.clone());

    assert_eq!(boxed.surface_size().unwrap(), Size::new(640.0, 480.0));
    assert_eq!(boxed.pointer().unwrap(), None);
    boxed.submit("flip(ctx_drawing.canvas, ctx_display);").unwrap();
    assert_eq!(
        recorder.payloads().unwrap(),
        vec!["flip(ctx_drawing.canvas, ctx_display);"]
    );

    let pointer = PointerState {
        world: Point::new(1.0, 2.0),
        page: Point::new(11.0, 12.0),
        elapsed_ms: 40.0,
    };
    recorder.set_pointer(Some(pointer)).unwrap();
    assert_eq!(boxed.pointer().unwrap(), Some(pointer));
}

#[test]
fn failed_submit_is_not_recorded_and_clears() {
    let recorder = RecordingTransport::new(Size::new(1.0, 1.0));
    let mut t = recorder.clone();
    recorder
        .with(|r| r.fail_next_submit = Some("gone".to_string()))
        .unwrap();

    assert!(matches!(t.submit("a"), Err(LiveCanvasError::Transport(_))));
    t.submit("b").unwrap();
    assert_eq!(recorder.payloads().unwrap(), vec!["b"]);
}

#[test]
fn last_presented_distinguishes_hidden_from_never_shown() {
    let recorder = RecordingTransport::new(Size::new(1.0, 1.0));
    let mut t = recorder.clone();
    assert_eq!(recorder.last_presented(|_| true).unwrap(), None);

    t.present(Panel::Properties, Some("row 7")).unwrap();
    t.present(Panel::Tooltip { at: Point::ZERO }, None).unwrap();
    assert_eq!(
        recorder
            .last_presented(|p| *p == Panel::Properties)
            .unwrap(),
        Some(Some("row 7".to_string()))
    );
    assert_eq!(
        recorder
            .last_presented(|p| matches!(p, Panel::Tooltip { .. }))
            .unwrap(),
        Some(None)
    );
}
