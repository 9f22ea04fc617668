use super::*;
use crate::draw::transport::RecordingTransport;
use kurbo::Size;

#[test]
fn draw_call_is_scoped_with_overrides() {
    let mut batch = CommandBatch::new("ctx_drawing", "ctx_display");
    let mut overrides = StyleMap::new();
    overrides.insert(StyleKey::LineWidth, StyleValue::from(3.0));
    batch.draw(
        Primitive::Line {
            x1: 0.0,
            y1: 1.0,
            x2: 2.0,
            y2: 3.0,
        },
        &overrides,
    );

    assert_eq!(
        batch.encode(),
        [
            "ctx_drawing.save();",
            "ctx_drawing.lineWidth = 3;",
            "draw_line(ctx_drawing,0,1,2,3);",
            "ctx_drawing.restore();",
            "flip(ctx_drawing.canvas, ctx_display);",
        ]
        .join("\n")
    );
}

#[test]
fn primitives_keep_documented_argument_order() {
    let mut batch = CommandBatch::new("w", "d");
    let none = StyleMap::new();
    batch.draw(
        Primitive::Ellipse {
            x: 1.0,
            y: 2.0,
            radius_x: 3.0,
            radius_y: 4.0,
            rotation: 0.0,
            start_angle: 0.0,
            end_angle: 6.5,
            counterclockwise: false,
        },
        &none,
    );
    batch.draw(
        Primitive::RoundRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 5.0,
            radii: [1.0, 2.0, 3.0, 4.0],
        },
        &none,
    );
    batch.draw(
        Primitive::Image {
            image_name: "img".into(),
            x: 1.0,
            y: 1.0,
            w: 20.0,
            h: 10.0,
            filter: "opacity(0.2)".into(),
        },
        &none,
    );
    batch.draw(
        Primitive::Text {
            x: 5.0,
            y: 6.0,
            text: "hi".into(),
        },
        &none,
    );

    let script = batch.encode();
    assert!(script.contains("draw_ellipse(w,1,2,3,4,0,0,6.5,false);"));
    assert!(script.contains("draw_roundRect(w,0,0,10,5,[1,2,3,4]);"));
    assert!(script.contains("draw_image(w,img,1,1,20,10,'opacity(0.2)');"));
    assert!(script.contains("draw_text(w,5,6,'hi');"));
}

#[test]
fn style_reads_back_through_save_restore() {
    let mut batch = CommandBatch::new("w", "d");
    batch.set_style("fillStyle", "white").unwrap();
    batch.save();
    batch.set_style("fillStyle", "red").unwrap();
    assert_eq!(
        batch.style(StyleKey::FillStyle),
        Some(&StyleValue::from("red"))
    );
    batch.restore();
    assert_eq!(
        batch.style(StyleKey::FillStyle),
        Some(&StyleValue::from("white"))
    );
}

#[test]
fn unknown_style_key_emits_nothing() {
    let mut batch = CommandBatch::new("w", "d");
    assert!(batch.set_style("colour", "red").is_err());
    assert!(batch.is_empty());
}

#[test]
fn obj_suffix_emits_reference() {
    let mut batch = CommandBatch::new("w", "d");
    batch.radial_gradient(
        "g1",
        [0.0, 0.0, 1.0],
        [0.0, 0.0, 10.0],
        vec![(0.0, "white".into()), (1.0, "black".into())],
    );
    batch.set_style("fillStyleObj", "g1").unwrap();
    let script = batch.encode();
    assert!(script.contains("g1 = w.createRadialGradient(0, 0, 1, 0, 0, 10);"));
    assert!(script.contains("g1.addColorStop(1, 'black');"));
    assert!(script.contains("w.fillStyle = g1;"));
}

#[test]
fn render_sends_once_and_clears() {
    let transport = RecordingTransport::new(Size::new(100.0, 100.0));
    let mut sink = transport.clone();
    let mut batch = CommandBatch::new("w", "d");
    batch.clear();
    batch.render(&mut sink, true).unwrap();
    assert!(batch.is_empty());

    batch.clear();
    batch.render(&mut sink, false).unwrap();
    assert_eq!(batch.len(), 1);

    let payloads = transport.payloads().unwrap();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], "clear(w);\nflip(w.canvas, d);");
}

#[test]
fn failed_submit_keeps_operations() {
    let transport = RecordingTransport::new(Size::new(1.0, 1.0));
    transport
        .with(|r| r.fail_next_submit = Some("socket closed".into()))
        .unwrap();
    let mut sink = transport.clone();
    let mut batch = CommandBatch::new("w", "d");
    batch.clear();
    assert!(batch.render(&mut sink, true).is_err());
    assert_eq!(batch.len(), 1);
}
