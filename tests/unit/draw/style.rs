use super::*;

#[test]
fn parses_known_keys_and_obj_suffix() {
    assert_eq!(StyleKey::parse("font").unwrap(), (StyleKey::Font, false));
    assert_eq!(
        StyleKey::parse("fillStyleObj").unwrap(),
        (StyleKey::FillStyle, true)
    );
}

#[test]
fn rejects_unknown_keys() {
    for bad in ["colour", "fill", "Obj", "fontObjObj", "radius"] {
        let err = StyleKey::parse(bad).unwrap_err();
        assert!(
            matches!(err, LiveCanvasError::MalformedStyleKey(ref k) if k == bad),
            "{bad}"
        );
    }
}

#[test]
fn values_encode_for_the_surface() {
    assert_eq!(StyleValue::from(2.0).encode(), "2");
    assert_eq!(StyleValue::from(0.5).encode(), "0.5");
    assert_eq!(StyleValue::from("it's").encode(), "'it\\'s'");
    assert_eq!(StyleValue::object("grad1").encode(), "grad1");
}

#[test]
fn rgba_decodes_and_attenuates() {
    let c = Rgba::decode(" rgba(100, 200, 50, 1) ");
    assert_eq!(c, Rgba::new(100.0, 200.0, 50.0, 1.0));
    let glow = c.attenuate([0.5, 0.5, 0.5, 0.25]);
    assert_eq!(glow.to_string(), "rgba(50, 100, 25, 0.25)");
}

#[test]
fn non_rgba_colors_decode_transparent() {
    assert_eq!(Rgba::decode("red"), Rgba::TRANSPARENT);
    assert_eq!(Rgba::decode("rgba(1, 2, x, 4)"), Rgba::TRANSPARENT);
    assert_eq!(Rgba::decode("rgba(1, 2, 3)"), Rgba::TRANSPARENT);
}
