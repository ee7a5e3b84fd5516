use super::*;
use serde_json::json;

#[test]
fn parses_hex_rgb_and_rgba() {
    let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
    assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 1.0));

    let c: Color = serde_json::from_value(json!("#C8C8C8B4")).unwrap();
    assert_eq!(c.to_rgba8(), [200, 200, 200, 180]);
}

#[test]
fn rejects_malformed_hex() {
    assert!(serde_json::from_value::<Color>(json!("#fff")).is_err());
    assert!(serde_json::from_value::<Color>(json!("#gg0000")).is_err());
}

#[test]
fn parses_rgba_object_and_array() {
    let c: Color = serde_json::from_value(json!({"r": 0.25, "g": 0.5, "b": 0.75})).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 1.0));

    let c: Color = serde_json::from_value(json!([0.25, 0.5, 0.75, 0.9])).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 0.9));
    assert!(serde_json::from_value::<Color>(json!([0.1, 0.2])).is_err());
}

#[test]
fn parses_hsla_object() {
    let c: Color = serde_json::from_value(json!({"h": 0.0, "s": 1.0, "l": 0.5})).unwrap();
    // Pure red.
    assert_eq!(c.to_rgba8(), [255, 0, 0, 255]);
}

#[test]
fn premul_quantization_respects_alpha() {
    let shadow = Color::from_rgba8(0, 0, 0, 128);
    assert_eq!(shadow.to_rgba8_premul().to_array(), [0, 0, 0, 128]);

    let half_white = Color::from_rgba8(255, 255, 255, 128);
    assert_eq!(half_white.to_rgba8_premul().to_array(), [128, 128, 128, 128]);
}
