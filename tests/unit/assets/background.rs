use super::*;
use std::io::Cursor;

fn canvas(width: u32, height: u32) -> Canvas {
    Canvas { width, height }
}

fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn solid_backdrop_fills_every_pixel() {
    let b = Backdrop::solid(canvas(4, 2), DEFAULT_BACKGROUND_RGBA);
    assert_eq!(b.data().len(), 4 * 2 * 4);
    for px in b.data().chunks_exact(4) {
        assert_eq!(px, &[20, 20, 30, 255]);
    }
}

#[test]
fn image_backdrop_is_scaled_and_darkened() {
    let img = image::RgbaImage::from_pixel(3, 5, image::Rgba([255, 255, 255, 255]));
    let b = Backdrop::from_image_bytes(&png_bytes(img), canvas(8, 6)).unwrap();
    assert_eq!(b.canvas(), canvas(8, 6));
    assert_eq!(b.data().len(), canvas(8, 6).rgba8_len());
    // white under a 100/255 black overlay
    for px in b.data().chunks_exact(4) {
        for c in &px[..3] {
            assert!((154..=156).contains(c), "{px:?}");
        }
        assert!(px[3] >= 254, "{px:?}");
    }
}

#[test]
fn undecodable_image_is_unavailable() {
    let err = Backdrop::from_image_bytes(b"nope", canvas(2, 2)).unwrap_err();
    assert!(matches!(err, LyricframeError::AssetUnavailable(_)));
}

#[test]
fn resolve_falls_back_to_solid() {
    let c = canvas(2, 2);
    let missing = Backdrop::resolve(Some(Path::new("/no/such/background.png")), c);
    let none = Backdrop::resolve(None, c);
    let solid = Backdrop::solid(c, DEFAULT_BACKGROUND_RGBA);
    assert_eq!(missing.data(), solid.data());
    assert_eq!(none.data(), solid.data());
}

#[test]
fn darken_covers_transparent_pixels() {
    let mut px = vec![0u8, 0, 0, 0];
    darken_in_place(&mut px, IMAGE_OVERLAY_ALPHA);
    assert_eq!(px, vec![0, 0, 0, 100]);
}
