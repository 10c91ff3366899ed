//! End-to-end check of the classical engine on a rendered glyph image.
//!
//! The page is synthesized (black text on a white background, no skew) so
//! the assertion stays deterministic across machines, unlike a scanned
//! artifact. Needs a local Tesseract installation with the `fra`
//! traineddata plus a DejaVu font, so it runs only on demand.

use ab_glyph::{FontVec, PxScale};
use arfr_ocr::prelude::*;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
];

fn load_font() -> FontVec {
    for path in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                return font;
            }
        }
    }
    panic!("no usable font found; install the DejaVu fonts");
}

#[test]
#[ignore = "requires a local tesseract installation with the fra traineddata and a DejaVu font"]
fn rendered_bonjour_round_trips_through_the_classical_engine() {
    let font = load_font();
    let mut page = RgbImage::from_pixel(600, 200, Rgb([255, 255, 255]));
    draw_text_mut(
        &mut page,
        Rgb([0, 0, 0]),
        40,
        60,
        PxScale::from(72.0),
        &font,
        "Bonjour",
    );

    let engine = create_engine(EngineKind::Tesseract, &OcrConfig::default())
        .expect("classical engine construction is infallible");
    let text = engine
        .extract_text(&DynamicImage::ImageRgb8(page), Language::French, true)
        .expect("extraction succeeds on a clean rendered page");
    assert_eq!(text.trim(), "Bonjour");
}
