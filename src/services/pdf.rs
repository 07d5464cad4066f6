//! Overlay of report text and image onto the first page of a template PDF.

use crate::core::report::ReportText;
use crate::models::Property;
use crate::services::images::ResolvedImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;

const FONT_NAME: &str = "FRpt";
const FONT_BOLD_NAME: &str = "FRptB";
const IMAGE_NAME: &str = "ImRpt";

/// Page coordinates in points, origin bottom-left (US Letter)
mod layout {
    pub const MARGIN_X: f32 = 50.0;
    pub const TITLE_Y: f32 = 735.0;
    pub const TITLE_SIZE: f32 = 20.0;

    pub const IMAGE_X: f32 = 50.0;
    pub const IMAGE_Y: f32 = 430.0;
    pub const IMAGE_MAX_W: f32 = 280.0;
    pub const IMAGE_MAX_H: f32 = 260.0;

    pub const COLUMN_X: f32 = 350.0;
    pub const COLUMN_TOP: f32 = 670.0;
    pub const COLUMN_SPACING: f32 = 25.0;
    pub const COLUMN_SIZE: f32 = 11.0;

    pub const NARRATIVE_TOP: f32 = 395.0;
    pub const BODY_SIZE: f32 = 10.0;
    pub const BODY_LEADING: f32 = 14.0;
    pub const GUST_LEADING: f32 = 16.0;

    pub const FOOTER_TOP: f32 = 90.0;
    pub const FOOTER_SIZE: f32 = 9.0;
    pub const FOOTER_LEADING: f32 = 13.0;
}

/// Longest image edge kept when embedding
const MAX_IMAGE_PIXELS: u32 = 1200;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image could not be embedded: {0}")]
    Image(#[from] image::ImageError),

    #[error("template has no pages")]
    EmptyTemplate,

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders one report per property from a fixed template
pub struct ReportRenderer {
    template: Vec<u8>,
}

impl ReportRenderer {
    pub fn new(template: Vec<u8>) -> Self {
        Self { template }
    }

    pub fn render(&self, property: &Property, image: Option<&ResolvedImage>) -> Result<Vec<u8>, ReportError> {
        let mut doc = Document::load_mem(&self.template)?;
        let page_id = doc
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or(ReportError::EmptyTemplate)?;

        inherit_resources(&mut doc, page_id)?;

        let regular = doc.add_object(font_dictionary("Helvetica"));
        let bold = doc.add_object(font_dictionary("Helvetica-Bold"));
        register_font(&mut doc, page_id, FONT_NAME, regular)?;
        register_font(&mut doc, page_id, FONT_BOLD_NAME, bold)?;

        let mut operations = Vec::new();

        if let Some(image) = image {
            let (xobject, width, height) = image_xobject(&image.bytes)?;
            let xobject_id = doc.add_object(xobject);
            doc.add_xobject(page_id, IMAGE_NAME, xobject_id)?;
            operations.extend(draw_image(width, height));
        }

        let text = ReportText::for_property(property);
        operations.extend(text_operations(&text));

        let content = Content { operations };
        doc.add_page_contents(page_id, content.encode()?)?;

        let mut out = Vec::new();
        doc.save_to(&mut out)?;

        tracing::debug!("Rendered report for {} ({} bytes)", property.property_id, out.len());
        Ok(out)
    }
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Copy resources inherited from the page tree onto the page itself, so adding
/// ours does not hide the template's own fonts and images
fn inherit_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), ReportError> {
    let page = doc.get_dictionary(page_id)?;
    if page.has(b"Resources") {
        return Ok(());
    }

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(node_id) = parent {
        let node = doc.get_dictionary(node_id)?;
        if let Ok(resources) = node.get(b"Resources") {
            let resources = resources.clone();
            doc.get_dictionary_mut(page_id)?.set("Resources", resources);
            return Ok(());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(())
}

fn register_font(doc: &mut Document, page_id: ObjectId, name: &str, font_id: ObjectId) -> Result<(), ReportError> {
    let resources = doc.get_or_create_resources(page_id)?.as_dict_mut()?;
    if !resources.has(b"Font") {
        resources.set("Font", lopdf::Dictionary::new());
    }
    let shared_fonts = match resources.get(b"Font")? {
        Object::Reference(id) => Some(*id),
        _ => None,
    };

    let fonts = match shared_fonts {
        Some(id) => doc.get_dictionary_mut(id)?,
        None => doc
            .get_or_create_resources(page_id)?
            .as_dict_mut()?
            .get_mut(b"Font")?
            .as_dict_mut()?,
    };
    fonts.set(name, Object::Reference(font_id));
    Ok(())
}

/// Decode any supported format into an RGB image XObject
fn image_xobject(bytes: &[u8]) -> Result<(Stream, f32, f32), ReportError> {
    let mut decoded = image::load_from_memory(bytes)?;
    if decoded.width() > MAX_IMAGE_PIXELS || decoded.height() > MAX_IMAGE_PIXELS {
        decoded = decoded.thumbnail(MAX_IMAGE_PIXELS, MAX_IMAGE_PIXELS);
    }

    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    stream.compress()?;

    Ok((stream, width as f32, height as f32))
}

/// Scale into the image box preserving aspect ratio, top-aligned
fn draw_image(width: f32, height: f32) -> Vec<Operation> {
    let scale = (layout::IMAGE_MAX_W / width).min(layout::IMAGE_MAX_H / height);
    let (w, h) = (width * scale, height * scale);
    let y = layout::IMAGE_Y + (layout::IMAGE_MAX_H - h);

    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::from(w),
                Object::from(0.0f32),
                Object::from(0.0f32),
                Object::from(h),
                Object::from(layout::IMAGE_X),
                Object::from(y),
            ],
        ),
        Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn text_operations(text: &ReportText) -> Vec<Operation> {
    let mut ops = Vec::new();

    line(&mut ops, FONT_BOLD_NAME, layout::TITLE_SIZE, layout::MARGIN_X, layout::TITLE_Y, &text.title);

    let mut y = layout::COLUMN_TOP;
    for detail in &text.details {
        line(&mut ops, FONT_NAME, layout::COLUMN_SIZE, layout::COLUMN_X, y, detail);
        y -= layout::COLUMN_SPACING;
    }

    let mut y = layout::NARRATIVE_TOP;
    for narrative in &text.narrative {
        line(&mut ops, FONT_NAME, layout::BODY_SIZE, layout::MARGIN_X, y, narrative);
        y -= layout::BODY_LEADING;
    }

    if !text.gust_lines.is_empty() {
        y -= layout::BODY_LEADING;
        line(&mut ops, FONT_BOLD_NAME, layout::COLUMN_SIZE, layout::MARGIN_X, y, &text.gust_heading);
        for gust in &text.gust_lines {
            y -= layout::GUST_LEADING;
            line(&mut ops, FONT_NAME, layout::BODY_SIZE, layout::MARGIN_X + 10.0, y, gust);
        }
    }

    let mut y = layout::FOOTER_TOP;
    for footer in &text.footer {
        line(&mut ops, FONT_NAME, layout::FOOTER_SIZE, layout::MARGIN_X, y, footer);
        y -= layout::FOOTER_LEADING;
    }

    ops
}

fn line(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::from(size)],
    ));
    ops.push(Operation::new("Td", vec![Object::from(x), Object::from(y)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(win_ansi(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Encode for the standard fonts' WinAnsiEncoding; unmapped characters become '?'
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c as u32 {
        0x00..=0x7F | 0xA0..=0xFF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        // C1 controls have no glyph in WinAnsi
        _ => b'?',
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::images::ImageSource;

    /// One blank Letter page whose resources live on the page tree node
    pub(crate) fn blank_template() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let template_font = doc.add_object(font_dictionary("Times-Roman"));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => dictionary! {
                "Font" => dictionary! { "FTpl" => template_font },
            },
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn shown_text(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_render_places_text_and_keeps_template_fonts() {
        let property = Property {
            property_id: "TX-9".to_string(),
            formatted_address: Some("12 Elm St".to_string()),
            count_gusts: Some(2),
            gust_1: Some(60.0),
            gust_1_date: Some("2023-01-01".to_string()),
            ..Default::default()
        };
        let image = ResolvedImage {
            bytes: png(40, 20),
            source: ImageSource::Placeholder,
        };

        let pdf = ReportRenderer::new(blank_template())
            .render(&property, Some(&image))
            .unwrap();

        let text = shown_text(&pdf);
        assert!(text.contains(&"Wind Damage Assessment Report".to_string()));
        assert!(text.contains(&"Address: 12 Elm St".to_string()));
        assert!(text.contains(&"1. 60.0 mph (01/01/2023)".to_string()));

        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap();
        let resources = match resources {
            Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
            other => other.as_dict().unwrap(),
        };
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"FTpl"));
        assert!(fonts.has(FONT_NAME.as_bytes()));
        assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(IMAGE_NAME.as_bytes()));
    }

    #[test]
    fn test_render_without_image() {
        let pdf = ReportRenderer::new(blank_template())
            .render(&Property::default(), None)
            .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_invalid_template_fails() {
        let result = ReportRenderer::new(b"not a pdf".to_vec()).render(&Property::default(), None);
        assert!(matches!(result, Err(ReportError::Pdf(_))));
    }

    #[test]
    fn test_undecodable_image_fails() {
        let image = ResolvedImage {
            bytes: b"garbage".to_vec(),
            source: ImageSource::Placeholder,
        };
        let result = ReportRenderer::new(blank_template()).render(&Property::default(), Some(&image));
        assert!(matches!(result, Err(ReportError::Image(_))));
    }

    #[test]
    fn test_win_ansi_replaces_wide_chars() {
        assert_eq!(win_ansi("Café ☂"), vec![b'C', b'a', b'f', 0xE9, b' ', b'?']);
    }

    #[test]
    fn test_win_ansi_maps_typographic_punctuation() {
        assert_eq!(
            win_ansi("O\u{2019}Neil \u{201C}A\u{201D} 1\u{2013}2\u{2014}3\u{2026}"),
            vec![b'O', 0x92, b'N', b'e', b'i', b'l', b' ', 0x93, b'A', 0x94, b' ', b'1', 0x96, b'2', 0x97, b'3', 0x85]
        );
        assert_eq!(win_ansi("\u{20AC}5 \u{2122}"), vec![0x80, b'5', b' ', 0x99]);
        assert_eq!(win_ansi("a\u{0085}b\u{009F}"), vec![b'a', b'?', b'b', b'?']);
    }
}
