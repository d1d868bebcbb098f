//! Paginated document (`.pdf`) adapter.
//!
//! Extraction yields one segment per text block and every decodable image
//! XObject of every page. The writer lays kept segments out top to bottom in
//! Helvetica on A4 pages, followed by the kept images.

use super::layout::{
    page_resources, resolve, resolve_dict, xobject_subtype, LayoutAnalyzer, MAX_FORM_DEPTH,
};
use super::FormatAdapter;
use crate::detect::{pdf_version_from_bytes, DocumentType};
use crate::error::{Error, Result};
use crate::model::{ExtractedImage, Extraction, ImageSource};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A4 page width in points.
pub const PAGE_WIDTH: f32 = 595.0;
/// A4 page height in points.
pub const PAGE_HEIGHT: f32 = 842.0;
/// Margin on every side, in points.
pub const MARGIN: f32 = 50.0;
/// Distance between baselines, in points.
pub const LINE_HEIGHT: f32 = 15.0;
/// Body font size, in points.
pub const FONT_SIZE: f32 = 11.0;
/// Widest image drawn, in points.
pub const MAX_IMAGE_WIDTH: f32 = 500.0;
/// Tallest image drawn, in points.
pub const MAX_IMAGE_HEIGHT: f32 = 300.0;

/// Extra advance after each segment, in line heights.
const SEGMENT_GAP_LINES: f32 = 1.5;

const FONT_RESOURCE: &str = "F1";

/// Adapter for `.pdf` files.
pub struct PdfAdapter {
    whitespace: Regex,
}

impl PdfAdapter {
    /// Create a new PDF adapter.
    pub fn new() -> Self {
        Self {
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Extract from an in-memory PDF.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<Extraction> {
        pdf_version_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(Error::PdfParse(
                "encrypted documents are not supported".to_string(),
            ));
        }

        let analyzer = LayoutAnalyzer::new(&doc);
        let mut extraction = Extraction::new();

        for (page_num, page_id) in doc.get_pages() {
            for block in self.page_texts(&doc, &analyzer, page_num) {
                let text = self.clean_block(&block);
                if !text.is_empty() {
                    extraction.push_text(text);
                }
            }
            self.extract_page_images(&doc, page_id, page_num, &mut extraction);
        }

        log::debug!(
            "extracted {} blocks and {} images ({} skipped)",
            extraction.segments.len(),
            extraction.images.len(),
            extraction.skipped_images
        );
        Ok(extraction)
    }

    /// Collapse whitespace runs to single spaces and trim.
    pub fn clean_block(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }

    /// Raw block texts of a page, falling back to the page's plain text.
    fn page_texts(
        &self,
        doc: &LopdfDocument,
        analyzer: &LayoutAnalyzer<'_>,
        page_num: u32,
    ) -> Vec<String> {
        match analyzer.extract_page_blocks(page_num) {
            Ok(blocks) => blocks
                .iter()
                .filter(|b| !b.is_empty())
                .map(|b| b.text())
                .collect(),
            Err(e) => {
                log::warn!(
                    "Layout analysis failed on page {}, using plain text: {}",
                    page_num,
                    e
                );
                match doc.extract_text(&[page_num]) {
                    Ok(text) => vec![text],
                    Err(e) => {
                        log::warn!("Could not extract text from page {}: {}", page_num, e);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn extract_page_images(
        &self,
        doc: &LopdfDocument,
        page_id: ObjectId,
        page_num: u32,
        extraction: &mut Extraction,
    ) {
        if let Some(resources) = page_resources(doc, page_id) {
            let mut walk = ImageWalk {
                page: page_num,
                index: 0,
                visited: HashSet::new(),
            };
            walk.collect(doc, resources, 0, extraction);
        }
    }

    /// Build the PDF bytes for the given content.
    pub fn build_document(&self, segments: &[String], images: &[DynamicImage]) -> Result<Vec<u8>> {
        let mut doc = self.layout(segments, images)?;
        let mut data = Vec::new();
        doc.save_to(&mut data)?;
        Ok(data)
    }

    fn layout(&self, segments: &[String], images: &[DynamicImage]) -> Result<LopdfDocument> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut pages = PageLayout::new();

        for segment in segments.iter().filter(|s| !s.trim().is_empty()) {
            let text = segment.trim_end_matches(['\r', '\n']);
            for line in text.split('\n').flat_map(wrap_line) {
                pages.ensure_room(LINE_HEIGHT);
                if !line.trim().is_empty() {
                    pages.text(&line);
                }
                pages.advance(LINE_HEIGHT);
            }
            pages.advance(LINE_HEIGHT * SEGMENT_GAP_LINES);
        }

        for (i, img) in images.iter().enumerate() {
            if img.width() == 0 || img.height() == 0 {
                continue;
            }
            let name = format!("Im{}", i + 1);
            let xobject_id = doc.add_object(image_xobject(img)?);
            let (width, height) = image_box(img.width(), img.height());

            pages.ensure_room(MAX_IMAGE_HEIGHT);
            pages.image(&name, xobject_id, width, height);
            pages.advance(height + LINE_HEIGHT);
        }

        let mut kids = Vec::new();
        for page in pages.finish() {
            let content = Content {
                operations: page.operations,
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

            let mut xobjects = Dictionary::new();
            for (name, id) in page.xobjects {
                xobjects.set(name, Object::Reference(id));
            }

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(PAGE_WIDTH),
                    Object::Real(PAGE_HEIGHT),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_RESOURCE => font_id },
                    "XObject" => xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Ok(doc)
    }
}

impl Default for PdfAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for PdfAdapter {
    fn document_type(&self) -> DocumentType {
        DocumentType::Paginated
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let data = fs::read(path)?;
        self.extract_bytes(&data)
    }

    fn write(&self, segments: &[String], images: &[DynamicImage], path: &Path) -> Result<()> {
        let mut doc = self.layout(segments, images)?;
        let mut writer = BufWriter::new(fs::File::create(path)?);
        doc.save_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Operations and image resources of one output page.
#[derive(Default)]
struct PageContent {
    operations: Vec<Operation>,
    xobjects: Vec<(String, ObjectId)>,
}

/// Top-down cursor over a growing list of pages.
struct PageLayout {
    pages: Vec<PageContent>,
    /// Distance of the cursor from the top edge
    y: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: vec![PageContent::default()],
            y: MARGIN,
        }
    }

    fn current(&mut self) -> &mut PageContent {
        if self.pages.is_empty() {
            self.pages.push(PageContent::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Open a new page unless `height` more points fit above the bottom margin.
    fn ensure_room(&mut self, height: f32) {
        if self.y + height > PAGE_HEIGHT - MARGIN {
            self.pages.push(PageContent::default());
            self.y = MARGIN;
        }
    }

    fn advance(&mut self, height: f32) {
        self.y += height;
    }

    fn text(&mut self, line: &str) {
        let baseline = PAGE_HEIGHT - self.y;
        self.current().operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    Object::Real(FONT_SIZE),
                ],
            ),
            Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(baseline)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn image(&mut self, name: &str, id: ObjectId, width: f32, height: f32) {
        let bottom = PAGE_HEIGHT - self.y - height;
        let page = self.current();
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height),
                    Object::Real(MARGIN),
                    Object::Real(bottom),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        page.xobjects.push((name.to_string(), id));
    }

    fn finish(self) -> Vec<PageContent> {
        self.pages
    }
}

/// Drawn size of an image: as wide as the text area allows (at most 500 pt),
/// at most 300 pt tall, aspect ratio preserved.
fn image_box(width: u32, height: u32) -> (f32, f32) {
    let max_width = (PAGE_WIDTH - 2.0 * MARGIN).min(MAX_IMAGE_WIDTH);
    let aspect = height as f32 / width as f32;
    let drawn_height = max_width * aspect;
    if drawn_height <= MAX_IMAGE_HEIGHT {
        (max_width, drawn_height)
    } else {
        (MAX_IMAGE_HEIGHT / aspect, MAX_IMAGE_HEIGHT)
    }
}

/// Flate-compressed image XObject with 8-bit gray or RGB samples.
fn image_xobject(img: &DynamicImage) -> Result<Stream> {
    let (color_space, samples) = match img {
        DynamicImage::ImageLuma8(gray) => ("DeviceGray", gray.as_raw().clone()),
        other => ("DeviceRGB", other.to_rgb8().into_raw()),
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&samples)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => img.width() as i64,
        "Height" => img.height() as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8i64,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Approximate Helvetica advance width in thousandths of an em.
fn glyph_width(c: char) -> f32 {
    match c {
        '\'' => 191.0,
        'i' | 'j' | 'l' => 222.0,
        ' ' | '.' | ',' | ':' | ';' | '!' | '|' | 'I' | 'f' | 't' | '/' | '[' | ']' => 278.0,
        'r' | '(' | ')' | '-' => 333.0,
        'm' | 'M' => 833.0,
        'w' => 722.0,
        'W' => 944.0,
        c if c.is_ascii_uppercase() => 667.0,
        _ => 556.0,
    }
}

fn text_width(text: &str) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * FONT_SIZE / 1000.0
}

/// Greedy word wrap to the text area width. Overlong words are split.
fn wrap_line(line: &str) -> Vec<String> {
    let max_width = PAGE_WIDTH - 2.0 * MARGIN;
    let line = line.replace('\t', "    ");
    if text_width(&line) <= max_width {
        return vec![line];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        for c in word.chars() {
            current.push(c);
            if text_width(&current) > max_width {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode text for a WinAnsi font; other characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// Image XObjects reachable from a page, including those inside forms.
struct ImageWalk {
    page: u32,
    index: usize,
    visited: HashSet<ObjectId>,
}

impl ImageWalk {
    fn collect(
        &mut self,
        doc: &LopdfDocument,
        resources: &Dictionary,
        depth: usize,
        extraction: &mut Extraction,
    ) {
        let xobjects = match resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
        {
            Some(dict) => dict,
            None => return,
        };

        for (_, obj) in xobjects.iter() {
            let id = match obj.as_reference() {
                Ok(id) => id,
                Err(_) => continue,
            };
            if !self.visited.insert(id) {
                continue;
            }
            let stream = match doc.get_object(id) {
                Ok(Object::Stream(stream)) => stream,
                _ => continue,
            };

            match xobject_subtype(stream) {
                Some(b"Image") => {}
                Some(b"Form") if depth < MAX_FORM_DEPTH => {
                    if let Some(form_resources) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|r| resolve_dict(doc, r))
                    {
                        self.collect(doc, form_resources, depth + 1, extraction);
                    }
                    continue;
                }
                _ => continue,
            }

            let is_mask = stream
                .dict
                .get(b"ImageMask")
                .and_then(|m| m.as_bool())
                .unwrap_or(false);
            if is_mask {
                continue;
            }

            let source = ImageSource::Page {
                page: self.page,
                index: self.index,
            };
            self.index += 1;
            match decode_image_stream(doc, stream) {
                Ok(img) => {
                    let img = match img {
                        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
                        other => DynamicImage::ImageRgb8(other.to_rgb8()),
                    };
                    extraction.push_image(ExtractedImage::new(img, source));
                }
                Err(e) => {
                    log::warn!("Could not process {}: {}", source, e);
                    extraction.skip_image();
                }
            }
        }
    }
}

fn decode_err(msg: impl Into<String>) -> Error {
    Error::DecodeFailure(msg.into())
}

fn filter_names(doc: &LopdfDocument, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of color components of an image color space.
fn color_components(doc: &LopdfDocument, color_space: &Object) -> Result<usize> {
    match resolve(doc, color_space) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
            b"DeviceCMYK" | b"CMYK" => Ok(4),
            other => Err(decode_err(format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|o| o.as_name().ok()).unwrap_or_default();
            match family {
                b"ICCBased" => {
                    let n = items
                        .get(1)
                        .map(|o| resolve(doc, o))
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").ok())
                        .and_then(|n| n.as_i64().ok())
                        .ok_or_else(|| decode_err("ICC profile without component count"))?;
                    Ok(n as usize)
                }
                b"CalGray" => Ok(1),
                b"CalRGB" => Ok(3),
                other => Err(decode_err(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(decode_err("missing color space")),
    }
}

/// Decode an image XObject into a pixel buffer.
fn decode_image_stream(doc: &LopdfDocument, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let filters = filter_names(doc, dict);

    match filters.last().map(|f| f.as_slice()) {
        Some(b"DCTDecode") | Some(b"DCT") if filters.len() == 1 => {
            return Ok(image::load_from_memory_with_format(
                &stream.content,
                ImageFormat::Jpeg,
            )?);
        }
        Some(b"FlateDecode") | Some(b"Fl") | Some(b"LZWDecode") | Some(b"LZW") | None => {}
        Some(other) => {
            return Err(decode_err(format!(
                "unsupported image filter {}",
                String::from_utf8_lossy(other)
            )))
        }
    }

    let dimension = |key: &[u8]| -> Result<u32> {
        dict.get(key)
            .ok()
            .and_then(|v| resolve(doc, v).as_i64().ok())
            .filter(|v| *v > 0)
            .map(|v| v as u32)
            .ok_or_else(|| decode_err(format!("missing {}", String::from_utf8_lossy(key))))
    };
    let width = dimension(b"Width")?;
    let height = dimension(b"Height")?;

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return Err(decode_err(format!("unsupported {} bits per component", bits)));
    }

    let color_space = dict
        .get(b"ColorSpace")
        .map_err(|_| decode_err("missing color space"))?;
    let components = color_components(doc, color_space)?;

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| decode_err(e.to_string()))?
    };

    let pixel_count = width as usize * height as usize;
    let expected = pixel_count * components;
    if samples.len() < expected {
        return Err(decode_err(format!(
            "expected {} bytes of samples, found {}",
            expected,
            samples.len()
        )));
    }
    let samples = &samples[..expected];

    let img = match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(samples)).map(DynamicImage::ImageRgb8),
        n => return Err(decode_err(format!("unsupported {} color components", n))),
    };
    img.ok_or_else(|| decode_err("sample buffer does not match image size"))
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(samples.len() / 4 * 3);
    for px in samples.chunks_exact(4) {
        let k = 255 - px[3] as u32;
        for &c in &px[..3] {
            rgb.push(((255 - c as u32) * k / 255) as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_image_box() {
        // Wide image: full text width
        assert_eq!(image_box(990, 198), (495.0, 99.0));
        // Tall image: capped at 300 pt, width shrinks
        assert_eq!(image_box(100, 200), (150.0, 300.0));
    }

    #[test]
    fn test_wrap_line() {
        assert_eq!(wrap_line("short line"), vec!["short line"]);

        let long = "word ".repeat(60);
        let wrapped = wrap_line(long.trim());
        assert!(wrapped.len() > 1);
        for line in &wrapped {
            assert!(text_width(line) <= PAGE_WIDTH - 2.0 * MARGIN);
        }
        assert_eq!(wrapped.join(" "), long.trim());
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("café ’"), vec![b'c', b'a', b'f', 0xE9, b' ', 0x92]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
    }

    #[test]
    fn test_round_trip() {
        let adapter = PdfAdapter::new();
        let segments = vec![
            "First paragraph of text.\n".to_string(),
            "\n".to_string(),
            "Second paragraph.\n".to_string(),
            "Third one, with a longer sentence that still fits on one line.\n".to_string(),
        ];
        let images = vec![
            DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([10, 20, 30]))),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([128]))),
        ];

        let data = adapter.build_document(&segments, &images).unwrap();
        let extraction = adapter.extract_bytes(&data).unwrap();

        assert_eq!(
            extraction.texts(),
            vec![
                "First paragraph of text.",
                "Second paragraph.",
                "Third one, with a longer sentence that still fits on one line.",
            ]
        );
        assert_eq!(extraction.images.len(), 2);
        assert_eq!(extraction.skipped_images, 0);

        let first = &extraction.images[0];
        assert_eq!((first.width(), first.height()), (40, 20));
        assert_eq!(first.image.to_rgb8().get_pixel(3, 3), &Rgb([10, 20, 30]));
        assert!(matches!(extraction.images[1].image, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_many_segments_span_pages() {
        let adapter = PdfAdapter::new();
        let segments: Vec<String> = (0..60).map(|i| format!("Segment number {}\n", i)).collect();

        let data = adapter.build_document(&segments, &[]).unwrap();
        let doc = LopdfDocument::load_mem(&data).unwrap();
        assert!(doc.get_pages().len() > 1);

        let extraction = adapter.extract_bytes(&data).unwrap();
        assert_eq!(extraction.segments.len(), 60);
        assert_eq!(extraction.segments[59].text, "Segment number 59");
    }

    /// A page whose only content draws a form holding text and an image.
    fn form_wrapped_pdf() -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2_i64,
                "Height" => 2_i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            vec![200, 10, 10, 200, 10, 10, 10, 200, 10, 10, 10, 200],
        ));
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => [0, 0, 300, 100].map(Object::Integer).to_vec(),
                "Matrix" => [1, 0, 0, 1, 50, 600].map(Object::Integer).to_vec(),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => dictionary! { "Im1" => image_id },
                },
            },
            b"BT /F1 12 Tf 10 50 Td (Text inside a form) Tj ET q 20 0 0 20 10 10 cm /Im1 Do Q"
                .to_vec(),
        ));
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q /Fm1 Do Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => [0, 0, 595, 842].map(Object::Integer).to_vec(),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Fm1" => form_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    #[test]
    fn test_form_xobject_content_extracted() {
        let extraction = PdfAdapter::new().extract_bytes(&form_wrapped_pdf()).unwrap();

        assert_eq!(extraction.texts(), vec!["Text inside a form"]);
        assert_eq!(extraction.images.len(), 1);
        assert_eq!(extraction.skipped_images, 0);

        let image = &extraction.images[0];
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.source, ImageSource::Page { page: 1, index: 0 });
        assert_eq!(image.image.to_rgb8().get_pixel(0, 0), &Rgb([200, 10, 10]));
    }

    #[test]
    fn test_form_spans_shifted_by_matrix() {
        let data = form_wrapped_pdf();
        let doc = LopdfDocument::load_mem(&data).unwrap();
        let spans = LayoutAnalyzer::new(&doc).extract_page_spans(1).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].x, spans[0].y), (60.0, 650.0));
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = PdfAdapter::new().extract_bytes(b"hello").unwrap_err();
        assert!(matches!(err, Error::PdfParse(_)));
    }

    #[test]
    fn test_clean_block() {
        let adapter = PdfAdapter::new();
        assert_eq!(adapter.clean_block("  a\n\tb   c "), "a b c");
    }
}
