//! WordprocessingML (`.docx`) adapter.
//!
//! Extraction reads the top-level body paragraphs of `word/document.xml`
//! and every image part referenced from the document relationships.
//! Output is a minimal package: one paragraph per kept segment followed by
//! one inline picture per kept image.

use super::FormatAdapter;
use crate::detect::{is_zip_bytes, DocumentType};
use crate::error::{Error, Result};
use crate::model::{ExtractedImage, Extraction, ImageSource};
use image::{DynamicImage, ImageFormat};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

// Letter page with one-inch margins, in twentieths of a point.
const SECTION_XML: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

/// English Metric Units per pixel at 96 DPI.
const EMU_PER_PIXEL: u64 = 9525;

/// Widest picture written, in EMU (6 inches).
const MAX_PICTURE_WIDTH_EMU: u64 = 6 * 914_400;

/// Largest buffer reserved up front for a part, whatever its header claims.
const MAX_PART_PREALLOC: u64 = 64 << 20;

/// Adapter for `.docx` files.
#[derive(Debug, Clone, Default)]
pub struct DocxAdapter;

impl DocxAdapter {
    /// Create a new DOCX adapter.
    pub fn new() -> Self {
        Self
    }

    /// Extract from any seekable ZIP source.
    pub fn extract_reader<R: Read + Seek>(&self, mut reader: R) -> Result<Extraction> {
        let start = reader.stream_position()?;
        let mut magic = Vec::with_capacity(4);
        (&mut reader).take(4).read_to_end(&mut magic)?;
        if !is_zip_bytes(&magic) {
            return Err(Error::Docx("not a DOCX package".to_string()));
        }
        reader.seek(SeekFrom::Start(start))?;

        let mut archive = ZipArchive::new(reader)?;

        let document_xml = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| Error::Docx(format!("missing part {}", DOCUMENT_PART)))?;
        let mut extraction = Extraction::new();
        for paragraph in parse_paragraphs(&String::from_utf8_lossy(&document_xml))? {
            extraction.push_text(paragraph);
        }

        let rels = match read_part(&mut archive, DOCUMENT_RELS_PART)? {
            Some(data) => parse_relationships(&String::from_utf8_lossy(&data))?,
            None => Vec::new(),
        };

        for rel in rels.iter().filter(|r| !r.external && r.target.contains("image")) {
            let part = resolve_target(&rel.target);
            let data = read_part(&mut archive, &part)?;
            let source = ImageSource::Part(part);
            let data = match data {
                Some(data) => data,
                None => {
                    log::warn!("Image part {} referenced by {} is missing", source, rel.id);
                    extraction.skip_image();
                    continue;
                }
            };

            match image::load_from_memory(&data) {
                Ok(img) => extraction.push_image(ExtractedImage::new(img, source)),
                Err(e) => {
                    log::warn!("Could not process {}: {}", source, e);
                    extraction.skip_image();
                }
            }
        }

        Ok(extraction)
    }

    /// Build the package bytes for the given content.
    pub fn build_package(&self, segments: &[String], images: &[DynamicImage]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        self.write_package(&mut zip, segments, images)?;
        Ok(zip.finish()?.into_inner())
    }

    fn write_package<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        segments: &[String],
        images: &[DynamicImage],
    ) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS_XML.as_bytes())?;

        let mut body = String::new();
        for segment in segments.iter().filter(|s| !s.trim().is_empty()) {
            body.push_str(&paragraph_xml(segment));
        }

        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for (i, img) in images.iter().enumerate() {
            let n = i + 1;
            let rel_id = format!("rIdImg{}", n);
            let png = encode_png(img)?;

            zip.start_file(format!("word/media/image{}.png", n), options)?;
            zip.write_all(&png)?;

            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="media/image{}.png"/>"#,
                rel_id, REL_IMAGE, n
            ));
            body.push_str(&picture_xml(n, &rel_id, img.width(), img.height()));
        }
        rels.push_str("</Relationships>");

        zip.start_file(DOCUMENT_RELS_PART, options)?;
        zip.write_all(rels.as_bytes())?;

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}" xmlns:r="{}" xmlns:wp="{}" xmlns:a="{}" xmlns:pic="{}"><w:body>{}{}</w:body></w:document>"#,
            NS_W, NS_R, NS_WP, NS_A, NS_PIC, body, SECTION_XML
        );
        zip.start_file(DOCUMENT_PART, options)?;
        zip.write_all(document.as_bytes())?;

        Ok(())
    }
}

impl FormatAdapter for DocxAdapter {
    fn document_type(&self) -> DocumentType {
        DocumentType::RichText
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let file = File::open(path)?;
        self.extract_reader(file)
    }

    fn write(&self, segments: &[String], images: &[DynamicImage], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut zip = ZipWriter::new(file);
        self.write_package(&mut zip, segments, images)?;
        zip.finish()?;
        Ok(())
    }
}

/// One entry of `document.xml.rels`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    target: String,
    external: bool,
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(capacity_hint(file.size()));
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// Preallocation for a part whose header declares `declared` bytes.
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PART_PREALLOC) as usize
}

/// Resolve a relationship target against the `word/` directory.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if let Some(parent) = target.strip_prefix("../") {
        parent.to_string()
    } else {
        format!("word/{}", target)
    }
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Docx(e.to_string())
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, b"Id")?.unwrap_or_default();
                let target = attribute(&e, b"Target")?.unwrap_or_default();
                let external = attribute(&e, b"TargetMode")?
                    .map(|m| m.eq_ignore_ascii_case("external"))
                    .unwrap_or(false);
                rels.push(Relationship {
                    id,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Text of every top-level body paragraph, in order, including empty ones.
///
/// Paragraphs nested in tables or text boxes are not segments.
fn parse_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();

    let mut in_body = false;
    let mut table_depth = 0usize;
    let mut para_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;
    let mut current = String::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:body" => in_body = true,
                b"w:tbl" => table_depth += 1,
                b"w:p" => {
                    para_depth += 1;
                    if para_depth == 1 {
                        current.clear();
                    }
                }
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                let top_level = in_body && table_depth == 0 && para_depth == 1 && run_depth > 0;
                match e.name().as_ref() {
                    b"w:p" if in_body && table_depth == 0 && para_depth == 0 => {
                        paragraphs.push(String::new())
                    }
                    b"w:tab" if top_level => current.push('\t'),
                    b"w:br" | b"w:cr" if top_level => current.push('\n'),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if in_text && in_body && table_depth == 0 && para_depth == 1 {
                    current.push_str(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(t) => {
                if in_text && in_body && table_depth == 0 && para_depth == 1 {
                    current.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:body" => in_body = false,
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:p" => {
                    if para_depth == 1 && in_body && table_depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                    para_depth = para_depth.saturating_sub(1);
                }
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn is_xml_char(c: char) -> bool {
    !matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

fn push_text_run(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str(r#"<w:t xml:space="preserve">"#);
    out.push_str(&quick_xml::escape::escape(text));
    out.push_str("</w:t>");
}

/// One paragraph for a kept segment. Trailing line breaks are dropped.
fn paragraph_xml(segment: &str) -> String {
    let text: String = segment
        .trim_end_matches(['\r', '\n'])
        .chars()
        .filter(|&c| c != '\r' && is_xml_char(c))
        .collect();

    let mut out = String::from("<w:p><w:r>");
    let mut piece = String::new();
    for c in text.chars() {
        match c {
            '\n' => {
                push_text_run(&mut out, &piece);
                piece.clear();
                out.push_str("<w:br/>");
            }
            '\t' => {
                push_text_run(&mut out, &piece);
                piece.clear();
                out.push_str("<w:tab/>");
            }
            other => piece.push(other),
        }
    }
    push_text_run(&mut out, &piece);
    out.push_str("</w:r></w:p>");
    out
}

/// Picture size in EMU at 96 DPI, capped at six inches wide.
fn picture_extent(width: u32, height: u32) -> (u64, u64) {
    let cx = width.max(1) as u64 * EMU_PER_PIXEL;
    let cy = height.max(1) as u64 * EMU_PER_PIXEL;
    if cx <= MAX_PICTURE_WIDTH_EMU {
        (cx, cy)
    } else {
        (MAX_PICTURE_WIDTH_EMU, cy * MAX_PICTURE_WIDTH_EMU / cx)
    }
}

fn picture_xml(n: usize, rel_id: &str, width: u32, height: u32) -> String {
    let (cx, cy) = picture_extent(width, height);
    format!(
        concat!(
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{n}" name="Picture {n}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="{pic_ns}"><pic:pic>"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{n}" name="image{n}.png"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ),
        cx = cx,
        cy = cy,
        n = n,
        pic_ns = NS_PIC,
        rel = rel_id,
    )
}

/// Encode an image losslessly as PNG.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let converted;
    let img = match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => img,
        other => {
            converted = DynamicImage::ImageRgba8(other.to_rgba8());
            &converted
        }
    };

    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;
    Ok(data)
}
