//! Text block extraction for paginated documents.
//!
//! Text spans are decoded from a page's content stream together with their
//! position and font size, grouped into lines by baseline and into blocks
//! by vertical spacing, indentation and font size changes.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Leading used by `T*` before any `TL` operator.
const DEFAULT_LEADING: f32 = 12.0;

/// TJ adjustment, in thousandths of text space, treated as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Deepest nesting of form XObjects that is followed.
pub const MAX_FORM_DEPTH: usize = 8;

/// A run of text at one position.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span, estimating its width from the character count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32) -> Self {
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }
}

/// Spans sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line
    pub spans: Vec<TextSpan>,
    /// Baseline
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size, weighted by text length
    pub font_size: f32,
}

impl TextLine {
    /// Create a line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let (y, x) = spans.first().map(|s| (s.y, s.x)).unwrap_or((0.0, 0.0));
        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let font_size = if total_chars > 0 {
            spans
                .iter()
                .map(|s| s.font_size * s.text.len() as f32)
                .sum::<f32>()
                / total_chars as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(0.0)
        };

        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Combined text, with a space wherever the horizontal gap between two
    /// spans suggests one. Adjacent CJK/kana characters are never separated.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - (prev.x + prev.width);
                let char_count = span.text.chars().count().max(1);
                let threshold = span.width / char_count as f32 * 0.2;

                let spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char);
                let has_space = ends_with_space(&prev.text) || starts_with_space(&span.text);

                if gap > threshold && !spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// Consecutive lines forming one paragraph.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// The lines in this block
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Lines joined with single spaces.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the block has no visible text.
    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// Extracts text blocks from the pages of a loaded document.
pub struct LayoutAnalyzer<'a> {
    doc: &'a LopdfDocument,
}

impl<'a> LayoutAnalyzer<'a> {
    /// Create a new layout analyzer.
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self { doc }
    }

    /// Text blocks of a page (1-based), top to bottom.
    pub fn extract_page_blocks(&self, page_num: u32) -> Result<Vec<TextBlock>> {
        let spans = self.extract_page_spans(page_num)?;
        let lines = group_spans_into_lines(spans);
        Ok(group_lines_into_blocks(lines))
    }

    /// Positioned spans of a page (1-based).
    pub fn extract_page_spans(&self, page_num: u32) -> Result<Vec<TextSpan>> {
        let pages = self.doc.get_pages();
        let page_id = *pages.get(&page_num).ok_or_else(|| {
            Error::PdfParse(format!(
                "page {} out of range (document has {})",
                page_num,
                pages.len()
            ))
        })?;

        let fonts = self.doc.get_page_fonts(page_id)?;
        let resources = page_resources(self.doc, page_id);
        let content = self.page_content(page_id)?;

        let mut spans = Vec::new();
        self.parse_content(&content, &fonts, resources, 0, &mut spans)?;
        Ok(spans)
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page = self.doc.get_dictionary(page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(obj) => obj,
            // A page without content has no text
            Err(_) => return Ok(Vec::new()),
        };

        let refs: Vec<ObjectId> = match contents {
            Object::Reference(r) => vec![*r],
            Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => return Err(Error::PdfParse("invalid content stream".to_string())),
        };

        let mut content = Vec::new();
        for r in refs {
            if let Ok(Object::Stream(s)) = self.doc.get_object(r) {
                let data = s.decompressed_content().unwrap_or_else(|_| s.content.clone());
                content.extend_from_slice(&data);
                content.push(b'\n');
            }
        }
        Ok(content)
    }

    fn decode(&self, font: Option<&Dictionary>, bytes: &[u8]) -> String {
        let encoding = font.and_then(|f| f.get_font_encoding(self.doc).ok());
        match encoding {
            Some(enc) => LopdfDocument::decode_text(&enc, bytes).unwrap_or_default(),
            None => decode_text_simple(bytes),
        }
    }

    fn parse_content(
        &self,
        content: &[u8],
        fonts: &BTreeMap<Vec<u8>, &'a Dictionary>,
        resources: Option<&'a Dictionary>,
        depth: usize,
        spans: &mut Vec<TextSpan>,
    ) -> Result<()> {
        let content = Content::decode(content)?;

        let mut font: Option<&Dictionary> = None;
        let mut font_size: f32 = 12.0;
        let mut matrix = TextMatrix::default();
        let mut in_text = false;

        for op in &content.operations {
            let text = match op.operator.as_str() {
                "BT" => {
                    in_text = true;
                    matrix.reset();
                    None
                }
                "ET" => {
                    in_text = false;
                    None
                }
                "Tf" if op.operands.len() >= 2 => {
                    font = op.operands[0]
                        .as_name()
                        .ok()
                        .and_then(|name| fonts.get(name).copied());
                    font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                    None
                }
                "TL" => {
                    if let Some(leading) = op.operands.first().and_then(get_number) {
                        matrix.leading = leading;
                    }
                    None
                }
                "Td" | "TD" if op.operands.len() >= 2 => {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        matrix.leading = -ty;
                    }
                    matrix.translate(tx, ty);
                    None
                }
                "Tm" if op.operands.len() >= 6 => {
                    let n: Vec<f32> = op.operands[..6]
                        .iter()
                        .map(|o| get_number(o).unwrap_or(0.0))
                        .collect();
                    matrix.set(n[0], n[1], n[2], n[3], n[4], n[5]);
                    None
                }
                "T*" => {
                    matrix.next_line();
                    None
                }
                "Do" => {
                    if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                        self.parse_form(name, fonts, resources, depth, spans);
                    }
                    None
                }
                "Tj" if in_text => match op.operands.first() {
                    Some(Object::String(bytes, _)) => Some(self.decode(font, bytes)),
                    _ => None,
                },
                "TJ" if in_text => match op.operands.first() {
                    Some(Object::Array(items)) => Some(self.decode_array(font, items)),
                    _ => None,
                },
                "'" | "\"" => {
                    matrix.next_line();
                    let idx = if op.operator == "\"" { 2 } else { 0 };
                    match op.operands.get(idx) {
                        Some(Object::String(bytes, _)) if in_text => {
                            Some(self.decode(font, bytes))
                        }
                        _ => None,
                    }
                }
                _ => None,
            };

            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                let (x, y) = matrix.position();
                spans.push(TextSpan::new(text, x, y, font_size * matrix.scale()));
            }
        }

        Ok(())
    }

    /// Spans drawn by a form XObject, shifted by the form matrix. Forms
    /// without their own resources use the caller's.
    fn parse_form(
        &self,
        name: &[u8],
        fonts: &BTreeMap<Vec<u8>, &'a Dictionary>,
        resources: Option<&'a Dictionary>,
        depth: usize,
        spans: &mut Vec<TextSpan>,
    ) {
        if depth >= MAX_FORM_DEPTH {
            log::debug!("Form /{} nested too deeply", String::from_utf8_lossy(name));
            return;
        }
        let form = match resources.and_then(|res| form_xobject(self.doc, res, name)) {
            Some(form) => form,
            None => return,
        };

        let form_resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(self.doc, r));
        let form_fonts = match form_resources {
            Some(res) => resource_fonts(self.doc, res),
            None => fonts.clone(),
        };
        let data = form
            .decompressed_content()
            .unwrap_or_else(|_| form.content.clone());

        let start = spans.len();
        if let Err(e) = self.parse_content(
            &data,
            &form_fonts,
            form_resources.or(resources),
            depth + 1,
            spans,
        ) {
            log::debug!("Skipping form /{}: {}", String::from_utf8_lossy(name), e);
            spans.truncate(start);
            return;
        }

        let (dx, dy) = form_offset(&form.dict);
        for span in &mut spans[start..] {
            span.x += dx;
            span.y += dy;
        }
    }

    /// Decode a TJ array, turning large negative adjustments into spaces.
    fn decode_array(&self, font: Option<&Dictionary>, items: &[Object]) -> String {
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(font, bytes)),
                other => {
                    let adjustment = -get_number(other).unwrap_or(0.0);
                    let wants_space = combined
                        .chars()
                        .last()
                        .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c));
                    if adjustment > TJ_SPACE_THRESHOLD && wants_space {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }
}

/// Group spans into lines, top to bottom (PDF Y grows upwards).
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }

    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }
    lines
}

/// Group consecutive lines into paragraph blocks.
pub fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let avg_spacing = average_line_spacing(&lines);
    let mut blocks = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(TextBlock {
                    lines: std::mem::take(&mut current),
                });
            }
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(TextBlock { lines: current });
    }
    blocks
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break_block(prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
    let spacing = (prev.y - curr.y).abs();
    let font_size = prev.font_size.max(curr.font_size);

    // Gap wider than the usual leading, or wider than a blank line
    spacing > avg_spacing * 1.5
        || (font_size > 0.0 && spacing > font_size * 2.0)
        || (prev.font_size - curr.font_size).abs() > 1.0
        || (prev.x - curr.x).abs() > 20.0
}

/// Text matrix tracking the current text position.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            leading: DEFAULT_LEADING,
        }
    }
}

impl TextMatrix {
    /// Reset position at `BT`. Leading persists across text objects.
    fn reset(&mut self) {
        *self = Self {
            leading: self.leading,
            ..Self::default()
        };
    }

    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Resources of a page, inherited from ancestors when absent.
pub fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Some(res) = node.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
            return Some(res);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

pub fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(r) => doc.get_dictionary(*r).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

pub fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(r) => doc.get_object(*r).unwrap_or(obj),
        other => other,
    }
}

/// `Subtype` of an XObject stream.
pub fn xobject_subtype(stream: &Stream) -> Option<&[u8]> {
    stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
}

fn form_xobject<'a>(doc: &'a LopdfDocument, resources: &'a Dictionary, name: &[u8]) -> Option<&'a Stream> {
    let xobjects = resources.get(b"XObject").ok().and_then(|x| resolve_dict(doc, x))?;
    let stream = resolve(doc, xobjects.get(name).ok()?).as_stream().ok()?;
    (xobject_subtype(stream) == Some(b"Form".as_slice())).then_some(stream)
}

fn resource_fonts<'a>(doc: &'a LopdfDocument, resources: &'a Dictionary) -> BTreeMap<Vec<u8>, &'a Dictionary> {
    resources
        .get(b"Font")
        .ok()
        .and_then(|f| resolve_dict(doc, f))
        .map(|fonts| {
            fonts
                .iter()
                .filter_map(|(name, obj)| resolve_dict(doc, obj).map(|d| (name.clone(), d)))
                .collect()
        })
        .unwrap_or_default()
}

/// Translation part of a form's `Matrix`.
fn form_offset(dict: &Dictionary) -> (f32, f32) {
    match dict.get(b"Matrix") {
        Ok(Object::Array(m)) if m.len() == 6 => (
            get_number(&m[4]).unwrap_or(0.0),
            get_number(&m[5]).unwrap_or(0.0),
        ),
        _ => (0.0, 0.0),
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn ends_with_space(s: &str) -> bool {
    s.ends_with(' ') || s.ends_with('\u{00A0}')
}

fn starts_with_space(s: &str) -> bool {
    s.starts_with(' ') || s.starts_with('\u{00A0}')
}

/// Chinese and Japanese characters, which are not separated by word spaces.
fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F      // CJK symbols and punctuation
        | 0x3040..=0x30FF    // Hiragana, Katakana
        | 0x3400..=0x4DBF    // Extension A
        | 0x4E00..=0x9FFF    // Unified ideographs
        | 0x20000..=0x2EBEF) // Extensions B-F
}

/// Fallback decoding for strings in fonts without a usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, 11.0)
    }

    #[test]
    fn test_spans_grouped_by_baseline() {
        let spans = vec![
            span("world", 80.0, 700.0),
            span("second", 50.0, 685.0),
            span("Hello", 50.0, 700.5),
        ];
        let lines = group_spans_into_lines(spans);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn test_blocks_split_on_wide_gap() {
        let lines = group_spans_into_lines(vec![
            span("first line", 50.0, 792.0),
            span("wrapped line", 50.0, 777.0),
            span("next paragraph", 50.0, 739.5),
        ]);
        let blocks = group_lines_into_blocks(lines);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), "first line wrapped line");
        assert_eq!(blocks[1].text(), "next paragraph");
    }

    #[test]
    fn test_blocks_split_on_indent() {
        let lines = group_spans_into_lines(vec![
            span("body", 50.0, 700.0),
            span("quoted", 90.0, 685.0),
        ]);
        assert_eq!(group_lines_into_blocks(lines).len(), 2);
    }

    #[test]
    fn test_cjk_spans_joined_without_space() {
        let line = TextLine::from_spans(vec![span("日本", 50.0, 700.0), span("語", 80.0, 700.0)]);
        assert_eq!(line.text(), "日本語");
    }

    #[test]
    fn test_text_matrix_leading() {
        let mut m = TextMatrix::default();
        m.translate(50.0, 700.0);
        m.leading = 15.0;
        m.next_line();
        assert_eq!(m.position(), (50.0, 685.0));

        m.reset();
        assert_eq!(m.position(), (0.0, 0.0));
        assert_eq!(m.leading, 15.0);
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"plain"), "plain");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        assert_eq!(decode_text_simple(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }
}
