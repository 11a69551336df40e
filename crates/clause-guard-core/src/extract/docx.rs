use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::{ExtractError, TextExtractor};

const DOCUMENT_PART: &str = "word/document.xml";

/// Word-processor (`.docx`) extraction: paragraph texts of the main document part joined by `\n`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let xml = read_document_part(bytes)?;
        paragraphs_from_xml(&xml).map(|paragraphs| paragraphs.join("\n"))
    }
}

fn read_document_part(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ExtractError::Docx(format!("not a zip container: {err}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|err| ExtractError::Docx(format!("missing {DOCUMENT_PART}: {err}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|err| ExtractError::Docx(format!("unreadable {DOCUMENT_PART}: {err}")))?;
    Ok(xml)
}

/// Paragraph texts in the order their closing tags appear.
///
/// Paragraphs nest (text boxes carry their own `w:p` inside a run), so open
/// paragraphs are kept on a stack and text always goes to the innermost one.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| ExtractError::Docx(format!("invalid document XML: {err}")))?;
        match event {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(tag) => match (tag.local_name().as_ref(), open.last_mut()) {
                (b"p", _) => paragraphs.push(String::new()),
                (b"tab", Some(current)) if run_depth > 0 => current.push('\t'),
                (b"br" | b"cr", Some(current)) if run_depth > 0 => current.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_text => {
                if let Some(current) = open.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|err| ExtractError::Docx(format!("invalid text node: {err}")))?;
                    current.push_str(&unescaped);
                }
            }
            Event::CData(data) if in_text => {
                if let Some(current) = open.last_mut() {
                    current.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(tag) => match tag.local_name().as_ref() {
                b"p" => {
                    if let Some(done) = open.pop() {
                        paragraphs.push(done);
                    }
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}
