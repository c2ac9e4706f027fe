//! Text extraction for uploaded documents.
//!
//! Dispatch keys purely on the declared MIME type: plain text and markdown
//! are decoded as UTF-8, Word documents are unpacked (OOXML `word/document.xml`
//! read with `quick-xml`), RTF goes through a control-word stripper, and
//! everything else is rejected. The result is normalized by
//! [`clean_extracted_text`] and capped at [`MAX_EXTRACTED_CHARS`].

use std::io::Read;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{FlashError, Result};
use crate::html::truncate_chars;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_RTF: &str = "application/rtf";

/// Upload size ceiling, checked before extraction.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Characters of extracted text returned to the caller.
pub const MAX_EXTRACTED_CHARS: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub const FILE_TOO_LARGE_MESSAGE: &str = "File size must be less than 10MB";
pub const UNSUPPORTED_MESSAGE: &str =
    "Unsupported file type. Please upload Word (.docx/.doc), TXT, MD, or RTF files.";

/// Extraction outcome as reported by the process-document endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted {
    pub text: String,
    pub word_count: usize,
    pub char_count: usize,
}

/// MIME types accepted for upload, with their conventional extensions.
pub fn supported_types() -> [(&'static str, &'static str); 5] {
    [
        (MIME_DOCX, ".docx"),
        (MIME_DOC, ".doc"),
        (MIME_TEXT, ".txt"),
        (MIME_MARKDOWN, ".md"),
        (MIME_RTF, ".rtf"),
    ]
}

/// Infer a MIME type from a file name's extension.
pub fn mime_from_file_name(file_name: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let ext = format!(".{}", ext);
    supported_types()
        .into_iter()
        .find(|(_, e)| *e == ext)
        .map(|(mime, _)| mime)
        .or_else(|| (ext == ".markdown").then_some(MIME_MARKDOWN))
}

/// Extract, clean, and measure the text of an uploaded file.
pub fn extract(bytes: &[u8], content_type: &str) -> Result<Extracted> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(FlashError::validation(FILE_TOO_LARGE_MESSAGE));
    }

    let raw = extract_text(bytes, content_type)?;
    if raw.trim().is_empty() {
        return Err(FlashError::Extraction(
            "No text content found in document".to_string(),
        ));
    }

    let cleaned = clean_extracted_text(&raw);
    let word_count = cleaned.split_whitespace().count();
    let char_count = cleaned.chars().count();

    Ok(Extracted {
        text: truncate_chars(&cleaned, MAX_EXTRACTED_CHARS).to_string(),
        word_count,
        char_count,
    })
}

/// Raw text for `content_type`, before cleaning.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String> {
    match content_type {
        MIME_TEXT | MIME_MARKDOWN => Ok(String::from_utf8_lossy(bytes).into_owned()),
        MIME_DOCX => extract_docx(bytes),
        MIME_DOC => extract_doc(bytes),
        MIME_RTF => Ok(strip_rtf(&String::from_utf8_lossy(bytes))),
        _ => Err(FlashError::UnsupportedFormat(UNSUPPORTED_MESSAGE.to_string())),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let text = read_word_document(bytes).map_err(|e| {
        FlashError::Extraction(format!(
            "Failed to extract text from Word document: {}",
            e
        ))
    })?;
    if text.trim().is_empty() {
        return Err(FlashError::Extraction(
            "Failed to extract text from Word document: No text content found in Word document"
                .to_string(),
        ));
    }
    Ok(text)
}

/// Legacy `.doc` files only succeed when they are OOXML packages under the
/// wrong extension; true binary Word files have no usable text here.
fn extract_doc(bytes: &[u8]) -> Result<String> {
    match read_word_document(bytes) {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) | Err(_) => {
            tracing::debug!("legacy Word document yielded no OOXML text");
            Err(FlashError::Extraction(
                "Failed to extract text from legacy Word document: Unable to extract text from legacy Word document"
                    .to_string(),
            ))
        }
    }
}

fn read_word_document(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| "word/document.xml not found".to_string())?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| e.to_string())?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err("word/document.xml exceeds size limit".to_string());
    }
    paragraphs_from_document_xml(&doc_xml)
}

/// Collect `<w:t>` runs, separating paragraphs with newlines and honouring
/// `<w:tab/>` and `<w:br/>`.
fn paragraphs_from_document_xml(xml: &[u8]) -> std::result::Result<String, String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

static RTF_CONTROL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-z]+\d*\s?").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Remove RTF control words and group braces, then collapse whitespace.
pub fn strip_rtf(rtf: &str) -> String {
    let text = RTF_CONTROL_WORD.replace_all(rtf, "");
    let text = text.replace(['{', '}'], "");
    let text = text.replace("\\\\", "\\").replace("\\'", "'");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Normalize line endings to `\n`, collapse horizontal whitespace, trim every
/// line, then collapse three or more newlines to one blank line.
pub fn clean_extracted_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    // Lines holding only spaces become empty here, before the blank-line collapse.
    let text = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}
