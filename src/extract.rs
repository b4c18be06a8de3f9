//! Text extraction for uploaded documents (PDF, DOCX).
//!
//! Returns plain UTF-8 text plus a page count. Failures never panic; the
//! upload command records them on the document and moves on.

use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::warn;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
}

impl FileType {
    /// File type from the path's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Extracted document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub page_count: i64,
}

pub fn extract_document(bytes: &[u8], file_type: FileType) -> Result<Extracted, ExtractError> {
    match file_type {
        FileType::Pdf => extract_pdf(bytes),
        FileType::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Extracted, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let page_count = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc.get_pages().len() as i64,
        Err(e) => {
            warn!(error = %e, "could not count PDF pages");
            0
        }
    };
    Ok(Extracted { text, page_count })
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<Vec<u8>>, ExtractError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError::Docx(e.to_string())),
    };
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(Some(out))
}

fn extract_docx(bytes: &[u8]) -> Result<Extracted, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?
        .ok_or_else(|| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let body = parse_document_xml(&doc_xml)?;

    let declared_pages = match read_zip_entry_bounded(&mut archive, "docProps/app.xml")? {
        Some(xml) => declared_page_count(&xml),
        None => None,
    };
    let page_count = declared_pages.unwrap_or(body.page_breaks + 1);

    Ok(Extracted {
        text: body.blocks.join("\n\n"),
        page_count,
    })
}

#[derive(Debug, Default)]
struct DocxBody {
    blocks: Vec<String>,
    page_breaks: i64,
}

/// Walks `word/document.xml`. Body paragraphs become blocks; a table
/// becomes one block with a tab-separated line per row. Nested tables are
/// flattened into the enclosing cell.
fn parse_document_xml(xml: &[u8]) -> Result<DocxBody, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut body = DocxBody::default();

    let mut in_text = false;
    let mut table_depth = 0usize;
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut rows: Vec<String> = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ExtractError::Docx(e.to_string()))?
        {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tbl" => table_depth += 1,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" => {
                    if is_page_break(&e) {
                        body.page_breaks += 1;
                    } else {
                        paragraph.push('\n');
                    }
                }
                b"tab" => paragraph.push(' '),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim().to_string();
                    paragraph.clear();
                    if text.is_empty() {
                        // skip empty paragraphs
                    } else if table_depth > 0 {
                        if !cell.is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(&text);
                    } else {
                        body.blocks.push(text);
                    }
                }
                b"tc" if table_depth == 1 => {
                    row.push(std::mem::take(&mut cell).replace('\n', " "));
                }
                b"tr" if table_depth == 1 => {
                    if row.iter().any(|c| !c.is_empty()) {
                        rows.push(row.join("\t"));
                    }
                    row.clear();
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && !rows.is_empty() {
                        body.blocks.push(rows.join("\n"));
                        rows.clear();
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(body)
}

fn is_page_break(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|a| {
        a.key.local_name().as_ref() == b"type" && a.value.as_ref() == b"page"
    })
}

/// `<Pages>` from `docProps/app.xml`, if present and positive.
fn declared_page_count(xml: &[u8]) -> Option<i64> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_pages = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"Pages" => in_pages = true,
            Ok(Event::Text(t)) if in_pages => {
                return t
                    .unescape()
                    .ok()
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .filter(|n| *n > 0);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Pages" => in_pages = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
