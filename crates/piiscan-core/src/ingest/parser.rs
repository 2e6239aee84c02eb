use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;

/// Page trees deeper than this are treated as malformed.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed document: {0}")]
    Malformed(String),
    #[error("Page {page} extraction failed: {reason}")]
    PageFailed { page: u32, reason: String },
    #[error("Extraction library fault: {0}")]
    LibraryFault(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based position within the document.
    pub number: u32,
    pub text: String,
}

impl Page {
    #[must_use]
    pub const fn new(number: u32, text: String) -> Self {
        Self { number, text }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Per-page access to an opened document.
#[async_trait::async_trait]
pub trait PageReader: Send + Sync {
    fn page_count(&self) -> u32;

    /// Pages without a text layer come back with empty text, not an error.
    async fn read_page(&self, number: u32) -> ParseResult<Page>;
}

#[async_trait::async_trait]
pub trait TextSource: Send + Sync {
    /// File extension (without the dot) of documents this source can open.
    fn extension(&self) -> &'static str;

    fn can_open(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension()))
    }

    async fn open(&self, path: &Path) -> ParseResult<Box<dyn PageReader>>;
}

/// Extracts page text from PDF files with `lopdf`.
///
/// Parsing and extraction run on the blocking pool. A panic inside `lopdf`
/// surfaces as [`ParseError::LibraryFault`].
pub struct PdfTextSource;

impl PdfTextSource {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PdfTextSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextSource for PdfTextSource {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    async fn open(&self, path: &Path) -> ParseResult<Box<dyn PageReader>> {
        let data = tokio::fs::read(path).await?;

        let document = tokio::task::spawn_blocking(move || {
            Document::load_mem(&data).map_err(|e| e.to_string())
        })
        .await
        .map_err(library_fault)?
        .map_err(ParseError::Malformed)?;

        let pages = document.get_pages();

        Ok(Box::new(PdfPages {
            document: Arc::new(document),
            pages,
        }))
    }
}

struct PdfPages {
    document: Arc<Document>,
    pages: BTreeMap<u32, ObjectId>,
}

#[async_trait::async_trait]
impl PageReader for PdfPages {
    fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    async fn read_page(&self, number: u32) -> ParseResult<Page> {
        let page_id = *self.pages.get(&number).ok_or_else(|| ParseError::PageFailed {
            page: number,
            reason: "page not in page tree".into(),
        })?;

        if !has_fonts(&self.document, page_id) {
            return Ok(Page::new(number, String::new()));
        }

        let document = Arc::clone(&self.document);
        let text = tokio::task::spawn_blocking(move || {
            document.extract_text(&[number]).map_err(|e| e.to_string())
        })
        .await
        .map_err(library_fault)?
        .map_err(|reason| ParseError::PageFailed {
            page: number,
            reason,
        })?;

        Ok(Page::new(number, text))
    }
}

/// A page can only carry extractable text if it, or an ancestor it
/// inherits resources from, declares at least one font.
fn has_fonts(document: &Document, page_id: ObjectId) -> bool {
    let mut node = document.get_dictionary(page_id).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(dict) = node else {
            return false;
        };

        if let Some(resources) = dict.get(b"Resources").ok().and_then(|o| resolve_dict(document, o)) {
            return resources
                .get(b"Font")
                .ok()
                .and_then(|o| resolve_dict(document, o))
                .is_some_and(|fonts| !fonts.is_empty());
        }

        node = dict.get(b"Parent").ok().and_then(|o| resolve_dict(document, o));
    }

    false
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn library_fault(err: tokio::task::JoinError) -> ParseError {
    if !err.is_panic() {
        return ParseError::LibraryFault(err.to_string());
    }
    ParseError::LibraryFault(panic_message(err.into_panic()))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".into())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};

    /// Builds a PDF with one page per entry; `None` pages have no fonts.
    pub fn pdf_bytes(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            };

            if let Some(text) = text {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 700.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id =
                    doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
                page.set("Contents", content_id);
                page.set("Resources", dictionary! { "Font" => dictionary! { "F1" => font_id } });
            }

            kids.push(doc.add_object(page).into());
        }

        let count = i64::try_from(kids.len()).unwrap();
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

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
