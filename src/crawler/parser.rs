//! HTML parser for catalog pages
//!
//! This module turns fetched page content into structured records:
//! - links (with their visible title and whether they are button-style controls)
//! - metadata fields (book title, author, cover, description paragraphs,
//!   offered download formats, confirmed artifact locator)
//!
//! Parsing is a pure function of the content; it never touches the tree.

use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors produced while parsing a page
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Missing {field} on {url}")]
    MissingField { url: String, field: &'static str },
}

/// Which kind of catalog page is being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Category index: links to categories or sub-categories
    CategoryIndex,
    /// Collections root: links to curated collections
    CollectionIndex,
    /// A page listing book links (collection page or leaf category page)
    Listing,
    /// A single book page
    Book,
    /// The page behind a format's download button
    DownloadConfirmation,
}

/// A link extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: Url,
    pub title: String,
    /// True for button-style controls such as "see more"
    pub is_control: bool,
}

/// A download button offered on a book page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOffer {
    pub label: String,
    pub url: Url,
}

/// Metadata fields extracted from a page; unused fields stay empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    /// Text of every paragraph block in the book's content region
    pub paragraphs: Vec<String>,
    pub download_offers: Vec<DownloadOffer>,
    pub artifact_locator: Option<String>,
}

/// Structured record extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: Url,
    pub links: Vec<ExtractedLink>,
    pub fields: MetadataFields,
}

/// Turns page content into a [`PageRecord`]
pub trait PageParser {
    fn parse(&self, content: &str, url: &Url, kind: PageKind) -> Result<PageRecord, ParseError>;
}

const CATEGORY_LINKS: &str = ".category a[href]";
const COLLECTION_LINKS: &str = ".book-description h2 a[href]";
const LISTING_BOOK_LINKS: &str = ".book div p a.primary-text-color[href]";
const BOOK_TITLE: &str = "h1.bordered-heading";
const BOOK_AUTHOR: &str = "h2 a.secondary-text-color";
const BOOK_COVER: &str = "img.img-book-cover[src]";
const BOOK_DESCRIPTION: &str = "div.col-lg-8 div.row div.offset-top div.text-justify p";
const BOOK_DOWNLOADS: &str = "a.download-link[href]";
const CONFIRMATION_LINK: &str = ".book-description a.download-link[href]";

/// [`PageParser`] using CSS selectors over the catalog's markup
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlPageParser;

impl HtmlPageParser {
    pub fn new() -> Self {
        Self
    }
}

impl PageParser for HtmlPageParser {
    fn parse(&self, content: &str, url: &Url, kind: PageKind) -> Result<PageRecord, ParseError> {
        let document = Html::parse_document(content);

        let mut record = PageRecord {
            url: url.clone(),
            links: Vec::new(),
            fields: MetadataFields::default(),
        };

        match kind {
            PageKind::CategoryIndex => {
                record.links = extract_links(&document, url, CATEGORY_LINKS)?;
            }
            PageKind::CollectionIndex => {
                record.links = extract_links(&document, url, COLLECTION_LINKS)?;
            }
            PageKind::Listing => {
                record.links = extract_links(&document, url, LISTING_BOOK_LINKS)?;
            }
            PageKind::Book => {
                record.fields = extract_book_fields(&document, url)?;
            }
            PageKind::DownloadConfirmation => {
                record.fields.artifact_locator = first_attr(&document, CONFIRMATION_LINK, "href")?
                    .and_then(|href| resolve_link(&href, url))
                    .map(|u| u.to_string());
            }
        }

        Ok(record)
    }
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Collects the visible text of an element, trimmed
fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Button-style controls are recognized by markup, never by position
fn is_control(element: &ElementRef) -> bool {
    let value = element.value();
    value.attr("role") == Some("button")
        || value
            .classes()
            .any(|c| c == "btn" || c == "button" || c.starts_with("btn-"))
}

fn extract_links(document: &Html, base_url: &Url, css: &str) -> Result<Vec<ExtractedLink>, ParseError> {
    let selector = selector(css)?;
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        links.push(ExtractedLink {
            url,
            title: element_text(&element),
            is_control: is_control(&element),
        });
    }

    Ok(links)
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>, ParseError> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .next()
        .map(|e| element_text(&e))
        .filter(|s| !s.is_empty()))
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Result<Option<String>, ParseError> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .find_map(|e| e.value().attr(attr).map(String::from)))
}

fn extract_book_fields(document: &Html, url: &Url) -> Result<MetadataFields, ParseError> {
    let title = first_text(document, BOOK_TITLE)?.ok_or_else(|| ParseError::MissingField {
        url: url.to_string(),
        field: "title",
    })?;

    let author = first_text(document, BOOK_AUTHOR)?;

    let thumbnail = first_attr(document, BOOK_COVER, "src")?
        .and_then(|src| resolve_link(&src, url))
        .map(|u| u.to_string());

    // Paragraph text is kept exactly as found
    let paragraph_selector = selector(BOOK_DESCRIPTION)?;
    let paragraphs = document
        .select(&paragraph_selector)
        .map(|p| p.text().collect::<String>())
        .collect();

    let download_selector = selector(BOOK_DOWNLOADS)?;
    let download_offers = document
        .select(&download_selector)
        .filter_map(|button| {
            let href = button.value().attr("href")?;
            Some(DownloadOffer {
                label: element_text(&button),
                url: resolve_link(href, url)?,
            })
        })
        .collect();

    Ok(MetadataFields {
        title: Some(title),
        author,
        thumbnail,
        paragraphs,
        download_offers,
        artifact_locator: None,
    })
}
