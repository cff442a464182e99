//! Bulk import of books from a JSON-lines dump.
//!
//! One JSON object per line:
//! `{"title": "...", "description": "...", "isbn": "...", "image_url": "...", "authors": [{"name": "..."}]}`
//!
//! Bad lines are logged and skipped, they never abort the import.

use std::{collections::HashSet, io::BufRead};

use serde::Deserialize;

use crate::books::{BookCreate, BookManager};

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    authors: Vec<RawAuthor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

impl RawBook {
    fn into_create(self) -> Option<BookCreate> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;

        let author = self
            .author
            .or_else(|| self.authors.into_iter().find_map(|a| a.name))
            .unwrap_or_default();

        Some(BookCreate {
            title,
            description: self.description.unwrap_or_default().trim().to_string(),
            isbn: self.isbn.unwrap_or_default().trim().to_string(),
            author,
            cover_image: self.image_url.filter(|url| !url.is_empty()),
        })
    }
}

/// Read at most `limit` lines from `reader` into the catalog.
pub fn import_books<R: BufRead>(
    reader: R,
    books: &dyn BookManager,
    limit: usize,
) -> anyhow::Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut pending = vec![];
    let mut seen_isbns = HashSet::new();

    for (idx, line) in reader.lines().take(limit).enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let raw: RawBook = match serde_json::from_str(line.trim()) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("line {}: JSON decode error: {err}", idx + 1);
                report.skipped += 1;
                continue;
            }
        };

        let Some(create) = raw.into_create() else {
            log::warn!("line {}: book has no title", idx + 1);
            report.skipped += 1;
            continue;
        };

        if !create.isbn.is_empty()
            && (books.find_by_isbn(&create.isbn).is_some() || !seen_isbns.insert(create.isbn.clone()))
        {
            log::warn!("line {}: isbn {} already exists", idx + 1, create.isbn);
            report.skipped += 1;
            continue;
        }

        log::debug!("importing book {:?}", create.title);
        pending.push(create);
    }

    report.imported = books.create_many(pending)?.len();

    log::info!(
        "imported {} books, skipped {}",
        report.imported,
        report.skipped
    );

    Ok(report)
}
