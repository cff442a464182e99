use crate::{recommend::BookLike, storage::temp_path_for};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    hash::Hash,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};

#[derive(Debug, Clone, Eq, Default, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,

    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: String,

    pub cover_image: Option<String>,
}

impl Hash for Book {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for Book {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BookLike for Book {
    fn id(&self) -> u64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        if self.description.is_empty() {
            None
        } else {
            Some(&self.description)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

/// Partial update, absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BookError {
    #[error("book with this isbn already exists at id {0}")]
    DuplicateIsbn(u64),
}

/// Catalog access used by the recommender and the HTTP/CLI layers.
///
/// ISBNs are stored trimmed. A non-empty ISBN belongs to at most one book,
/// writes that would break this fail with [`BookError::DuplicateIsbn`].
pub trait BookManager: Send + Sync {
    fn list(&self) -> Vec<Book>;
    fn get(&self, id: u64) -> Option<Book>;
    /// Books for `ids` in the order given, `None` where an id is unknown.
    fn get_many(&self, ids: &[u64]) -> Vec<Option<Book>>;
    /// Every book whose id is not in `ids`, in catalog order.
    fn all_except(&self, ids: &HashSet<u64>) -> Vec<Book>;
    fn find_by_isbn(&self, isbn: &str) -> Option<Book>;
    /// Case-insensitive match on title or author, catalog order.
    fn search(&self, query: &str) -> Vec<Book>;
    fn create(&self, book: BookCreate) -> anyhow::Result<Book>;
    /// Create all books or none of them.
    fn create_many(&self, books: Vec<BookCreate>) -> anyhow::Result<Vec<Book>>;
    /// Returns `None` when there is no book with this id.
    fn update(&self, id: u64, update: BookUpdate) -> anyhow::Result<Option<Book>>;
    fn delete(&self, id: u64) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Default)]
struct Catalog {
    books: Vec<Book>,
    /// Never goes down, so ids of deleted books are not handed out again.
    next_id: u64,
}

impl Catalog {
    fn isbn_owner(&self, isbn: &str, except: Option<u64>) -> Option<u64> {
        if isbn.is_empty() {
            return None;
        }

        self.books
            .iter()
            .find(|book| book.isbn == isbn && Some(book.id) != except)
            .map(|book| book.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    catalog: Arc<RwLock<Catalog>>,
    path: String,
}

const CSV_HEADERS: [&str; 6] = ["id", "isbn", "title", "author", "description", "cover_image"];

impl BackendCsv {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new catalog at {path}");
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let now = Instant::now();
        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut books = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::to_string)
                    .ok_or(anyhow!("couldnt get record {name}"))
            };

            let id = field(0, "id")?.parse::<u64>()?;
            let cover_image = field(5, "cover_image")?;

            books.push(Book {
                id,
                isbn: field(1, "isbn")?,
                title: field(2, "title")?,
                author: field(3, "author")?,
                description: field(4, "description")?,
                cover_image: if cover_image.is_empty() {
                    None
                } else {
                    Some(cover_image)
                },
            });
        }

        let after_last = books.iter().map(|book| book.id + 1).max().unwrap_or(0);
        let next_id = read_next_id(&next_id_path(path))?.max(after_last);

        log::debug!(
            "took {}ms to read {} books, next id {next_id}",
            now.elapsed().as_micros() as f64 / 1000.0,
            books.len()
        );

        Ok(BackendCsv {
            catalog: Arc::new(RwLock::new(Catalog { books, next_id })),
            path: path.to_string(),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `next` and only then make it the in-memory state.
    fn commit(&self, current: &mut Catalog, next: Catalog) -> anyhow::Result<()> {
        if next.next_id != current.next_id {
            write_next_id(&next_id_path(&self.path), next.next_id)?;
        }
        write_csv(Path::new(&self.path), &next.books)?;
        *current = next;
        Ok(())
    }
}

/// The id counter lives next to the catalog, e.g. `books.csv.next_id`.
fn next_id_path(path: &str) -> PathBuf {
    PathBuf::from(format!("{path}.next_id"))
}

fn read_next_id(path: &Path) -> anyhow::Result<u64> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid id counter in {}", path.display()))?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
        Err(err) => Err(err.into()),
    }
}

fn write_next_id(path: &Path, next_id: u64) -> anyhow::Result<()> {
    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, next_id.to_string())?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

fn write_csv(path: &Path, books: &[Book]) -> anyhow::Result<()> {
    let temp_path = temp_path_for(path);
    let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
    csv_wrt.write_record(CSV_HEADERS)?;
    for book in books {
        csv_wrt.write_record([
            &book.id.to_string(),
            &book.isbn,
            &book.title,
            &book.author,
            &book.description,
            &book.cover_image.clone().unwrap_or_default(),
        ])?;
    }
    csv_wrt.flush()?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

impl BookManager for BackendCsv {
    fn list(&self) -> Vec<Book> {
        self.read().books.clone()
    }

    fn get(&self, id: u64) -> Option<Book> {
        self.read().books.iter().find(|book| book.id == id).cloned()
    }

    fn get_many(&self, ids: &[u64]) -> Vec<Option<Book>> {
        let catalog = self.read();
        ids.iter()
            .map(|id| catalog.books.iter().find(|book| book.id == *id).cloned())
            .collect()
    }

    fn all_except(&self, ids: &HashSet<u64>) -> Vec<Book> {
        self.read()
            .books
            .iter()
            .filter(|book| !ids.contains(&book.id))
            .cloned()
            .collect()
    }

    fn find_by_isbn(&self, isbn: &str) -> Option<Book> {
        let catalog = self.read();
        let id = catalog.isbn_owner(isbn.trim(), None)?;
        catalog.books.iter().find(|book| book.id == id).cloned()
    }

    fn search(&self, query: &str) -> Vec<Book> {
        let query = query.trim().to_lowercase();

        self.read()
            .books
            .iter()
            .filter(|book| {
                book.title.to_lowercase().contains(&query)
                    || book.author.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    fn create(&self, book_create: BookCreate) -> anyhow::Result<Book> {
        self.create_many(vec![book_create])?
            .pop()
            .ok_or(anyhow!("book was not created"))
    }

    fn create_many(&self, creates: Vec<BookCreate>) -> anyhow::Result<Vec<Book>> {
        let mut catalog = self.write();
        let mut next = catalog.clone();

        let mut created = Vec::with_capacity(creates.len());
        for book_create in creates {
            let isbn = book_create.isbn.trim().to_string();
            if let Some(id) = next.isbn_owner(&isbn, None) {
                return Err(BookError::DuplicateIsbn(id).into());
            }

            let book = Book {
                id: next.next_id,
                isbn,
                title: book_create.title,
                author: book_create.author,
                description: book_create.description,
                cover_image: book_create.cover_image,
            };
            next.next_id += 1;
            next.books.push(book.clone());
            created.push(book);
        }

        self.commit(&mut catalog, next)?;

        Ok(created)
    }

    fn update(&self, id: u64, book_update: BookUpdate) -> anyhow::Result<Option<Book>> {
        let mut catalog = self.write();
        let Some(idx) = catalog.books.iter().position(|book| book.id == id) else {
            return Ok(None);
        };

        let mut next = catalog.clone();
        let book = &mut next.books[idx];

        if let Some(title) = book_update.title {
            book.title = title;
        }
        if let Some(description) = book_update.description {
            book.description = description;
        }
        if let Some(author) = book_update.author {
            book.author = author;
        }
        if let Some(cover_image) = book_update.cover_image {
            book.cover_image = Some(cover_image).filter(|url| !url.is_empty());
        }
        if let Some(isbn) = book_update.isbn {
            book.isbn = isbn.trim().to_string();
        }

        let book = book.clone();
        if let Some(owner) = next.isbn_owner(&book.isbn, Some(id)) {
            return Err(BookError::DuplicateIsbn(owner).into());
        }

        self.commit(&mut catalog, next)?;

        Ok(Some(book))
    }

    fn delete(&self, id: u64) -> anyhow::Result<bool> {
        let mut catalog = self.write();
        let Some(idx) = catalog.books.iter().position(|book| book.id == id) else {
            return Ok(false);
        };

        let mut next = catalog.clone();
        next.books.remove(idx);
        self.commit(&mut catalog, next)?;

        Ok(true)
    }
}
