use crate::{
    books::{Book, BookCreate, BookError, BookManager, BookUpdate},
    config::Config,
    favorites::{Favorite, FavoritesManager},
    import::{self, ImportReport},
    recommend::{self, RecommendOverrides},
};
use std::{collections::HashSet, io::BufRead, sync::Arc, time::Instant};

use super::errors::AppError;

/// Catalog, favorites and recommendations behind one handle, shared by the
/// CLI and the daemon.
#[derive(Clone)]
pub struct App {
    config: Config,
    books: Arc<dyn BookManager>,
    favorites: Arc<dyn FavoritesManager>,
}

impl App {
    pub fn new(
        config: Config,
        books: Arc<dyn BookManager>,
        favorites: Arc<dyn FavoritesManager>,
    ) -> Self {
        Self {
            config,
            books,
            favorites,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn list_books(&self) -> Vec<Book> {
        self.books.list()
    }

    /// Books whose title or author contains `query`, ignoring case.
    pub fn search_books(&self, query: &str) -> Vec<Book> {
        self.books.search(query)
    }

    pub fn get_book(&self, id: u64) -> Result<Book, AppError> {
        self.books.get(id).ok_or(AppError::NotFound)
    }

    pub fn create_book(&self, create: BookCreate) -> Result<Book, AppError> {
        let book = self.books.create(create).map_err(store_error)?;
        log::info!("created book {} {:?}", book.id, book.title);

        Ok(book)
    }

    pub fn update_book(&self, id: u64, update: BookUpdate) -> Result<Book, AppError> {
        let book = self
            .books
            .update(id, update)
            .map_err(store_error)?
            .ok_or(AppError::NotFound)?;
        log::info!("updated book {id}");

        Ok(book)
    }

    /// Delete a book along with every favorite pointing at it.
    pub fn delete_book(&self, id: u64) -> Result<(), AppError> {
        if !self.books.delete(id)? {
            return Err(AppError::NotFound);
        }

        let dropped = self.favorites.remove_book(id)?;
        log::info!("deleted book {id}, dropped {dropped} favorites");

        Ok(())
    }

    pub fn add_favorite(&self, user: &str, book_id: u64) -> Result<Favorite, AppError> {
        self.get_book(book_id)?;
        Ok(self.favorites.add(user, book_id)?)
    }

    pub fn remove_favorite(&self, user: &str, book_id: u64) -> Result<(), AppError> {
        if !self.favorites.remove(user, book_id)? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Favorite books of `user`, oldest favorite first.
    ///
    /// Favorites whose book no longer exists are skipped.
    pub fn list_favorites(&self, user: &str) -> Vec<Book> {
        let ids: Vec<u64> = self
            .favorites
            .list(user)
            .iter()
            .map(|fav| fav.book_id)
            .collect();

        self.books.get_many(&ids).into_iter().flatten().collect()
    }

    pub fn recommend_for_user(
        &self,
        user: &str,
        overrides: &RecommendOverrides,
    ) -> Result<Vec<String>, AppError> {
        let opts = self.config.recommend.with_overrides(overrides)?;

        let favorites = self.list_favorites(user);
        log::debug!("user {user:?} has {} favorites", favorites.len());

        self.recommend_from(&favorites, &opts)
    }

    /// Recommend against an explicit list of favorite book ids.
    ///
    /// Repeated ids count once. Any unknown id fails the whole request.
    pub fn recommend_for_books(
        &self,
        ids: &[u64],
        overrides: &RecommendOverrides,
    ) -> Result<Vec<String>, AppError> {
        let opts = self.config.recommend.with_overrides(overrides)?;

        let mut seen = HashSet::new();
        let ids: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let favorites = self
            .books
            .get_many(&ids)
            .into_iter()
            .collect::<Option<Vec<Book>>>()
            .ok_or(AppError::NotFound)?;

        self.recommend_from(&favorites, &opts)
    }

    fn recommend_from(
        &self,
        favorites: &[Book],
        opts: &recommend::RecommendOptions,
    ) -> Result<Vec<String>, AppError> {
        let now = Instant::now();

        let favorite_ids: HashSet<u64> = favorites.iter().map(|book| book.id).collect();
        let catalog = self.books.all_except(&favorite_ids);

        let titles = recommend::recommend(favorites, &catalog, opts)?;

        log::info!(
            "recommended {} titles from {} favorites in {}ms",
            titles.len(),
            favorites.len(),
            now.elapsed().as_micros() as f64 / 1000.0,
        );

        Ok(titles)
    }

    /// Import books from a JSON-lines reader, `limit` defaults to the configured import limit.
    pub fn import<R: BufRead>(
        &self,
        reader: R,
        limit: Option<usize>,
    ) -> Result<ImportReport, AppError> {
        let limit = limit.unwrap_or(self.config.import_limit);
        Ok(import::import_books(reader, self.books.as_ref(), limit)?)
    }
}

fn store_error(err: anyhow::Error) -> AppError {
    match err.downcast::<BookError>() {
        Ok(BookError::DuplicateIsbn(id)) => AppError::AlreadyExists(id),
        Err(err) => AppError::Other(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{books::BackendCsv, favorites::FavoritesCsv};

    fn fresh() -> (App, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let books = BackendCsv::load(tmp.path().join("books.csv").to_str().unwrap()).unwrap();
        let favorites =
            FavoritesCsv::load(tmp.path().join("favorites.csv").to_str().unwrap()).unwrap();

        let app = App::new(Config::default(), Arc::new(books), Arc::new(favorites));
        (app, tmp)
    }

    fn book(title: &str, isbn: &str) -> BookCreate {
        BookCreate {
            title: title.to_string(),
            isbn: isbn.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_book_rejects_duplicate_isbn() {
        let (app, _tmp) = fresh();

        let first = app.create_book(book("Dune", "978-0")).unwrap();
        let result = app.create_book(book("Dune Messiah", "978-0"));

        assert!(matches!(result, Err(AppError::AlreadyExists(id)) if id == first.id));
        assert!(app.create_book(book("No isbn", "")).is_ok());
        assert!(app.create_book(book("No isbn again", "")).is_ok());
    }

    #[test]
    fn test_create_book_rejects_padded_duplicate_isbn() {
        let (app, _tmp) = fresh();

        let first = app.create_book(book("Dune", " 978-0 ")).unwrap();
        assert_eq!(first.isbn, "978-0");

        let result = app.create_book(book("Dune Messiah", "978-0"));
        assert!(matches!(result, Err(AppError::AlreadyExists(id)) if id == first.id));

        let result = app.create_book(book("Dune Messiah", "978-0\t"));
        assert!(matches!(result, Err(AppError::AlreadyExists(id)) if id == first.id));
        assert_eq!(app.list_books().len(), 1);
    }

    #[test]
    fn test_update_book() {
        let (app, _tmp) = fresh();

        let dune = app.create_book(book("Dune", "978-0")).unwrap();
        let other = app.create_book(book("Hyperion", "978-1")).unwrap();

        let update = BookUpdate {
            description: Some("sand and spice".into()),
            ..Default::default()
        };
        let updated = app.update_book(dune.id, update).unwrap();
        assert_eq!(updated.description, "sand and spice");
        assert_eq!(updated.title, "Dune");

        let clash = BookUpdate {
            isbn: Some("978-0".into()),
            ..Default::default()
        };
        let result = app.update_book(other.id, clash);
        assert!(matches!(result, Err(AppError::AlreadyExists(id)) if id == dune.id));

        let result = app.update_book(42, BookUpdate::default());
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[test]
    fn test_add_favorite_requires_existing_book() {
        let (app, _tmp) = fresh();

        assert!(matches!(app.add_favorite("alice", 42), Err(AppError::NotFound)));
    }

    #[test]
    fn test_delete_book_drops_favorites() {
        let (app, _tmp) = fresh();

        let dune = app.create_book(book("Dune", "")).unwrap();
        app.add_favorite("alice", dune.id).unwrap();

        app.delete_book(dune.id).unwrap();

        assert!(app.list_favorites("alice").is_empty());
        assert!(matches!(app.delete_book(dune.id), Err(AppError::NotFound)));
    }

    #[test]
    fn test_recommend_for_books_unknown_id() {
        let (app, _tmp) = fresh();

        let result = app.recommend_for_books(&[7], &RecommendOverrides::default());
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[test]
    fn test_recommend_rejects_overrides_before_lookup() {
        let (app, _tmp) = fresh();

        let overrides = RecommendOverrides {
            num_recommendations: Some(-1),
            ..Default::default()
        };

        // unknown id would be NotFound, validation comes first
        let result = app.recommend_for_books(&[7], &overrides);
        assert!(matches!(result, Err(AppError::Recommend(_))));
    }
}
