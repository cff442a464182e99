use crate::{app::App, books::BackendCsv, config::Config, favorites::FavoritesCsv};
use anyhow::{anyhow, Context, Result};
use homedir::my_home;
use std::sync::Arc;

/// Builds an [`App`] backed by the CSV stores under the base path.
pub struct AppFactory;

impl AppFactory {
    pub fn create_app(paths: &AppPaths) -> Result<App> {
        let config = Config::load_with(&paths.base_path).context("Failed to load config")?;

        let books = BackendCsv::load(&paths.books_path)
            .with_context(|| format!("Failed to load catalog from {}", paths.books_path))?;
        let favorites = FavoritesCsv::load(&paths.favorites_path)
            .with_context(|| format!("Failed to load favorites from {}", paths.favorites_path))?;

        Ok(App::new(config, Arc::new(books), Arc::new(favorites)))
    }

    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> Result<AppPaths> {
        let paths = AppPaths::new(Self::get_base_path()?);

        std::fs::create_dir_all(&paths.base_path)
            .context("Failed to create application base directory")?;

        Ok(paths)
    }

    /// `SHELF_BASE_PATH`, or `~/.local/share/shelf`
    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("SHELF_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .ok_or(anyhow!("Home directory path is empty"))?;

        Ok(format!("{}/.local/share/shelf", home.to_string_lossy()))
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
    pub books_path: String,
    pub favorites_path: String,
}

impl AppPaths {
    pub fn new(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        Self {
            books_path: format!("{base_path}/books.csv"),
            favorites_path: format!("{base_path}/favorites.csv"),
            base_path,
        }
    }
}
