//! Per-user favorite books, stored as `user,book_id,created_at` rows.

use crate::storage::temp_path_for;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub user: String,
    pub book_id: u64,
    pub created_at: DateTime<Utc>,
}

pub trait FavoritesManager: Send + Sync {
    /// Favorite a book. Adding the same (user, book) twice keeps the first entry.
    fn add(&self, user: &str, book_id: u64) -> anyhow::Result<Favorite>;
    /// Returns whether a favorite was removed.
    fn remove(&self, user: &str, book_id: u64) -> anyhow::Result<bool>;
    /// Favorites of `user`, oldest first.
    fn list(&self, user: &str) -> Vec<Favorite>;
    /// Drop every favorite pointing at `book_id`.
    fn remove_book(&self, book_id: u64) -> anyhow::Result<usize>;
}

#[derive(Debug, Clone, Default)]
pub struct FavoritesCsv {
    list: Arc<RwLock<Vec<Favorite>>>,
    path: String,
}

const CSV_HEADERS: [&str; 3] = ["user", "book_id", "created_at"];

impl FavoritesCsv {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new favorites file at {path}");
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let mut csv_reader = csv::Reader::from_path(path)?;
        let mut favorites = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let user = record
                .get(0)
                .ok_or(anyhow!("couldnt get record user"))?
                .to_string();
            let book_id = record
                .get(1)
                .ok_or(anyhow!("couldnt get record book_id"))?
                .parse::<u64>()?;
            let created_at = record
                .get(2)
                .ok_or(anyhow!("couldnt get record created_at"))?
                .parse::<DateTime<Utc>>()?;

            favorites.push(Favorite {
                user,
                book_id,
                created_at,
            });
        }

        Ok(FavoritesCsv {
            list: Arc::new(RwLock::new(favorites)),
            path: path.to_string(),
        })
    }

    fn save(&self, favorites: &[Favorite]) -> anyhow::Result<()> {
        let path = Path::new(&self.path);
        let temp_path = temp_path_for(path);
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for favorite in favorites {
            csv_wrt.write_record([
                favorite.user.as_str(),
                favorite.book_id.to_string().as_str(),
                favorite.created_at.to_rfc3339().as_str(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl FavoritesManager for FavoritesCsv {
    fn add(&self, user: &str, book_id: u64) -> anyhow::Result<Favorite> {
        let mut favorites = self.list.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = favorites
            .iter()
            .find(|fav| fav.user == user && fav.book_id == book_id)
        {
            return Ok(existing.clone());
        }

        let favorite = Favorite {
            user: user.to_string(),
            book_id,
            created_at: Utc::now(),
        };

        let mut next = favorites.clone();
        next.push(favorite.clone());
        self.save(&next)?;
        *favorites = next;

        Ok(favorite)
    }

    fn remove(&self, user: &str, book_id: u64) -> anyhow::Result<bool> {
        let mut favorites = self.list.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = favorites.clone();
        next.retain(|fav| !(fav.user == user && fav.book_id == book_id));

        if next.len() == favorites.len() {
            return Ok(false);
        }

        self.save(&next)?;
        *favorites = next;

        Ok(true)
    }

    fn list(&self, user: &str) -> Vec<Favorite> {
        self.list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|fav| fav.user == user)
            .cloned()
            .collect()
    }

    fn remove_book(&self, book_id: u64) -> anyhow::Result<usize> {
        let mut favorites = self.list.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = favorites.clone();
        next.retain(|fav| fav.book_id != book_id);

        let removed = favorites.len() - next.len();
        if removed > 0 {
            self.save(&next)?;
            *favorites = next;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (FavoritesCsv, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("favorites.csv");
        let favorites = FavoritesCsv::load(path.to_str().unwrap()).unwrap();
        (favorites, tmp)
    }

    #[test]
    fn test_add_is_idempotent() {
        let (favorites, _tmp) = fresh();

        let first = favorites.add("alice", 3).unwrap();
        let second = favorites.add("alice", 3).unwrap();

        assert_eq!(first, second);
        assert_eq!(favorites.list("alice").len(), 1);
    }

    #[test]
    fn test_list_is_per_user_and_ordered() {
        let (favorites, _tmp) = fresh();

        favorites.add("alice", 3).unwrap();
        favorites.add("bob", 1).unwrap();
        favorites.add("alice", 1).unwrap();

        let ids: Vec<u64> = favorites.list("alice").iter().map(|f| f.book_id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(favorites.list("carol").len(), 0);
    }

    #[test]
    fn test_remove() {
        let (favorites, _tmp) = fresh();

        favorites.add("alice", 3).unwrap();
        assert!(favorites.remove("alice", 3).unwrap());
        assert!(!favorites.remove("alice", 3).unwrap());
        assert!(favorites.list("alice").is_empty());
    }

    #[test]
    fn test_remove_book_drops_every_user() {
        let (favorites, _tmp) = fresh();

        favorites.add("alice", 3).unwrap();
        favorites.add("bob", 3).unwrap();
        favorites.add("bob", 4).unwrap();

        assert_eq!(favorites.remove_book(3).unwrap(), 2);
        assert_eq!(favorites.list("bob").len(), 1);
    }

    #[test]
    fn test_reload_preserves_favorites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("favorites.csv");
        let path = path.to_str().unwrap();

        let created = {
            let favorites = FavoritesCsv::load(path).unwrap();
            favorites.add("alice", 7).unwrap()
        };

        let favorites = FavoritesCsv::load(path).unwrap();
        let loaded = favorites.list("alice");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].book_id, 7);
        assert_eq!(loaded[0].created_at, created.created_at);
    }

    #[test]
    fn test_failed_save_keeps_favorites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state");
        std::fs::create_dir(&dir).unwrap();

        let favorites = FavoritesCsv::load(dir.join("favorites.csv").to_str().unwrap()).unwrap();
        favorites.add("alice", 3).unwrap();

        std::fs::remove_dir_all(&dir).unwrap();

        assert!(favorites.add("alice", 4).is_err());
        assert!(favorites.remove("alice", 3).is_err());
        assert!(favorites.remove_book(3).is_err());

        let ids: Vec<u64> = favorites.list("alice").iter().map(|f| f.book_id).collect();
        assert_eq!(ids, vec![3]);
    }
}
