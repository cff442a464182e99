use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod books;
mod cli;
mod config;
mod favorites;
mod import;
mod recommend;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::AppFactory;
use books::{BookCreate, BookUpdate};
use cli::{BookArgs, FavoriteArgs, RecommendArgs};
use recommend::RecommendOverrides;

/// Parse a comma separated list of book ids, e.g. `1, 2,3`.
pub fn parse_ids(ids: &str) -> anyhow::Result<Vec<u64>> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .with_context(|| format!("invalid book id {id:?}"))
        })
        .collect()
}

impl From<RecommendArgs> for RecommendOverrides {
    fn from(args: RecommendArgs) -> Self {
        Self {
            num_recommendations: args.num_recommendations,
            max_features: args.max_features,
            similarity_threshold: args.threshold,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let app = AppFactory::create_app(&paths)?;

    match args.command {
        cli::Command::Daemon {} => {
            web::start_daemon(app)?;
        }

        cli::Command::Recommend {
            user,
            favorites,
            recommend_args,
        } => {
            let overrides = RecommendOverrides::from(recommend_args);

            let titles = match (user, favorites) {
                (Some(user), _) => app.recommend_for_user(&user, &overrides)?,
                (None, Some(favorites)) => {
                    app.recommend_for_books(&parse_ids(&favorites)?, &overrides)?
                }
                (None, None) => anyhow::bail!("either --user or --favorites is required"),
            };

            print_json(&titles)?;
        }

        cli::Command::Import { path, limit } => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("couldnt open import file {path}"))?;
            let report = app.import(std::io::BufReader::new(file), limit)?;
            print_json(&report)?;
        }

        cli::Command::Favorite { action } => match action {
            FavoriteArgs::Add { user, id } => {
                print_json(&app.add_favorite(&user, id)?)?;
            }
            FavoriteArgs::Remove { user, id } => {
                app.remove_favorite(&user, id)?;
                log::info!("removed favorite {id} of {user}");
            }
            FavoriteArgs::List { user } => {
                print_json(&app.list_favorites(&user))?;
            }
        },

        cli::Command::Book { action } => match action {
            BookArgs::Add {
                title,
                description,
                author,
                isbn,
                cover_image,
            } => {
                let book = app.create_book(BookCreate {
                    title,
                    description,
                    isbn,
                    author,
                    cover_image,
                })?;
                print_json(&book)?;
            }
            BookArgs::List { search } => match search {
                Some(search) => print_json(&app.search_books(&search))?,
                None => print_json(&app.list_books())?,
            },
            BookArgs::Get { id } => {
                print_json(&app.get_book(id)?)?;
            }
            BookArgs::Update {
                id,
                title,
                description,
                author,
                isbn,
                cover_image,
            } => {
                let book = app.update_book(
                    id,
                    BookUpdate {
                        title,
                        description,
                        isbn,
                        author,
                        cover_image,
                    },
                )?;
                print_json(&book)?;
            }
            BookArgs::Delete { id } => {
                app.delete_book(id)?;
            }
        },
    }

    Ok(())
}
