use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Per-call overrides for the configured recommendation defaults.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RecommendArgs {
    /// Maximum number of titles to return
    #[clap(short = 'n', long, allow_negative_numbers = true)]
    pub num_recommendations: Option<i64>,

    /// Vocabulary cap for the vectorizer
    #[clap(long, allow_negative_numbers = true)]
    pub max_features: Option<i64>,

    /// Minimum similarity (exclusive) between 0.0 and 1.0
    #[clap(long, allow_negative_numbers = true)]
    pub threshold: Option<f32>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FavoriteArgs {
    /// Favorite a book
    Add {
        #[clap(short, long)]
        user: String,

        /// Book id
        id: u64,
    },
    /// Remove a favorite
    Remove {
        #[clap(short, long)]
        user: String,

        /// Book id
        id: u64,
    },
    /// List favorite books of a user
    List {
        #[clap(short, long)]
        user: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum BookArgs {
    /// Add a book to the catalog
    Add {
        /// Book title
        #[clap(short, long)]
        title: String,

        /// Book description
        #[clap(short, long, default_value = "")]
        description: String,

        #[clap(short, long, default_value = "")]
        author: String,

        #[clap(short, long, default_value = "")]
        isbn: String,

        /// Cover image url
        #[clap(long)]
        cover_image: Option<String>,
    },
    /// List the catalog
    List {
        /// Only books whose title or author contains this text
        #[clap(short, long)]
        search: Option<String>,
    },
    /// Show one book
    Get {
        /// Book id
        id: u64,
    },
    /// Change fields of a book
    Update {
        /// Book id
        id: u64,

        #[clap(short, long)]
        title: Option<String>,

        #[clap(short, long)]
        description: Option<String>,

        #[clap(short, long)]
        author: Option<String>,

        #[clap(short, long)]
        isbn: Option<String>,

        /// Cover image url, empty to clear
        #[clap(long)]
        cover_image: Option<String>,
    },
    /// Delete a book and every favorite pointing at it
    Delete {
        /// Book id
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start shelf as a service.
    Daemon {},

    /// Recommend books similar to a user's favorites or to a list of books
    Recommend {
        /// Use favorites of this user
        #[clap(short, long, conflicts_with = "favorites", required_unless_present = "favorites")]
        user: Option<String>,

        /// Comma separated book ids, e.g. 1,2,3
        #[clap(short, long)]
        favorites: Option<String>,

        #[clap(flatten)]
        recommend_args: RecommendArgs,
    },

    /// Import books from a JSON-lines file
    Import {
        path: String,

        /// Maximum number of lines to read
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// Manage favorites
    Favorite {
        #[clap(subcommand)]
        action: FavoriteArgs,
    },

    /// Manage the catalog
    Book {
        #[clap(subcommand)]
        action: BookArgs,
    },
}
