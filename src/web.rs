use crate::{
    app::{App, AppError},
    books::{Book, BookCreate, BookUpdate},
    favorites::Favorite,
    recommend::RecommendOverrides,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

pub fn router(app: Arc<App>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route(
            "/api/recommendations",
            get(recommend_for_user).post(recommend_for_books),
        )
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route(
            "/api/favorites",
            get(list_favorites)
                .post(add_favorite)
                .delete(remove_favorite),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(app: Arc<App>, listen: &str) -> anyhow::Result<()> {
    let router = router(app);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: App) -> anyhow::Result<()> {
    let listen = app.config().listen.clone();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(Arc::new(app), &listen))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::Recommend(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::IO(_) | AppError::Csv(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Query string of `GET /api/recommendations`.
///
/// Overrides are spelled out because `serde(flatten)` does not mix with
/// urlencoded numbers.
#[derive(Debug, Deserialize)]
struct UserRecommendationsQuery {
    user: String,
    num_recommendations: Option<i64>,
    max_features: Option<i64>,
    similarity_threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct BookRecommendationsRequest {
    favorites: Vec<u64>,
    #[serde(flatten)]
    overrides: RecommendOverrides,
}

#[derive(Debug, Deserialize)]
struct BookListQuery {
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user: String,
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    user: String,
    book_id: u64,
}

async fn recommend_for_user(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<UserRecommendationsQuery>,
) -> Result<Json<Vec<String>>, HttpError> {
    log::debug!("query: {query:?}");

    let overrides = RecommendOverrides {
        num_recommendations: query.num_recommendations,
        max_features: query.max_features,
        similarity_threshold: query.similarity_threshold,
    };

    let titles = tokio::task::block_in_place(|| {
        state.app.recommend_for_user(&query.user, &overrides)
    })?;

    Ok(Json(titles))
}

async fn recommend_for_books(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<BookRecommendationsRequest>,
) -> Result<Json<Vec<String>>, HttpError> {
    log::debug!("payload: {payload:?}");

    let titles = tokio::task::block_in_place(|| {
        state
            .app
            .recommend_for_books(&payload.favorites, &payload.overrides)
    })?;

    Ok(Json(titles))
}

async fn list_books(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<BookListQuery>,
) -> Json<Vec<Book>> {
    match query.search {
        Some(search) => Json(state.app.search_books(&search)),
        None => Json(state.app.list_books()),
    }
}

async fn get_book(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<u64>,
) -> Result<Json<Book>, HttpError> {
    Ok(Json(state.app.get_book(id)?))
}

async fn create_book(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<BookCreate>,
) -> Result<Json<Book>, HttpError> {
    let book = tokio::task::block_in_place(|| state.app.create_book(payload))?;
    Ok(Json(book))
}

async fn update_book(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<u64>,
    Json(payload): Json<BookUpdate>,
) -> Result<Json<Book>, HttpError> {
    log::debug!("update {id}: {payload:?}");

    let book = tokio::task::block_in_place(|| state.app.update_book(id, payload))?;
    Ok(Json(book))
}

async fn delete_book(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, HttpError> {
    tokio::task::block_in_place(|| state.app.delete_book(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_favorites(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<UserQuery>,
) -> Json<Vec<Book>> {
    Json(state.app.list_favorites(&query.user))
}

async fn add_favorite(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<Favorite>, HttpError> {
    let favorite = tokio::task::block_in_place(|| {
        state.app.add_favorite(&payload.user, payload.book_id)
    })?;

    Ok(Json(favorite))
}

async fn remove_favorite(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<StatusCode, HttpError> {
    tokio::task::block_in_place(|| {
        state.app.remove_favorite(&payload.user, payload.book_id)
    })?;

    Ok(StatusCode::NO_CONTENT)
}
