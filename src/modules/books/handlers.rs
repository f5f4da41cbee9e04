use axum::{
    extract::{Path, State},
    Json,
};
use bson::oid::ObjectId;

use bookstore_db::{parse_object_id, StoreError};
use bookstore_http::{AppError, ValidatedJson};

use super::{
    models::{
        Book, BookPayload, CountResponse, CreatedResponse, MessageResponse, SearchPayload,
        TopAuthorsResponse, TopSellingResponse,
    },
    repository::{SharedRepository, REPORT_LIMIT},
};

type ApiResult<T> = Result<Json<T>, AppError>;

fn parse_id(raw: &str) -> Result<ObjectId, AppError> {
    parse_object_id(raw).map_err(|e| AppError::bad_request(e.to_string()))
}

/// Wrap a store failure with the operation that hit it.
fn store_failure(action: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |e| AppError::store(format!("{} failed: {}", action, e))
}

/// `GET /books`
pub async fn list_books(State(repo): State<SharedRepository>) -> ApiResult<Vec<Book>> {
    let books = repo.list().await.map_err(store_failure("Listing books"))?;
    Ok(Json(books))
}

/// `GET /book/{book_id}`. An unknown id yields `null`, not 404.
pub async fn get_book(
    State(repo): State<SharedRepository>,
    Path(book_id): Path<String>,
) -> ApiResult<Option<Book>> {
    let id = parse_id(&book_id)?;
    let book = repo.get(id).await.map_err(store_failure("Loading book"))?;
    Ok(Json(book))
}

/// `POST /book`
pub async fn create_book(
    State(repo): State<SharedRepository>,
    ValidatedJson(payload): ValidatedJson<BookPayload>,
) -> ApiResult<CreatedResponse> {
    let id = repo
        .insert(payload.fields())
        .await
        .map_err(store_failure("Saving record"))?;

    tracing::info!(book_id = %id, title = %payload.title, "book created");

    Ok(Json(CreatedResponse {
        message: "Book created successfully".to_string(),
        book_id: id.to_hex(),
    }))
}

/// `PUT /`
pub async fn update_book(
    State(repo): State<SharedRepository>,
    ValidatedJson(payload): ValidatedJson<BookPayload>,
) -> ApiResult<MessageResponse> {
    let raw_id = payload
        .target_id()
        .map_err(|detail| AppError::validation(vec![detail], "request validation failed"))?;
    let id = parse_id(raw_id)?;

    let matched = repo
        .update(id, payload.fields())
        .await
        .map_err(store_failure("Update book"))?;

    if !matched {
        return Err(AppError::not_found("Book not found"));
    }

    tracing::info!(book_id = %id, "book updated");

    Ok(Json(MessageResponse {
        message: "Book updated successfully".to_string(),
    }))
}

/// `DELETE /books/{book_id}`
pub async fn delete_book(
    State(repo): State<SharedRepository>,
    Path(book_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let id = parse_id(&book_id)?;

    if !repo
        .delete(id)
        .await
        .map_err(store_failure("Delete book"))?
    {
        return Err(AppError::not_found("Book not found."));
    }

    tracing::info!(book_id = %id, "book deleted");

    Ok(Json(MessageResponse {
        message: format!("Book with ID {} has been deleted.", book_id),
    }))
}

/// `GET /books/search`
pub async fn search_books(
    State(repo): State<SharedRepository>,
    ValidatedJson(payload): ValidatedJson<SearchPayload>,
) -> ApiResult<Vec<Book>> {
    let criteria = payload
        .criteria()
        .map_err(|details| AppError::validation(details, "request validation failed"))?;

    tracing::debug!(?criteria, "searching books");

    let books = repo
        .search(&criteria)
        .await
        .map_err(store_failure("Search"))?;
    Ok(Json(books))
}

/// `GET /books/top5authors`
pub async fn top_authors(State(repo): State<SharedRepository>) -> ApiResult<TopAuthorsResponse> {
    let authors = repo
        .top_authors(REPORT_LIMIT)
        .await
        .map_err(store_failure("Top authors report"))?;
    Ok(Json(TopAuthorsResponse { authors }))
}

/// `GET /books/top-selling`
pub async fn top_selling(State(repo): State<SharedRepository>) -> ApiResult<TopSellingResponse> {
    let books = repo
        .top_selling_titles(REPORT_LIMIT)
        .await
        .map_err(store_failure("Top selling report"))?;
    Ok(Json(TopSellingResponse { books }))
}

/// `GET /books/count`
pub async fn count_books(State(repo): State<SharedRepository>) -> ApiResult<CountResponse> {
    let count = repo.count().await.map_err(store_failure("Count"))?;
    Ok(Json(CountResponse { count }))
}

/// `POST /books/purchase/{book_id}`. A store failure answers `false` instead of an error.
pub async fn purchase_book(
    State(repo): State<SharedRepository>,
    Path(book_id): Path<String>,
) -> Result<Json<bool>, AppError> {
    let id = parse_id(&book_id)?;

    match repo.purchase(id).await {
        Ok(()) => {
            tracing::info!(book_id = %id, "book purchased");
            Ok(Json(true))
        }
        Err(e) => {
            tracing::warn!(book_id = %id, error = %e, "purchase failed");
            Ok(Json(false))
        }
    }
}
