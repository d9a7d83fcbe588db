use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use library_db::entities::book::{self, Column};
use library_db::entities::prelude::Book as BookEntity;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Book {} not found", id))
}

/// List books, optionally filtered
#[utoipa::path(
    get,
    path = "/api/books",
    params(BookQuery),
    responses(
        (status = 200, description = "Books ordered by id", body = Vec<Book>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BookQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let Query(query) = query?;
    debug!("Listing books with filters: {:?}", query);

    let mut condition = Condition::all();

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(Column::Title.contains(search))
                .add(Column::Author.contains(search)),
        );
    }

    let books = BookEntity::find()
        .filter(condition)
        .order_by_asc(Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(books.into_iter().map(Book::from).collect()))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Book>, ApiError> {
    let Path(id) = path?;
    let found = BookEntity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(found.into()))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Title or author missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    validate_book_fields(&req.title, &req.author).map_err(ApiError::Validation)?;

    let now = Utc::now();
    let created = book::ActiveModel {
        title: Set(req.title.trim().to_string()),
        author: Set(req.author.trim().to_string()),
        description: Set(req.description),
        category: Set(req.category.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(book_id = created.id, user_id = %user.user_id, "Book created");

    let location = format!("/api/books/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(Book::from(created)),
    ))
}

/// Replace a book's fields
#[utoipa::path(
    put,
    path = "/api/books/{id}",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBookRequest,
    responses(
        (status = 204, description = "Book updated"),
        (status = 400, description = "Validation failed or body id differs from path", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;

    if req.id.is_some_and(|body_id| body_id != id) {
        return Err(ApiError::Validation("Book ID mismatch".to_string()));
    }
    validate_book_fields(&req.title, &req.author).map_err(ApiError::Validation)?;

    let existing = BookEntity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found(id))?;

    let mut active = existing.into_active_model();
    active.title = Set(req.title.trim().to_string());
    active.author = Set(req.author.trim().to_string());
    active.description = Set(req.description);
    active.category = Set(req.category.trim().to_string());
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    info!(book_id = id, user_id = %user.user_id, "Book updated");

    Ok(StatusCode::NO_CONTENT)
}

/// Remove a book
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let result = BookEntity::delete_by_id(id).exec(&state.db).await?;

    if result.rows_affected == 0 {
        return Err(not_found(id));
    }

    info!(book_id = id, user_id = %user.user_id, "Book deleted");

    Ok(StatusCode::NO_CONTENT)
}
