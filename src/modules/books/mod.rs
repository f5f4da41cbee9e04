pub mod handlers;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod repository;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use bookstore_kernel::{InitCtx, Module};
use serde_json::json;

use repository::SharedRepository;

/// Books module: CRUD, search and reports over the books collection
pub struct BooksModule {
    repository: SharedRepository,
}

impl BooksModule {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn mount_path(&self) -> String {
        "/".to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.repository
            .ensure_indexes()
            .await
            .context("failed to create book indexes")?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            collection = %ctx.settings.database.collection,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", put(handlers::update_book))
            .route("/book", post(handlers::create_book))
            .route("/book/{book_id}", get(handlers::get_book))
            .route("/books", get(handlers::list_books))
            .route("/books/search", get(handlers::search_books))
            .route("/books/top5authors", get(handlers::top_authors))
            .route("/books/top-selling", get(handlers::top_selling))
            .route("/books/count", get(handlers::count_books))
            .route("/books/purchase/{book_id}", post(handlers::purchase_book))
            .route("/books/{book_id}", delete(handlers::delete_book))
            .with_state(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.repository
            .shutdown()
            .await
            .context("failed to close the book store")?;
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn id_parameter() -> serde_json::Value {
    json!({
        "name": "book_id",
        "in": "path",
        "required": true,
        "description": "24-digit hex ObjectId",
        "schema": { "type": "string" }
    })
}

fn bounded_string(max_length: usize) -> serde_json::Value {
    json!({ "type": "string", "minLength": 1, "maxLength": max_length })
}

fn string_list(property: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { property: { "type": "array", "items": { "type": "string" } } },
        "required": [property]
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_ref = json!({ "$ref": "#/components/schemas/Book" });
    let book_list = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } });
    let payload_body = json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookPayload" }
            }
        }
    });
    let message = json!({ "$ref": "#/components/schemas/Message" });

    json!({
        "paths": {
            "/": {
                "put": {
                    "summary": "Overwrite every field of a book",
                    "tags": ["Books"],
                    "requestBody": payload_body,
                    "responses": {
                        "200": json_response("Book updated", message.clone()),
                        "400": error_response("Malformed book_id"),
                        "404": error_response("Book not found"),
                        "422": error_response("Validation error"),
                        "500": error_response("Store write failed")
                    }
                }
            },
            "/book": {
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": payload_body,
                    "responses": {
                        "200": json_response("Book created", json!({
                            "type": "object",
                            "properties": {
                                "message": { "type": "string" },
                                "book_id": { "type": "string" }
                            },
                            "required": ["message", "book_id"]
                        })),
                        "422": error_response("Validation error"),
                        "500": error_response("Store write failed")
                    }
                }
            },
            "/book/{book_id}": {
                "get": {
                    "summary": "Look up a book; null when absent",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response("Book or null", book_ref.clone()),
                        "400": error_response("Malformed book_id")
                    }
                }
            },
            "/books": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Every book", book_list.clone()),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/books/{book_id}": {
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response("Book deleted", message.clone()),
                        "400": error_response("Malformed book_id"),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/books/search": {
                "get": {
                    "summary": "Search by author, title or open price range",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/SearchPayload" }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("Matching books", book_list),
                        "422": error_response("Unsupported search")
                    }
                }
            },
            "/books/top5authors": {
                "get": {
                    "summary": "Five authors with the most books",
                    "tags": ["Reports"],
                    "responses": { "200": json_response("Authors", string_list("authors")) }
                }
            },
            "/books/top-selling": {
                "get": {
                    "summary": "Five best-selling titles",
                    "tags": ["Reports"],
                    "responses": { "200": json_response("Titles", string_list("books")) }
                }
            },
            "/books/count": {
                "get": {
                    "summary": "Number of books",
                    "tags": ["Reports"],
                    "responses": {
                        "200": json_response("Count", json!({
                            "type": "object",
                            "properties": { "count": { "type": "integer" } },
                            "required": ["count"]
                        }))
                    }
                }
            },
            "/books/purchase/{book_id}": {
                "post": {
                    "summary": "Sell one copy",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response(
                            "Whether the store accepted the write",
                            json!({ "type": "boolean" })
                        ),
                        "400": error_response("Malformed book_id")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "_id": { "type": "string", "description": "Store-assigned identifier" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "description": { "type": "string" },
                        "price": { "type": "integer" },
                        "stock": { "type": "integer" },
                        "sold_items": { "type": "integer" }
                    },
                    "required": [
                        "_id", "title", "author", "description", "price", "stock", "sold_items"
                    ]
                },
                "BookPayload": {
                    "type": "object",
                    "properties": {
                        "book_id": {
                            "type": "string",
                            "description": "Required on update, ignored on create"
                        },
                        "title": bounded_string(models::TITLE_MAX_CHARS),
                        "author": bounded_string(models::AUTHOR_MAX_CHARS),
                        "description": bounded_string(models::DESCRIPTION_MAX_CHARS),
                        "price": { "type": "integer", "exclusiveMinimum": models::PRICE_FLOOR },
                        "stock": { "type": "integer" },
                        "sold_items": { "type": "integer" }
                    },
                    "required": ["title", "author", "description", "price", "stock", "sold_items"]
                },
                "SearchPayload": {
                    "type": "object",
                    "properties": {
                        "searchBy": { "type": "string", "enum": ["author", "title", "price"] },
                        "value": { "type": "string" },
                        "min": { "type": "string" },
                        "max": { "type": "string" }
                    },
                    "required": ["searchBy"]
                },
                "Message": {
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                }
            }
        }
    })
}

/// Create the books module over the given repository
pub fn create_module(repository: SharedRepository) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(repository))
}
