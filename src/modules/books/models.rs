use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bookstore_http::extract::{check_greater_than, check_length, require, Validate};

pub const TITLE_MAX_CHARS: usize = 50;
pub const AUTHOR_MAX_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const PRICE_FLOOR: i64 = 10;

/// A stored book as returned to clients, identifier rendered as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub sold_items: i64,
}

/// Every mutable book field. This is what gets written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub sold_items: i64,
}

impl BookFields {
    pub fn into_book(self, id: ObjectId) -> Book {
        Book {
            id: id.to_hex(),
            title: self.title,
            author: self.author,
            description: self.description,
            price: self.price,
            stock: self.stock,
            sold_items: self.sold_items,
        }
    }
}

/// Request body for `POST /book` and `PUT /`.
///
/// `book_id` is ignored on create and locates the target on update.
#[derive(Debug, Clone, Deserialize)]
pub struct BookPayload {
    #[serde(default)]
    pub book_id: Option<String>,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub sold_items: i64,
}

impl BookPayload {
    pub fn fields(&self) -> BookFields {
        BookFields {
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            price: self.price,
            stock: self.stock,
            sold_items: self.sold_items,
        }
    }

    /// The identifier an update targets; absent is a validation failure.
    pub fn target_id(&self) -> Result<&str, Value> {
        require("book_id", self.book_id.as_deref())
    }
}

impl Validate for BookPayload {
    fn validate(&self) -> Result<(), Vec<Value>> {
        let errors: Vec<Value> = [
            check_length("title", &self.title, 1, TITLE_MAX_CHARS),
            check_length("author", &self.author, 1, AUTHOR_MAX_CHARS),
            check_length("description", &self.description, 1, DESCRIPTION_MAX_CHARS),
            check_greater_than("price", self.price, PRICE_FLOOR),
        ]
        .into_iter()
        .flatten()
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A numeric search bound, accepted either as a JSON integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Int(i64),
    Text(String),
}

impl Operand {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Operand::Int(n) => Some(*n),
            Operand::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Request body for `GET /books/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPayload {
    #[serde(rename = "searchBy")]
    pub search_by: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub min: Option<Operand>,
    #[serde(default)]
    pub max: Option<Operand>,
}

/// A parsed search: exact match on author or title, or an open price interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    Author(String),
    Title(String),
    Price { min: i64, max: i64 },
}

impl SearchCriteria {
    /// Whether a book satisfies this search. Price bounds are exclusive.
    pub fn matches(&self, book: &BookFields) -> bool {
        match self {
            SearchCriteria::Author(author) => book.author == *author,
            SearchCriteria::Title(title) => book.title == *title,
            SearchCriteria::Price { min, max } => *min < book.price && book.price < *max,
        }
    }
}

fn bound(field: &str, operand: Option<&Operand>) -> Result<i64, Value> {
    let operand = require(field, operand)?;
    operand.as_i64().ok_or_else(|| {
        serde_json::json!({ "field": field, "error": "must be an integer" })
    })
}

impl SearchPayload {
    pub fn criteria(&self) -> Result<SearchCriteria, Vec<Value>> {
        let value = || require("value", self.value.clone()).map_err(|e| vec![e]);

        match self.search_by.as_str() {
            "author" => Ok(SearchCriteria::Author(value()?)),
            "title" => Ok(SearchCriteria::Title(value()?)),
            "price" => {
                let min = bound("min", self.min.as_ref());
                let max = bound("max", self.max.as_ref());
                match (min, max) {
                    (Ok(min), Ok(max)) => Ok(SearchCriteria::Price { min, max }),
                    (min, max) => Err([min.err(), max.err()].into_iter().flatten().collect()),
                }
            }
            other => Err(vec![serde_json::json!({
                "field": "searchBy",
                "error": format!(
                    "unsupported search field '{}'; expected author, title or price",
                    other
                ),
            })]),
        }
    }
}

impl Validate for SearchPayload {
    fn validate(&self) -> Result<(), Vec<Value>> {
        self.criteria().map(|_| ())
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub book_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TopAuthorsResponse {
    pub authors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TopSellingResponse {
    pub books: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> BookPayload {
        serde_json::from_value(json!({
            "title": "Dune",
            "author": "Herbert",
            "description": "Sci-fi",
            "price": 20,
            "stock": 5,
            "sold_items": 0
        }))
        .unwrap()
    }

    fn failed_fields(payload: &BookPayload) -> Vec<String> {
        payload
            .validate()
            .unwrap_err()
            .iter()
            .map(|d| d["field"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
        assert!(payload().book_id.is_none());
    }

    #[test]
    fn price_must_exceed_ten() {
        let mut book = payload();
        book.price = 10;
        assert_eq!(failed_fields(&book), vec!["price"]);
        book.price = 11;
        assert!(book.validate().is_ok());
    }

    #[test]
    fn length_bounds_are_inclusive() {
        let mut book = payload();
        book.title = "t".repeat(TITLE_MAX_CHARS);
        book.author = "a".repeat(AUTHOR_MAX_CHARS);
        book.description = "d".repeat(DESCRIPTION_MAX_CHARS);
        assert!(book.validate().is_ok());

        book.title.push('t');
        book.author.push('a');
        book.description.push('d');
        assert_eq!(failed_fields(&book), vec!["title", "author", "description"]);
    }

    #[test]
    fn empty_strings_are_rejected() {
        let mut book = payload();
        book.title.clear();
        book.author.clear();
        book.description.clear();
        assert_eq!(failed_fields(&book), vec!["title", "author", "description"]);
    }

    #[test]
    fn update_requires_book_id() {
        let book = payload();
        assert_eq!(book.target_id().unwrap_err()["field"], "book_id");

        let with_id: BookPayload = serde_json::from_value(json!({
            "book_id": "65f1c0ffee0000000000beef",
            "title": "Dune",
            "author": "Herbert",
            "description": "Sci-fi",
            "price": 20,
            "stock": 5,
            "sold_items": 0
        }))
        .unwrap();
        assert_eq!(with_id.target_id().unwrap(), "65f1c0ffee0000000000beef");
    }

    #[test]
    fn fields_round_into_book() {
        let id = ObjectId::new();
        let book = payload().fields().into_book(id);
        assert_eq!(book.id, id.to_hex());
        assert_eq!(book.title, "Dune");
        assert_eq!(book.stock, 5);
    }

    #[test]
    fn book_serializes_identifier_as_underscore_id() {
        let book = payload().fields().into_book(ObjectId::new());
        let value = serde_json::to_value(&book).unwrap();
        assert!(value["_id"].is_string());
        assert!(value.get("id").is_none());
    }

    fn search(value: serde_json::Value) -> SearchPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_author_and_title_searches() {
        assert_eq!(
            search(json!({"searchBy": "author", "value": "Herbert"})).criteria(),
            Ok(SearchCriteria::Author("Herbert".to_string()))
        );
        assert_eq!(
            search(json!({"searchBy": "title", "value": "Dune", "min": "", "max": ""})).criteria(),
            Ok(SearchCriteria::Title("Dune".to_string()))
        );
    }

    #[test]
    fn parses_price_bounds_from_strings_or_numbers() {
        assert_eq!(
            search(json!({"searchBy": "price", "value": "", "min": "10", "max": 50})).criteria(),
            Ok(SearchCriteria::Price { min: 10, max: 50 })
        );
    }

    #[test]
    fn rejects_unknown_search_field() {
        let errors = search(json!({"searchBy": "isbn", "value": "x"}))
            .criteria()
            .unwrap_err();
        assert_eq!(errors[0]["field"], "searchBy");
    }

    #[test]
    fn rejects_bad_price_bounds() {
        let errors = search(json!({"searchBy": "price", "min": "cheap"}))
            .criteria()
            .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["min", "max"]);
    }

    #[test]
    fn price_search_excludes_boundaries() {
        let criteria = SearchCriteria::Price { min: 10, max: 50 };
        let mut book = payload().fields();
        for (price, expected) in [(10, false), (11, true), (49, true), (50, false)] {
            book.price = price;
            assert_eq!(criteria.matches(&book), expected, "price {}", price);
        }
    }
}
