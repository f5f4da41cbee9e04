use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use bookstore_db::{StoreError, StoreResult};

use super::{
    models::{Book, BookFields, SearchCriteria},
    repository::BookRepository,
};

const INDEXED_FIELDS: &[&str] = &["title", "author"];

/// Stored shape of a book. Unknown fields on existing documents are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    author: String,
    description: String,
    price: i64,
    stock: i64,
    sold_items: i64,
}

impl From<BookDocument> for Book {
    fn from(doc: BookDocument) -> Self {
        Book {
            id: doc.id.to_hex(),
            title: doc.title,
            author: doc.author,
            description: doc.description,
            price: doc.price,
            stock: doc.stock,
            sold_items: doc.sold_items,
        }
    }
}

fn set_fields(fields: &BookFields) -> Document {
    doc! {
        "$set": {
            "title": &fields.title,
            "author": &fields.author,
            "description": &fields.description,
            "price": fields.price,
            "stock": fields.stock,
            "sold_items": fields.sold_items,
        }
    }
}

fn search_filter(criteria: &SearchCriteria) -> Document {
    match criteria {
        SearchCriteria::Author(author) => doc! { "author": { "$eq": author } },
        SearchCriteria::Title(title) => doc! { "title": { "$eq": title } },
        SearchCriteria::Price { min, max } => doc! { "price": { "$gt": *min, "$lt": *max } },
    }
}

fn top_authors_pipeline(limit: usize) -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$author", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
        doc! { "$limit": limit as i64 },
    ]
}

fn top_selling_pipeline(limit: usize) -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$title", "total_sold": { "$sum": "$sold_items" } } },
        doc! { "$sort": { "total_sold": -1, "_id": 1 } },
        doc! { "$limit": limit as i64 },
    ]
}

/// Books collection in MongoDB.
#[derive(Debug, Clone)]
pub struct MongoBookRepository {
    client: Client,
    collection: Collection<BookDocument>,
}

impl MongoBookRepository {
    pub fn new(client: Client, collection: Collection<Document>) -> Self {
        Self {
            client,
            collection: collection.clone_with_type(),
        }
    }

    async fn group_keys(&self, pipeline: Vec<Document>) -> StoreResult<Vec<String>> {
        Ok(self
            .collection
            .aggregate(pipeline)
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .iter()
            .filter_map(|group| group.get_str("_id").ok().map(str::to_owned))
            .collect())
    }

    async fn find(&self, filter: Document) -> StoreResult<Vec<Book>> {
        Ok(self
            .collection
            .find(filter)
            .await?
            .try_collect::<Vec<BookDocument>>()
            .await?
            .into_iter()
            .map(Book::from)
            .collect())
    }
}

#[async_trait]
impl BookRepository for MongoBookRepository {
    async fn ensure_indexes(&self) -> StoreResult<()> {
        bookstore_db::ensure_indexes(&self.collection, INDEXED_FIELDS).await
    }

    async fn list(&self) -> StoreResult<Vec<Book>> {
        self.find(doc! {}).await
    }

    async fn get(&self, id: ObjectId) -> StoreResult<Option<Book>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": id })
            .await?
            .map(Book::from))
    }

    async fn insert(&self, fields: BookFields) -> StoreResult<ObjectId> {
        let result = self
            .collection
            .clone_with_type::<BookFields>()
            .insert_one(&fields)
            .await?;

        result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::Backend(format!(
                "store assigned a non-ObjectId identifier: {}",
                result.inserted_id
            ))
        })
    }

    async fn update(&self, id: ObjectId, fields: BookFields) -> StoreResult<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, set_fields(&fields))
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn delete(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count == 1)
    }

    async fn search(&self, criteria: &SearchCriteria) -> StoreResult<Vec<Book>> {
        self.find(search_filter(criteria)).await
    }

    async fn top_authors(&self, limit: usize) -> StoreResult<Vec<String>> {
        self.group_keys(top_authors_pipeline(limit)).await
    }

    async fn top_selling_titles(&self, limit: usize) -> StoreResult<Vec<String>> {
        self.group_keys(top_selling_pipeline(limit)).await
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn purchase(&self, id: ObjectId) -> StoreResult<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$inc": { "sold_items": 1, "stock": -1 } },
            )
            .await?;
        Ok(())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        tracing::info!(target: "bookstore-db", "mongodb client shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_filter_is_an_open_interval() {
        let filter = search_filter(&SearchCriteria::Price { min: 10, max: 50 });
        assert_eq!(filter, doc! { "price": { "$gt": 10_i64, "$lt": 50_i64 } });
    }

    #[test]
    fn author_and_title_filters_are_exact() {
        assert_eq!(
            search_filter(&SearchCriteria::Author("Herbert".into())),
            doc! { "author": { "$eq": "Herbert" } }
        );
        assert_eq!(
            search_filter(&SearchCriteria::Title("Dune".into())),
            doc! { "title": { "$eq": "Dune" } }
        );
    }

    #[test]
    fn update_sets_every_field_but_the_identifier() {
        let fields = BookFields {
            title: "Dune".into(),
            author: "Herbert".into(),
            description: "Sci-fi".into(),
            price: 20,
            stock: 5,
            sold_items: 0,
        };
        let update = set_fields(&fields);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.len(), 6);
        assert!(!set.contains_key("_id"));
        assert!(!set.contains_key("book_id"));
        assert_eq!(set.get_i64("price").unwrap(), 20);
    }

    #[test]
    fn top_authors_counts_each_book_once() {
        let pipeline = top_authors_pipeline(5);
        assert_eq!(
            pipeline[0],
            doc! { "$group": { "_id": "$author", "count": { "$sum": 1 } } }
        );
        assert_eq!(pipeline[2], doc! { "$limit": 5_i64 });
    }

    #[test]
    fn top_selling_sorts_highest_first() {
        let pipeline = top_selling_pipeline(5);
        assert_eq!(
            pipeline[1],
            doc! { "$sort": { "total_sold": -1, "_id": 1 } }
        );
    }
}
