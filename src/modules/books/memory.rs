use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use bookstore_db::StoreResult;

use super::{
    models::{Book, BookFields, SearchCriteria},
    repository::BookRepository,
};

/// Process-local books collection.
///
/// Documents keep insertion order. Every operation takes the lock once, so a
/// purchase is observed either entirely or not at all.
#[derive(Debug, Default)]
pub struct InMemoryBookRepository {
    books: RwLock<Vec<(ObjectId, BookFields)>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sort `(key, total)` pairs by total descending, then key ascending, and keep `limit`.
fn ranked(totals: HashMap<String, i64>, limit: usize) -> Vec<String> {
    let mut totals: Vec<(String, i64)> = totals.into_iter().collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals.into_iter().take(limit).map(|(key, _)| key).collect()
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn ensure_indexes(&self) -> StoreResult<()> {
        tracing::debug!("in-memory store has no indexes to create");
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        Ok(books
            .iter()
            .map(|(id, fields)| fields.clone().into_book(*id))
            .collect())
    }

    async fn get(&self, id: ObjectId) -> StoreResult<Option<Book>> {
        let books = self.books.read().await;
        Ok(books
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(id, fields)| fields.clone().into_book(*id)))
    }

    async fn insert(&self, fields: BookFields) -> StoreResult<ObjectId> {
        let id = ObjectId::new();
        self.books.write().await.push((id, fields));
        Ok(id)
    }

    async fn update(&self, id: ObjectId, fields: BookFields) -> StoreResult<bool> {
        let mut books = self.books.write().await;
        match books.iter_mut().find(|(candidate, _)| *candidate == id) {
            Some((_, stored)) if *stored != fields => {
                *stored = fields;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: ObjectId) -> StoreResult<bool> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|(candidate, _)| *candidate != id);
        Ok(books.len() < before)
    }

    async fn search(&self, criteria: &SearchCriteria) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        Ok(books
            .iter()
            .filter(|(_, fields)| criteria.matches(fields))
            .map(|(id, fields)| fields.clone().into_book(*id))
            .collect())
    }

    async fn top_authors(&self, limit: usize) -> StoreResult<Vec<String>> {
        let books = self.books.read().await;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for (_, fields) in books.iter() {
            *counts.entry(fields.author.clone()).or_default() += 1;
        }
        Ok(ranked(counts, limit))
    }

    async fn top_selling_titles(&self, limit: usize) -> StoreResult<Vec<String>> {
        let books = self.books.read().await;
        let mut sold: HashMap<String, i64> = HashMap::new();
        for (_, fields) in books.iter() {
            *sold.entry(fields.title.clone()).or_default() += fields.sold_items;
        }
        Ok(ranked(sold, limit))
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.books.read().await.len() as u64)
    }

    async fn purchase(&self, id: ObjectId) -> StoreResult<()> {
        let mut books = self.books.write().await;
        if let Some((_, fields)) = books.iter_mut().find(|(candidate, _)| *candidate == id) {
            fields.stock -= 1;
            fields.sold_items += 1;
        }
        Ok(())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}
