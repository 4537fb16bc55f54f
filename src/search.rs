use serde_json::Value;

use crate::models::UserRecord;

pub const DEFAULT_SEARCH_KEY: &str = "name";

/// A record that exposes string fields by key.
pub trait Searchable {
    fn search_field(&self, key: &str) -> Option<&str>;
}

impl Searchable for Value {
    fn search_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl Searchable for UserRecord {
    fn search_field(&self, key: &str) -> Option<&str> {
        match key {
            "id" | "_id" => self.id.as_deref(),
            "status" => self.status.as_deref(),
            other => self.fields.get(other).and_then(Value::as_str),
        }
    }
}

/// Case-insensitive substring filter over a borrowed collection.
#[derive(Debug)]
pub struct SearchFilter<'a, T> {
    items: &'a [T],
    key: String,
    query: String,
}

impl<'a, T: Searchable> SearchFilter<'a, T> {
    #[cfg(test)]
    pub fn new(items: &'a [T]) -> Self {
        Self::with_key(items, DEFAULT_SEARCH_KEY)
    }

    pub fn with_key(items: &'a [T], key: impl Into<String>) -> Self {
        Self {
            items,
            key: key.into(),
            query: String::new(),
        }
    }

    #[cfg(test)]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Stored verbatim; trimming happens when the view is computed.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Recomputed on every call. A blank query yields every item.
    pub fn filtered_view(&self) -> Vec<&'a T> {
        let term = self.query.trim().to_lowercase();
        if term.is_empty() {
            return self.items.iter().collect();
        }

        let key = self.key.as_str();
        self.items
            .iter()
            .filter(|item| {
                item.search_field(key)
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&term)
            })
            .collect()
    }
}
