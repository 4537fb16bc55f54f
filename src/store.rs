use std::future::Future;

use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Last fetched list of a resource plus the loading/error pair shown next to it.
#[derive(Debug, Default)]
pub struct CollectionStore {
    items: Vec<Value>,
    loading: bool,
    error: Option<String>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Runs `fetch`, keeping the previous items if it fails.
    ///
    /// The failure is both recorded on the store and returned.
    pub async fn load<F>(&mut self, fetch: F) -> ApiResult<&[Value]>
    where
        F: Future<Output = Result<Vec<Value>, ApiError>>,
    {
        self.loading = true;
        self.error = None;
        let outcome = fetch.await;
        self.loading = false;

        match outcome {
            Ok(items) => {
                self.items = items;
                Ok(&self.items)
            }
            Err(err) => {
                self.error = Some(err.message());
                Err(err)
            }
        }
    }

    pub fn with_status(&self, status: &str) -> Vec<&Value> {
        self.items
            .iter()
            .filter(|item| item.get("status").and_then(Value::as_str) == Some(status))
            .collect()
    }

    /// Sum of a numeric field over the items with `status`; missing values count as zero.
    pub fn sum_where_status(&self, field: &str, status: &str) -> f64 {
        self.with_status(status)
            .into_iter()
            .filter_map(|item| item.get(field).and_then(Value::as_f64))
            .sum()
    }
}

/// Headline figures for the payments screen.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PaymentSummary {
    pub completed: usize,
    pub pending: usize,
    pub total_revenue: f64,
}

impl PaymentSummary {
    pub fn from_store(store: &CollectionStore) -> Self {
        Self {
            completed: store.with_status("completed").len(),
            pending: store.with_status("pending").len(),
            total_revenue: store.sum_where_status("amount", "completed"),
        }
    }
}
