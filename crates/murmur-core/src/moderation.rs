//! Moderation and listing over stored feedback.

use tracing::info;

use crate::error::FeedbackError;
use crate::store::Store;
use crate::types::FeedbackRecord;

pub const DEFAULT_LIMIT: usize = 50;

/// Filters and window for [`ModerationService::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<String>,
    pub moderated: Option<bool>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: None,
            moderated: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackPage {
    pub records: Vec<FeedbackRecord>,
    /// Size of the filtered set before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Presence-based partial update: `None` keeps the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModerationPatch {
    pub moderated: Option<bool>,
    pub archived: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ModerationService {
    store: Store,
}

impl ModerationService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Filter, sort newest-first and paginate.
    pub async fn list(&self, query: &ListQuery) -> FeedbackPage {
        let mut matches: Vec<FeedbackRecord> = self
            .store
            .read(|doc| {
                doc.feedback
                    .iter()
                    .filter(|r| query.moderated.map_or(true, |m| r.moderated == m))
                    .filter(|r| query.page.as_deref().map_or(true, |p| r.page == p))
                    .cloned()
                    .collect()
            })
            .await;

        // `sort_by` is stable, so equal timestamps keep insertion order.
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matches.len();
        let records = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        FeedbackPage {
            records,
            total,
            limit: query.limit,
            offset: query.offset,
            has_more: query.offset.saturating_add(query.limit) < total,
        }
    }

    /// Apply `patch` to the record with `id`.
    pub async fn moderate(&self, id: &str, patch: ModerationPatch) -> Result<FeedbackRecord, FeedbackError> {
        let record = self
            .store
            .mutate(|doc| {
                let record = doc
                    .find_mut(id)
                    .ok_or_else(|| FeedbackError::NotFound(id.to_string()))?;
                if let Some(moderated) = patch.moderated {
                    record.moderated = moderated;
                }
                if let Some(archived) = patch.archived {
                    record.archived = archived;
                }
                Ok::<_, FeedbackError>(record.clone())
            })
            .await?;

        info!(
            id = %record.id,
            moderated = record.moderated,
            archived = record.archived,
            "feedback moderated"
        );
        Ok(record)
    }
}
