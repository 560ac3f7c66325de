use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::{KeywordClaim, Repository};
use crate::error::{AppError, Result};
use crate::models::{
    normalize_keyword, CannibalizationCheck, CannibalizedKeyword, ContentItem, KeywordMapping,
    KeywordMappingRow, NewKeywordMapping,
};

pub struct KeywordService {
    repository: Arc<Repository>,
}

impl KeywordService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// Look up an active mapping for `keyword` held by any content other than `exclude_id`.
    pub async fn check_keyword_cannibalization(
        &self,
        keyword: &str,
        exclude_id: Option<i64>,
    ) -> Result<CannibalizationCheck> {
        let keyword = normalize_keyword(keyword);
        let existing = self
            .repository
            .find_active_mapping(&keyword, exclude_id)
            .await?;

        Ok(match existing {
            Some(mapping) => CannibalizationCheck {
                exists: true,
                url: Some(mapping.url),
                content_id: Some(mapping.content_id),
            },
            None => CannibalizationCheck::default(),
        })
    }

    /// Bind a keyword to one page. Re-mapping to the same page updates it in place.
    pub async fn map_keyword(&self, mapping: NewKeywordMapping) -> Result<KeywordMapping> {
        let keyword = normalize_keyword(&mapping.keyword);
        if keyword.is_empty() {
            return Err(AppError::bad_request("keyword must not be empty"));
        }
        let url = mapping.url.trim().to_string();
        if url.is_empty() {
            return Err(AppError::bad_request("url must not be empty"));
        }

        if self.repository.get_content(mapping.content_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Content {} not found",
                mapping.content_id
            )));
        }

        let claim = self
            .repository
            .claim_keyword_mapping(NewKeywordMapping {
                keyword,
                url,
                ..mapping
            })
            .await?;
        match claim {
            KeywordClaim::Saved(saved) => {
                tracing::info!(
                    keyword = %saved.keyword,
                    content_id = saved.content_id,
                    "Mapped keyword"
                );
                Ok(saved)
            }
            KeywordClaim::Held(holder) => Err(AppError::conflict(format!(
                "Keyword \"{}\" is already mapped to {} (content {})",
                holder.keyword, holder.url, holder.content_id
            ))),
        }
    }

    pub async fn list_keyword_mappings(&self) -> Result<Vec<KeywordMappingRow>> {
        self.repository.get_keyword_mappings().await
    }

    /// Primary keywords shared by two or more pages.
    pub async fn detect_cannibalization(&self) -> Result<Vec<CannibalizedKeyword>> {
        let all = self.repository.get_all_content().await?;
        Ok(group_cannibalized(&all))
    }
}

pub fn group_cannibalized(all: &[ContentItem]) -> Vec<CannibalizedKeyword> {
    let mut groups: BTreeMap<String, Vec<&ContentItem>> = BTreeMap::new();
    for item in all {
        if let Some(keyword) = item.primary_keyword.as_deref().map(normalize_keyword) {
            if !keyword.is_empty() {
                groups.entry(keyword).or_default().push(item);
            }
        }
    }

    groups
        .into_iter()
        .filter(|(_, items)| items.len() > 1)
        .map(|(keyword, items)| CannibalizedKeyword {
            keyword,
            count: items.len(),
            contents: items.into_iter().map(ContentItem::summary).collect(),
        })
        .collect()
}
