use serde::{Deserialize, Serialize};

/// Derived navigation links for one content item.
///
/// The bundle is a cache: it can always be discarded and rebuilt from the
/// content table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBundle {
    pub parent: ParentLink,
    #[serde(default)]
    pub siblings: Vec<ContentLink>,
    #[serde(default)]
    pub related: Vec<ContentLink>,
    #[serde(default)]
    pub prev_next: PrevNext,
}

impl LinkBundle {
    /// Ids of every content item this bundle points at.
    pub fn target_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.siblings
            .iter()
            .chain(self.related.iter())
            .chain(self.prev_next.prev.iter())
            .chain(self.prev_next.next.iter())
            .map(|link| link.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLink {
    pub id: i64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevNext {
    pub prev: Option<ContentLink>,
    pub next: Option<ContentLink>,
}

/// Content item with no inbound internal links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanPage {
    pub id: i64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFailure {
    pub content_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationSummary {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<LinkFailure>,
}
