use std::collections::HashMap;
use std::future::Future;

use crate::error::Result;
use crate::models::TargetId;

/// Read-only collaborator resolving display titles for the content entities
/// menu items point at. Resolution is batched per menu render; a target the
/// repository cannot resolve is simply absent from the returned map.
pub trait ContentRepository {
    fn titles_for(
        &self,
        target_ids: &[TargetId],
    ) -> impl Future<Output = Result<HashMap<TargetId, String>>> + Send;
}

/// In-memory title source for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticTitles {
    titles: HashMap<TargetId, String>,
}

impl StaticTitles {
    pub fn new(titles: HashMap<TargetId, String>) -> Self {
        Self { titles }
    }

    pub fn insert(&mut self, target_id: TargetId, title: impl Into<String>) {
        self.titles.insert(target_id, title.into());
    }
}

impl ContentRepository for StaticTitles {
    fn titles_for(
        &self,
        target_ids: &[TargetId],
    ) -> impl Future<Output = Result<HashMap<TargetId, String>>> + Send {
        let resolved: HashMap<TargetId, String> = target_ids
            .iter()
            .filter_map(|target_id| {
                self.titles
                    .get(target_id)
                    .map(|title| (*target_id, title.clone()))
            })
            .collect();
        async move { Ok(resolved) }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn static_titles_resolve_known_targets_only() {
        let known = TargetId(Uuid::from_u128(1));
        let unknown = TargetId(Uuid::from_u128(2));
        let mut repository = StaticTitles::default();
        repository.insert(known, "Home");

        let titles = repository
            .titles_for(&[known, unknown])
            .await
            .expect("lookup should succeed");
        assert_eq!(titles.get(&known).map(String::as_str), Some("Home"));
        assert!(!titles.contains_key(&unknown));
    }
}
