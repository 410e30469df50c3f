use crate::domain::model::{Classification, ClassificationRequest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// A raw corpus document, named so load errors can point at it.
#[derive(Debug, Clone)]
pub struct CorpusDocument {
    pub name: String,
    pub data: Vec<u8>,
}

/// Backing storage for the rule corpus. Documents are returned in load order.
pub trait RuleSource: Send + Sync {
    fn location(&self) -> String;
    fn read_documents(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<CorpusDocument>>> + Send;
}

/// Text relevance scoring. Implementations may be slow and may fail.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    async fn classify(&self, request: ClassificationRequest) -> Result<Classification>;
}
