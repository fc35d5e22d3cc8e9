use tracing::{info, warn};

use super::{FaqIndex, IndexError, IndexLocation};
use crate::embedding::{Embedder, EmbedderIdentity};
use crate::faq::FaqEntry;

/// Result of an offline index build.
#[derive(Debug)]
pub struct RebuildOutcome {
    pub embedder: EmbedderIdentity,
    pub entries: usize,
    pub fell_back: bool,
}

/// Full rebuild with `primary`. When the primary embedder reports a quota or
/// rate-limit error, the build is retried once with `fallback`. Any other
/// error aborts the build.
pub async fn build_with_fallback<P, F>(
    primary: P,
    fallback: impl FnOnce() -> F,
    location: &IndexLocation,
    faqs: Vec<FaqEntry>,
) -> Result<RebuildOutcome, IndexError>
where
    P: Embedder,
    F: Embedder,
{
    let primary_identity = primary.identity();
    match FaqIndex::build(primary, location, faqs.clone()).await {
        Ok(index) => Ok(RebuildOutcome {
            embedder: index.identity(),
            entries: index.len(),
            fell_back: false,
        }),
        Err(IndexError::Embedding(e)) if e.is_quota_class() => {
            let fallback = fallback();
            warn!(
                error = %e,
                from = %primary_identity,
                to = %fallback.identity(),
                "embedding quota exceeded, switching to the free embedder"
            );
            let index = FaqIndex::build(fallback, location, faqs).await?;
            info!(entries = index.len(), "index rebuilt with fallback embedder");
            Ok(RebuildOutcome {
                embedder: index.identity(),
                entries: index.len(),
                fell_back: true,
            })
        }
        Err(e) => Err(e),
    }
}
