//! Per-document orchestration: normalize, segment, filter, deduplicate.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::container::{ContainerFilter, ContainerFilterConfig};
use crate::dedup::deduplicate;
use crate::normalize::normalize_text;
use crate::segment::{Segmenter, SegmenterConfig};
use crate::store::Store;
use crate::tokenizer::{SentenceTokenizer, UnicodeSentenceTokenizer};

/// Runs extracted text through the paragraph pipeline into a [`Store`].
pub struct DocumentProcessor {
    segmenter: Segmenter,
    filter: ContainerFilter,
}

impl DocumentProcessor {
    pub fn new(segmenter: Segmenter, filter: ContainerFilter) -> Self {
        Self { segmenter, filter }
    }

    /// Processor using the Unicode sentence tokenizer.
    pub fn from_config(segmentation: SegmenterConfig, container: ContainerFilterConfig) -> Self {
        let tokenizer: Arc<dyn SentenceTokenizer> = Arc::new(UnicodeSentenceTokenizer::new());
        Self::new(
            Segmenter::new(segmentation, tokenizer),
            ContainerFilter::new(container),
        )
    }

    /// Paragraphs `text` would produce, without touching storage.
    pub fn paragraphs(&self, text: &str) -> Vec<String> {
        let normalized = normalize_text(text);
        let segmented = self.segmenter.segment_classified(&normalized);
        let segmented_count = segmented.len();
        let filtered = self.filter.filter(segmented);
        debug!(
            segmented = segmented_count,
            kept = filtered.len(),
            "segmentation finished"
        );
        filtered
    }

    /// Process one document's text and return the associations created.
    pub async fn process_document<S: Store + ?Sized>(
        &self,
        store: &S,
        text: &str,
        document_id: &str,
    ) -> Result<usize> {
        let paragraphs = self.paragraphs(text);
        if paragraphs.is_empty() {
            info!(document_id, "no paragraphs found");
            return Ok(0);
        }
        let created = deduplicate(store, document_id, &paragraphs).await?;
        info!(
            document_id,
            paragraphs = paragraphs.len(),
            associations = created,
            "document processed"
        );
        Ok(created)
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::from_config(SegmenterConfig::default(), ContainerFilterConfig::default())
    }
}
