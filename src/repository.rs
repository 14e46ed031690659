//! Annotation persistence: backend first, local cache as the offline copy.

use crate::cache::{Cache, CachedDetections, detection_cache_key};
use crate::detection::{Detection, now_timestamp};
use crate::gateway::{ApiClient, GatewayError};
use crate::store::type_breakdown;
use std::future::Future;

/// The part of the backend the repository needs.
pub trait AnnotationGateway {
    fn fetch_annotations(
        &self,
        inspection_id: &str,
    ) -> impl Future<Output = Result<Vec<Detection>, GatewayError>> + Send;

    fn store_annotations(
        &self,
        transformer_id: &str,
        inspection_id: &str,
        detections: &[Detection],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl AnnotationGateway for ApiClient {
    async fn fetch_annotations(&self, inspection_id: &str) -> Result<Vec<Detection>, GatewayError> {
        Ok(self.get_annotations(inspection_id).await?.detections)
    }

    async fn store_annotations(
        &self,
        transformer_id: &str,
        inspection_id: &str,
        detections: &[Detection],
    ) -> Result<(), GatewayError> {
        self.save_annotations(transformer_id, inspection_id, detections)
            .await
            .map(|_| ())
    }
}

/// Where a loaded detection list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    /// Local copy; `stale` is set because the backend did not confirm it.
    Cache { stale: bool },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub detections: Vec<Detection>,
    pub source: Source,
}

impl Loaded {
    pub fn is_stale(&self) -> bool {
        matches!(self.source, Source::Cache { stale: true })
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    /// Kept in the local cache only; the backend call failed.
    LocalOnly(GatewayError),
}

pub struct AnnotationRepository<G, C> {
    gateway: G,
    cache: C,
    user: String,
}

impl<G: AnnotationGateway, C: Cache> AnnotationRepository<G, C> {
    pub fn new(gateway: G, cache: C, user: impl Into<String>) -> Self {
        Self {
            gateway,
            cache,
            user: user.into(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Detections for an inspection. The backend answer wins; the cache is
    /// only read when the backend fails or has nothing.
    pub async fn load(&self, transformer_id: &str, inspection_id: &str) -> Loaded {
        let now = now_timestamp();
        match self.gateway.fetch_annotations(inspection_id).await {
            Ok(mut detections) if !detections.is_empty() => {
                for d in &mut detections {
                    d.fill_provenance(&self.user, &now);
                }
                log::info!(
                    "loaded {} annotations for inspection {inspection_id}",
                    detections.len()
                );
                return Loaded {
                    detections,
                    source: Source::Remote,
                };
            }
            Ok(_) => log::debug!("backend has no annotations for inspection {inspection_id}"),
            Err(e) => log::warn!("annotation fetch for inspection {inspection_id} failed: {e}"),
        }

        let key = detection_cache_key(transformer_id, inspection_id);
        match self.cache.get::<CachedDetections>(&key) {
            Some(entry) if !entry.detections.is_empty() => {
                log::warn!("using cached annotations for inspection {inspection_id}");
                let mut detections = entry.detections;
                for d in &mut detections {
                    d.fill_provenance(&self.user, &now);
                }
                Loaded {
                    detections,
                    source: Source::Cache { stale: true },
                }
            }
            _ => Loaded {
                detections: Vec::new(),
                source: Source::Empty,
            },
        }
    }

    /// Persist confirmed edits: cache first, then the backend.
    pub async fn save(
        &self,
        transformer_id: &str,
        inspection_id: &str,
        detections: &[Detection],
    ) -> SaveOutcome {
        let entry = CachedDetections {
            detections: detections.to_vec(),
            analysis_date: now_timestamp(),
            transformer_id: transformer_id.to_string(),
            inspection_id: inspection_id.to_string(),
            edits_confirmed: Some(true),
            re_analyzed: None,
            annotation_type_breakdown: Some(type_breakdown(detections)),
        };
        self.write_cache(&entry);

        match self
            .gateway
            .store_annotations(transformer_id, inspection_id, detections)
            .await
        {
            Ok(()) => SaveOutcome::Saved,
            Err(e) => {
                log::warn!("annotations for inspection {inspection_id} kept locally only: {e}");
                SaveOutcome::LocalOnly(e)
            }
        }
    }

    /// Remember a fresh analysis result locally.
    pub fn cache_analysis(&self, transformer_id: &str, inspection_id: &str, detections: &[Detection]) {
        self.write_cache(&CachedDetections {
            detections: detections.to_vec(),
            analysis_date: now_timestamp(),
            transformer_id: transformer_id.to_string(),
            inspection_id: inspection_id.to_string(),
            edits_confirmed: None,
            re_analyzed: Some(true),
            annotation_type_breakdown: None,
        });
    }

    /// Forget the local copy, e.g. before re-analysis or after the
    /// inspection is deleted.
    pub fn clear(&self, transformer_id: &str, inspection_id: &str) {
        let key = detection_cache_key(transformer_id, inspection_id);
        if let Err(e) = self.cache.remove(&key) {
            log::warn!("could not clear cache entry {key}: {e}");
        }
    }

    fn write_cache(&self, entry: &CachedDetections) {
        let key = detection_cache_key(&entry.transformer_id, &entry.inspection_id);
        if let Err(e) = self.cache.set(&key, entry) {
            log::warn!("could not write cache entry {key}: {e}");
        }
    }
}
