//! Cloudflare R2 storage module
//!
//! Handles image upload and cleanup for posts and profiles. Every call
//! made through the helpers below is best-effort: callers never see a
//! storage failure.

mod media;

#[cfg(test)]
pub use media::MockMediaStore;
pub use media::{MediaStorage, MediaStore};

use crate::metrics::MEDIA_OPERATIONS_TOTAL;

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}

/// Outcome of a best-effort upload
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    /// Value to persist as the image reference
    pub reference: String,
    /// Whether the payload actually went to the store
    pub uploaded: bool,
}

/// Upload `payload`, falling back to the raw payload on any failure
pub async fn store_or_fallback(store: &dyn MediaStore, payload: &str) -> StoredMedia {
    match store.upload(payload).await {
        Ok(reference) => {
            MEDIA_OPERATIONS_TOTAL
                .with_label_values(&["upload", "ok"])
                .inc();
            StoredMedia {
                reference,
                uploaded: true,
            }
        }
        Err(error) => {
            MEDIA_OPERATIONS_TOTAL
                .with_label_values(&["upload", "fallback"])
                .inc();
            tracing::warn!(%error, "Image upload failed; storing original payload");
            StoredMedia {
                reference: payload.to_string(),
                uploaded: false,
            }
        }
    }
}

/// Remove a stored image, logging and swallowing any failure
///
/// Inline payloads were never uploaded and are skipped.
pub async fn discard_best_effort(store: &dyn MediaStore, reference: &str) {
    if reference.is_empty() || reference.starts_with("data:") {
        return;
    }

    match store.delete(reference).await {
        Ok(()) => {
            MEDIA_OPERATIONS_TOTAL
                .with_label_values(&["delete", "ok"])
                .inc();
        }
        Err(error) => {
            MEDIA_OPERATIONS_TOTAL
                .with_label_values(&["delete", "failed"])
                .inc();
            tracing::warn!(%error, reference, "Image cleanup failed");
        }
    }
}
