//! Off-thread image decoding.

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::errors::FetchError;

/// Decodes encoded image bytes on the blocking pool.
///
/// # Errors
/// Returns [`FetchError::Decode`] if the bytes are not a supported image or
/// the decode task panicked.
pub async fn decode_image(bytes: Bytes) -> Result<Arc<image::DynamicImage>, FetchError> {
    let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| FetchError::decode(format!("decode task panicked: {e}")))?
        .map_err(|e| FetchError::decode(e.to_string()))?;

    Ok(Arc::new(decoded))
}
