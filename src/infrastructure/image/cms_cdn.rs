//! CMS image CDN URL sizing.
//!
//! Article illustrations and animal photos published through the CMS are
//! served by an image CDN that renders resized variants on request. Asking for
//! a width close to the display size keeps both bandwidth and cache cost down.

/// Host of the CMS image CDN.
pub const CMS_CDN_HOST: &str = "cdn.sanity.io";

/// Default maximum width requested from the CDN.
pub const DEFAULT_MAX_WIDTH: u32 = 1080;

/// Query parameters owned by [`size_cdn_url`].
const SIZING_PARAMS: [&str; 5] = ["w", "h", "fit", "auto", "fm"];

/// Checks if a URL points at the CMS image CDN.
#[must_use]
pub fn is_cms_cdn_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.starts_with(CMS_CDN_HOST) && rest[CMS_CDN_HOST.len()..].starts_with("/images/")
}

/// Requests a rendition at most `max_width` pixels wide in the best format the
/// CDN can serve.
///
/// Returns the URL unchanged if it is not a CMS CDN image or `max_width` is 0.
/// Unrelated query parameters are preserved.
#[must_use]
pub fn size_cdn_url(url: &str, max_width: u32) -> String {
    if max_width == 0 || !is_cms_cdn_url(url) {
        return url.to_string();
    }

    let (base_url, existing_params) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let mut params = vec![
        format!("w={max_width}"),
        "fit=max".to_string(),
        "auto=format".to_string(),
    ];

    if let Some(existing) = existing_params {
        for param in existing.split('&').filter(|p| !p.is_empty()) {
            let key = param.split('=').next().unwrap_or("");
            if !SIZING_PARAMS.contains(&key) {
                params.push(param.to_string());
            }
        }
    }

    format!("{}?{}", base_url, params.join("&"))
}

/// Sizes a URL with the default width.
#[must_use]
pub fn size_cdn_url_default(url: &str) -> String {
    size_cdn_url(url, DEFAULT_MAX_WIDTH)
}
