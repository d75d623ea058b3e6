//! Mapping artifact URLs to object keys.

use url::Url;

/// Derive the object key for a stored artifact URL.
///
/// When `public_base_url` is set and prefixes `url`, the remainder is the
/// key. Otherwise the URL path is used, dropping a leading bucket segment for
/// path-style URLs. Returns `None` for URLs that carry no key.
pub fn key_from_url(url: &str, public_base_url: Option<&str>, bucket: &str) -> Option<String> {
    let url = url.trim();

    if let Some(base) = public_base_url.map(|b| b.trim_end_matches('/')).filter(|b| !b.is_empty()) {
        if let Some(rest) = url.strip_prefix(base) {
            let key = rest.split(['?', '#']).next().unwrap_or("").trim_start_matches('/');
            return decode(key);
        }
    }

    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_start_matches('/');
    let key = match path.strip_prefix(bucket) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => path,
    };
    decode(key)
}

fn decode(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    // Object keys are stored unescaped; URL paths carry them percent-encoded.
    let decoded = url::form_urlencoded::parse(format!("k={}", key.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| key.to_string());
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_public_base() {
        assert_eq!(
            key_from_url(
                "https://media.example.com/videos/12/normalized.mp4",
                Some("https://media.example.com/"),
                "media"
            ),
            Some("videos/12/normalized.mp4".to_string())
        );
    }

    #[test]
    fn test_key_from_path_style_url() {
        assert_eq!(
            key_from_url("http://minio:9000/media/videos/1/cfr.mp4?X-Amz-Signature=abc", None, "media"),
            Some("videos/1/cfr.mp4".to_string())
        );
    }

    #[test]
    fn test_key_from_virtual_host_url() {
        assert_eq!(
            key_from_url("https://media.s3.example.com/videos/1/a%20b.mp4", None, "media"),
            Some("videos/1/a b.mp4".to_string())
        );
    }

    #[test]
    fn test_key_keeps_plus_signs() {
        assert_eq!(
            key_from_url("https://cdn.test/clips/a+b.mp4", None, "media"),
            Some("clips/a+b.mp4".to_string())
        );
    }

    #[test]
    fn test_no_key() {
        assert_eq!(key_from_url("https://cdn.test/", None, "media"), None);
        assert_eq!(key_from_url("not a url", None, "media"), None);
    }
}
