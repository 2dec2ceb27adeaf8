//! Per-request locale carried in a task-local.

use std::future::Future;

pub const DEFAULT_LOCALE: &str = "en";

tokio::task_local! {
    static LOCALE: String;
}

/// Run `fut` with `locale` as the current locale.
pub async fn with_locale<F>(locale: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    LOCALE.scope(locale.into(), fut).await
}

/// Locale of the running request, `en` outside any scope.
pub fn current_locale() -> String {
    LOCALE
        .try_with(|locale| locale.clone())
        .unwrap_or_else(|_| DEFAULT_LOCALE.to_string())
}

/// Primary language tags of an `Accept-Language` header, best first.
/// `ar-EG,en;q=0.8` gives `["ar", "en"]`; wildcards and `q=0` are dropped.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }

            let quality = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if quality <= 0.0 {
                return None;
            }

            let primary = tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();
            Some((primary, quality))
        })
        .collect();

    // Stable sort keeps header order for equal weights.
    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = Vec::new();
    for (tag, _) in tags {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
