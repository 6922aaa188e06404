//! # Freshness Evaluator
//!
//! Pure decision function: given the stored metadata for a resource (or its
//! absence), decide whether the persistent store can answer, a conditional
//! revalidation is required, or the resource must be fetched outright.

use crate::metadata::CacheMetadata;
use std::time::Duration;

/// What the cache should do for a resource before serving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    /// No usable cache state; fetch without validators.
    FetchUnconditional,
    /// Ask the origin whether the stored body is still current.
    RevalidateConditional,
    /// The stored body is fresh; no network round trip needed.
    ServeFromStore,
}

/// Decide how to serve a resource.
///
/// Rules are evaluated in priority order:
/// 1. no metadata: fetch unconditionally
/// 2. a directive demands revalidation: revalidate if a validator exists,
///    else fetch unconditionally
/// 3. an unexpired positive `max-age`: serve from store (expired or zero
///    falls through)
/// 4. a validator exists: revalidate
/// 5. TTL fallback on the record's timestamp
pub fn evaluate(
    metadata: Option<&CacheMetadata>,
    now: i64,
    ttl: Duration,
) -> FreshnessDecision {
    let Some(meta) = metadata else {
        return FreshnessDecision::FetchUnconditional;
    };

    let age = now.saturating_sub(meta.timestamp);

    if let Some(cache_control) = meta.cache_control.as_deref() {
        if requires_revalidation(cache_control) {
            return if meta.has_validator() {
                FreshnessDecision::RevalidateConditional
            } else {
                FreshnessDecision::FetchUnconditional
            };
        }

        if let Some(max_age) = parse_max_age(cache_control) {
            if max_age > 0 && age < max_age as i64 {
                return FreshnessDecision::ServeFromStore;
            }
            // stale, or max-age=0: fall through to validator/TTL rules
        }
    }

    if meta.has_validator() {
        return FreshnessDecision::RevalidateConditional;
    }

    if age > ttl.as_secs() as i64 {
        FreshnessDecision::FetchUnconditional
    } else {
        FreshnessDecision::ServeFromStore
    }
}

/// Whether the directive set forbids serving without asking the origin.
fn requires_revalidation(cache_control: &str) -> bool {
    cache_control.split(',').any(|directive| {
        let name = directive.trim();
        name.eq_ignore_ascii_case("no-cache")
            || name.eq_ignore_ascii_case("no-store")
            || name.eq_ignore_ascii_case("must-revalidate")
    })
}

/// Extract a `max-age` value in seconds.
///
/// Tolerates surrounding whitespace and optional quoting of the value
/// (`max-age = "3600"`). A malformed value is treated as absent; this must
/// never raise.
fn parse_max_age(cache_control: &str) -> Option<u64> {
    for directive in cache_control.split(',') {
        let mut parts = directive.splitn(2, '=');
        let name = parts.next().unwrap_or("").trim();
        if !name.eq_ignore_ascii_case("max-age") {
            continue;
        }
        let value = parts.next()?.trim().trim_matches('"').trim();
        return value.parse::<u64>().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    fn meta(
        etag: Option<&str>,
        cache_control: Option<&str>,
        timestamp: i64,
    ) -> CacheMetadata {
        CacheMetadata {
            url: "https://example.com/a.wav".to_string(),
            etag: etag.map(str::to_string),
            last_modified: None,
            cache_control: cache_control.map(str::to_string),
            timestamp,
        }
    }

    #[test]
    fn test_no_metadata_fetches_unconditionally() {
        assert_eq!(
            evaluate(None, 1000, TTL),
            FreshnessDecision::FetchUnconditional
        );
    }

    #[test]
    fn test_revalidation_directives_win_over_max_age() {
        for directive in ["no-cache", "No-Cache", "max-age=9999, must-revalidate", "no-store"] {
            let with_validator = meta(Some("\"v1\""), Some(directive), 999);
            assert_eq!(
                evaluate(Some(&with_validator), 1000, TTL),
                FreshnessDecision::RevalidateConditional,
                "directive: {directive}"
            );

            let without_validator = meta(None, Some(directive), 999);
            assert_eq!(
                evaluate(Some(&without_validator), 1000, TTL),
                FreshnessDecision::FetchUnconditional,
                "directive: {directive}"
            );
        }
    }

    #[test]
    fn test_unexpired_max_age_serves_from_store() {
        let m = meta(Some("\"v1\""), Some("public, max-age=3600"), 1000);
        assert_eq!(
            evaluate(Some(&m), 1000 + 3599, TTL),
            FreshnessDecision::ServeFromStore
        );
    }

    #[test]
    fn test_expired_max_age_falls_through_to_validator() {
        let m = meta(Some("\"v1\""), Some("max-age=3600"), 1000);
        assert_eq!(
            evaluate(Some(&m), 1000 + 3600, TTL),
            FreshnessDecision::RevalidateConditional
        );
    }

    #[test]
    fn test_max_age_zero_falls_through() {
        let m = meta(None, Some("max-age=0"), 1000);
        // no validator, within TTL: the TTL fallback serves from store
        assert_eq!(
            evaluate(Some(&m), 1001, TTL),
            FreshnessDecision::ServeFromStore
        );
    }

    #[test]
    fn test_quoted_and_spaced_max_age_parses() {
        assert_eq!(parse_max_age("max-age = \"3600\""), Some(3600));
        assert_eq!(parse_max_age("public, MAX-AGE=60"), Some(60));
        assert_eq!(parse_max_age("  max-age=\t7200 "), Some(7200));
    }

    #[test]
    fn test_malformed_max_age_is_absent() {
        assert_eq!(parse_max_age("max-age"), None);
        assert_eq!(parse_max_age("max-age="), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
        assert_eq!(parse_max_age("max-age=-5"), None);

        // malformed value falls through to the validator rule, not an error
        let m = meta(Some("\"v1\""), Some("max-age=abc"), 1000);
        assert_eq!(
            evaluate(Some(&m), 1001, TTL),
            FreshnessDecision::RevalidateConditional
        );
    }

    #[test]
    fn test_validator_triggers_revalidation_within_ttl() {
        let m = meta(Some("\"v1\""), None, 999);
        assert_eq!(
            evaluate(Some(&m), 1000, TTL),
            FreshnessDecision::RevalidateConditional
        );
    }

    #[test]
    fn test_ttl_fallback_without_validator() {
        let fresh = meta(None, None, 1000);
        assert_eq!(
            evaluate(Some(&fresh), 1000 + TTL.as_secs() as i64, TTL),
            FreshnessDecision::ServeFromStore
        );
        assert_eq!(
            evaluate(Some(&fresh), 1000 + TTL.as_secs() as i64 + 1, TTL),
            FreshnessDecision::FetchUnconditional
        );
    }

    #[test]
    fn test_last_modified_counts_as_validator() {
        let mut m = meta(None, None, 0);
        m.last_modified = Some("Mon, 01 Jan 2024 00:00:00 GMT".to_string());
        assert_eq!(
            evaluate(Some(&m), 10, TTL),
            FreshnessDecision::RevalidateConditional
        );
    }
}
