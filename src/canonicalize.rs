use crate::error::{GuardError, Result};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A percent-encoded triplet in the raw input.
static PERCENT_TRIPLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[0-9A-Fa-f]{2}").unwrap());

/// Upper bound on fixpoint decode passes for adversarial nested input.
const MAX_DECODE_PASSES: usize = 16;

/// Policy for the canonicalization guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalizationPolicy {
    /// Reject input containing the same encoding scheme applied twice.
    pub restrict_multiple: bool,

    /// Reject input mixing different encoding schemes.
    pub restrict_mixed: bool,

    /// Surface ambiguity as an error instead of degrading silently.
    pub throw_on_error: bool,

    /// Replacement returned when suspected double-encoding is neutralized
    /// without an error. The legacy value is a single space.
    pub suppression_sentinel: String,
}

impl CanonicalizationPolicy {
    pub fn new() -> Self {
        Self {
            restrict_multiple: false,
            restrict_mixed: false,
            throw_on_error: false,
            suppression_sentinel: " ".to_string(),
        }
    }

    pub fn with_restrict_multiple(mut self, restrict: bool) -> Self {
        self.restrict_multiple = restrict;
        self
    }

    pub fn with_restrict_mixed(mut self, restrict: bool) -> Self {
        self.restrict_mixed = restrict;
        self
    }

    pub fn with_throw_on_error(mut self, throw: bool) -> Self {
        self.throw_on_error = throw;
        self
    }

    pub fn with_suppression_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.suppression_sentinel = sentinel.into();
        self
    }
}

impl Default for CanonicalizationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduces input to a single fully decoded canonical form and detects
/// multiple/mixed encoding layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer;

impl Canonicalizer {
    pub fn new() -> Self {
        Self
    }

    /// Fully decode `input`, failing on restricted encoding layering.
    ///
    /// Known schemes (percent-encoding, HTML entities) are applied until a
    /// fixpoint. More than one pass of one scheme is multiple encoding; two
    /// different schemes decoding is mixed encoding.
    pub fn canonicalize(
        &self,
        input: &str,
        restrict_multiple: bool,
        restrict_mixed: bool,
    ) -> Result<String> {
        if input.is_empty() {
            return Ok(String::new());
        }

        let mut working = input.to_string();
        let mut percent_passes = 0usize;
        let mut entity_passes = 0usize;

        for _ in 0..MAX_DECODE_PASSES {
            let mut changed = false;

            let decoded = decode_percent(&working);
            if decoded != working {
                percent_passes += 1;
                working = decoded;
                changed = true;
            }

            let decoded = decode_entities(&working);
            if decoded != working {
                entity_passes += 1;
                working = decoded;
                changed = true;
            }

            if !changed {
                break;
            }
        }

        let multiple = percent_passes > 1 || entity_passes > 1;
        let mixed = percent_passes > 0 && entity_passes > 0;

        if multiple || mixed {
            debug!(
                percent_passes,
                entity_passes, "Decoded more than one encoding layer"
            );
        }
        if restrict_multiple && multiple {
            return Err(GuardError::AmbiguousEncoding(
                "multiple encoding detected in input".to_string(),
            ));
        }
        if restrict_mixed && mixed {
            return Err(GuardError::AmbiguousEncoding(
                "mixed encoding detected in input".to_string(),
            ));
        }

        Ok(working)
    }

    /// Canonicalize with up-front double-decoding detection.
    ///
    /// Counts percent-encoded triplets in the raw input, then performs one
    /// generic percent-decode pass. If decoding changed nothing the input is
    /// handed straight to [`Canonicalizer::canonicalize`]. If it did change
    /// and the policy asks for restriction without errors, the input is
    /// neutralized to the policy's suppression sentinel instead of being
    /// decoded further.
    pub fn canonicalize_guarded(
        &self,
        input: &str,
        policy: &CanonicalizationPolicy,
    ) -> Result<String> {
        if input.is_empty() {
            return Ok(String::new());
        }

        let percent_sequences = PERCENT_TRIPLET.find_iter(input).count();
        let decoded = decode_percent(input);

        // Content equality: any decode that changed the string means at
        // least one percent-encoding layer was present.
        if decoded != input
            && !policy.throw_on_error
            && (policy.restrict_multiple || policy.restrict_mixed)
            && percent_sequences > 0
        {
            warn!(
                percent_sequences,
                "Suspected multi-layer encoding, input neutralized"
            );
            return Ok(policy.suppression_sentinel.clone());
        }

        match self.canonicalize(input, policy.restrict_multiple, policy.restrict_mixed) {
            Ok(canonical) => Ok(canonical),
            Err(err) if !policy.throw_on_error => {
                debug!(error = %err, "Canonicalization failure degraded to empty output");
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }
}

/// One generic percent-decode pass. Invalid UTF-8 in the decoded bytes is
/// replaced lossily so layered malformed payloads still surface as changes.
fn decode_percent(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// One HTML-entity decode pass covering the core named entities and numeric
/// character references. Unknown entities are left untouched.
fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tail[1..].find(';') {
            Some(end) if end > 0 && end <= 32 => {
                if let Some(decoded) = decode_entity(&tail[1..end + 1]) {
                    out.push(decoded);
                    rest = &tail[end + 2..];
                } else {
                    out.push('&');
                    rest = &tail[1..];
                }
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let reference = name.strip_prefix('#')?;
            let code = if let Some(hex) = reference
                .strip_prefix('x')
                .or_else(|| reference.strip_prefix('X'))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                reference.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_unchanged() {
        let canon = Canonicalizer::new();
        assert_eq!(canon.canonicalize("hello world", true, true).unwrap(), "hello world");
    }

    #[test]
    fn test_single_percent_layer_decodes() {
        let canon = Canonicalizer::new();
        assert_eq!(canon.canonicalize("a%20b", true, true).unwrap(), "a b");
    }

    #[test]
    fn test_double_percent_layer_is_multiple_encoding() {
        let canon = Canonicalizer::new();
        let err = canon.canonicalize("%2520", true, false).unwrap_err();
        assert!(err.to_string().contains("multiple encoding"));
    }

    #[test]
    fn test_double_percent_layer_allowed_when_unrestricted() {
        let canon = Canonicalizer::new();
        assert_eq!(canon.canonicalize("%2520", false, false).unwrap(), " ");
    }

    #[test]
    fn test_percent_wrapping_entity_is_mixed_encoding() {
        let canon = Canonicalizer::new();
        let err = canon.canonicalize("%26lt%3B", false, true).unwrap_err();
        assert!(err.to_string().contains("mixed encoding"));
    }

    #[test]
    fn test_entity_layer_decodes() {
        let canon = Canonicalizer::new();
        assert_eq!(canon.canonicalize("&lt;b&gt;", true, true).unwrap(), "<b>");
        assert_eq!(canon.canonicalize("&#x27;&#39;", true, true).unwrap(), "''");
    }

    #[test]
    fn test_canonicalize_is_idempotent_on_canonical_input() {
        let canon = Canonicalizer::new();
        let once = canon.canonicalize("a b<c>'d'", false, false).unwrap();
        let twice = canon.canonicalize(&once, false, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_ampersand_in_prose_is_not_an_entity() {
        let canon = Canonicalizer::new();
        assert_eq!(canon.canonicalize("AT&T; fish & chips", true, true).unwrap(), "AT&T; fish & chips");
    }

    #[test]
    fn test_guard_neutralizes_suspected_double_encoding() {
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new().with_restrict_multiple(true);
        assert_eq!(canon.canonicalize_guarded("%2520", &policy).unwrap(), " ");
    }

    #[test]
    fn test_guard_sentinel_is_configurable() {
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new()
            .with_restrict_multiple(true)
            .with_suppression_sentinel("");
        assert_eq!(canon.canonicalize_guarded("%2520", &policy).unwrap(), "");
    }

    #[test]
    fn test_guard_short_circuits_plain_text() {
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new()
            .with_restrict_multiple(true)
            .with_restrict_mixed(true);
        assert_eq!(canon.canonicalize_guarded("hello world", &policy).unwrap(), "hello world");
    }

    #[test]
    fn test_guard_decodes_when_unrestricted() {
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new();
        assert_eq!(canon.canonicalize_guarded("a%20b", &policy).unwrap(), "a b");
    }

    #[test]
    fn test_guard_surfaces_error_when_throwing() {
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new()
            .with_restrict_multiple(true)
            .with_throw_on_error(true);
        assert!(canon.canonicalize_guarded("%2520", &policy).is_err());
    }

    #[test]
    fn test_guard_degrades_entity_ambiguity_to_empty() {
        // No percent triplets, so the up-front neutralizer stays out of the
        // way and the underlying detector handles the mixed layering.
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new().with_restrict_multiple(true);
        let doubled = "&amp;lt;script&amp;gt;";
        assert_eq!(canon.canonicalize_guarded(doubled, &policy).unwrap(), "");
    }

    #[test]
    fn test_empty_input_fast_path() {
        let canon = Canonicalizer::new();
        let policy = CanonicalizationPolicy::new().with_restrict_multiple(true);
        assert_eq!(canon.canonicalize_guarded("", &policy).unwrap(), "");
        assert_eq!(canon.canonicalize("", true, true).unwrap(), "");
    }

    #[test]
    fn test_policy_defaults() {
        let policy = CanonicalizationPolicy::default();
        assert!(!policy.restrict_multiple);
        assert!(!policy.restrict_mixed);
        assert!(!policy.throw_on_error);
        assert_eq!(policy.suppression_sentinel, " ");
    }
}
