//! Pulls the structured payload out of a model reply
//!
//! Models are asked for bare JSON but regularly wrap it in a fenced code block. The
//! extractor only removes that wrapping; parsing is left to the caller so a failure can be
//! attributed to the stage that produced it.

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?\s*\n?").expect("valid leading fence pattern"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n?```\s*$").expect("valid trailing fence pattern"));

/// Strips surrounding whitespace and markdown fences from a model reply
///
/// Idempotent: stripping repeats until nothing changes, so stacked fences are removed too.
pub fn extract_payload(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let stripped = strip_once(current);
        if stripped.len() == current.len() {
            return current.to_string();
        }
        current = stripped;
    }
}

fn strip_once(text: &str) -> &str {
    let text = text.trim();
    let start = LEADING_FENCE.find(text).map_or(0, |m| m.end());
    let rest = &text[start..];
    let end = TRAILING_FENCE.find(rest).map_or(rest.len(), |m| m.start());
    rest[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_plain_json_untouched() {
        assert_eq!(extract_payload(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_json_fence() {
        let raw = "\n  ```json\n{\"a\": 1}\n```  \n";
        assert_eq!(extract_payload(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_untagged_fence() {
        assert_eq!(extract_payload("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn test_only_leading_fence() {
        assert_eq!(extract_payload("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_only_trailing_fence() {
        assert_eq!(extract_payload("{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_stacked_fences() {
        let raw = "```json\n```json\n{\"a\": 1}\n```\n```";
        assert_eq!(extract_payload(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_prose_is_kept() {
        let raw = "Here is the analysis you asked for.";
        assert_eq!(extract_payload(raw), raw);
    }

    #[test]
    fn test_empty_and_bare_fence() {
        assert_eq!(extract_payload(""), "");
        assert_eq!(extract_payload("   ```   "), "");
    }

    #[test]
    fn test_multiline_document_interior_preserved() {
        let inner = "{\n  \"steps\": [\n    \"one\",\n    \"two\"\n  ]\n}";
        let raw = format!("```json\n{}\n```", inner);
        assert_eq!(extract_payload(&raw), inner);
    }

    proptest! {
        #[test]
        fn prop_idempotent(raw in "(```(json)?)?[ \\t\\n]{0,3}[a-z{}\\[\\]\":, \\n`]{0,40}[ \\t\\n]{0,3}(```)?") {
            let once = extract_payload(&raw);
            prop_assert_eq!(extract_payload(&once), once);
        }

        #[test]
        fn prop_idempotent_arbitrary(raw in any::<String>()) {
            let once = extract_payload(&raw);
            prop_assert_eq!(extract_payload(&once), once);
        }

        #[test]
        fn prop_fenced_document_round_trip(
            key in "[a-z]{1,8}",
            value in "[a-zA-Z0-9 ]{0,20}",
            before in "[ \\t\\n]{0,4}",
            after in "[ \\t\\n]{0,4}",
        ) {
            let inner = format!("{{\"{}\": \"{}\"}}", key, value.trim());
            let raw = format!("{}```json\n{}\n```{}", before, inner, after);
            prop_assert_eq!(extract_payload(&raw), inner);
        }
    }
}
