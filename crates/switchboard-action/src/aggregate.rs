//! Response aggregation.
//!
//! Folds the per-action messages of a dispatch into the single text shown to
//! the actor: successes first, then failures, duplicates removed.

use crate::types::DispatchOutcome;

/// Marker appended to truncated responses.
pub const ELLIPSIS: char = '…';

/// Trim, drop empty entries and remove duplicates, keeping the first occurrence.
fn clean(messages: &[String]) -> Vec<&str> {
    let mut kept: Vec<&str> = Vec::with_capacity(messages.len());
    for message in messages.iter().map(|m| m.trim()) {
        if !message.is_empty() && !kept.contains(&message) {
            kept.push(message);
        }
    }
    kept
}

/// Build the response text for `outcome`.
///
/// Successes are joined by single newlines, failures likewise. When both are
/// present they are separated by a blank line. Returns an empty string when
/// nothing meaningful was collected.
pub fn aggregate(outcome: &DispatchOutcome) -> String {
    let successes = clean(&outcome.successes).join("\n");
    let failures = clean(&outcome.failures).join("\n");

    match (successes.is_empty(), failures.is_empty()) {
        (true, true) => String::new(),
        (false, true) => successes,
        (true, false) => failures,
        (false, false) => format!("{}\n\n{}", successes, failures),
    }
}

/// Cap `text` at `max_chars` characters, ending it with an ellipsis when cut.
///
/// `max_chars == 0` disables the cap.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.truncate(cut.trim_end().len());
    cut.push(ELLIPSIS);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(successes: &[&str], failures: &[&str]) -> DispatchOutcome {
        DispatchOutcome {
            successes: successes.iter().map(|s| s.to_string()).collect(),
            failures: failures.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_successes_then_failures() {
        let text = aggregate(&outcome(&["Granted A.", "Granted B."], &["Could not grant C."]));
        assert_eq!(text, "Granted A.\nGranted B.\n\nCould not grant C.");
    }

    #[test]
    fn test_only_one_side_has_no_blank_line() {
        assert_eq!(aggregate(&outcome(&["a", "b"], &[])), "a\nb");
        assert_eq!(aggregate(&outcome(&[], &["x", "y"])), "x\ny");
    }

    #[test]
    fn test_duplicates_collapse_keeping_first() {
        let text = aggregate(&outcome(&["Granted X.", "Sent.", "Granted X."], &[]));
        assert_eq!(text, "Granted X.\nSent.");
    }

    #[test]
    fn test_same_text_may_appear_in_both_lists() {
        let text = aggregate(&outcome(&["done"], &["done"]));
        assert_eq!(text, "done\n\ndone");
    }

    #[test]
    fn test_blank_messages_are_dropped() {
        assert_eq!(aggregate(&outcome(&["", "  ", "ok "], &["\n"])), "ok");
        assert_eq!(aggregate(&outcome(&[" "], &[""])), "");
        assert_eq!(aggregate(&DispatchOutcome::default()), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello world", 7), "hello…");
        assert_eq!(truncate("hello world", 0), "hello world");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééééé";
        let cut = truncate(text, 3);
        assert_eq!(cut, "éé…");
        assert_eq!(cut.chars().count(), 3);
    }
}
