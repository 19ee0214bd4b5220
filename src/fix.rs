//! Auto-correction infrastructure.
//!
//! All functions here work on strings and byte offsets; file I/O stays in the
//! CLI. Edits are validated to be non-overlapping and are applied in reverse
//! order so earlier byte offsets stay valid.

use crate::diagnostics::{Applicability, Diagnostic};
use std::path::Path;
use thiserror::Error;

/// Error type for correction application.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("Overlapping edits detected at byte {0}")]
    OverlappingEdits(usize),

    #[error("Edit range [{start}..{end}) exceeds source length {source_len}")]
    InvalidRange {
        start: usize,
        end: usize,
        source_len: usize,
    },

    #[error("Edit start {start} is after edit end {end}")]
    InvalidEditOrder { start: usize, end: usize },
}

/// A text edit expressed in byte offsets, matching tree-sitter's byte-based API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Starting byte offset (inclusive).
    pub start_byte: usize,
    /// Ending byte offset (exclusive).
    pub end_byte: usize,
    /// Text to insert in place of the range [start_byte..end_byte).
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start_byte: usize, end_byte: usize, replacement: String) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement,
        }
    }

    /// Create a deletion edit (removes text, inserts nothing).
    pub fn delete(start_byte: usize, end_byte: usize) -> Self {
        Self::new(start_byte, end_byte, String::new())
    }

    /// Create an insertion edit (inserts text at a position).
    pub fn insert(byte_offset: usize, text: String) -> Self {
        Self::new(byte_offset, byte_offset, text)
    }

    /// Create a replacement edit (replaces a range with new text).
    pub fn replace(start_byte: usize, end_byte: usize, replacement: String) -> Self {
        Self::new(start_byte, end_byte, replacement)
    }

    /// Returns true if this edit overlaps with another.
    pub fn overlaps_with(&self, other: &TextEdit) -> bool {
        // Two ranges [a, b) and [c, d) overlap if a < d && c < b. Pure
        // insertions at the same offset do not count as overlapping.
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    pub fn validate(&self, source_len: usize) -> Result<(), FixError> {
        if self.start_byte > self.end_byte {
            return Err(FixError::InvalidEditOrder {
                start: self.start_byte,
                end: self.end_byte,
            });
        }

        if self.end_byte > source_len {
            return Err(FixError::InvalidRange {
                start: self.start_byte,
                end: self.end_byte,
                source_len,
            });
        }

        Ok(())
    }
}

/// Validate that a list of edits are non-overlapping and within bounds.
pub fn validate_edits(edits: &[TextEdit], source_len: usize) -> Result<(), FixError> {
    for edit in edits {
        edit.validate(source_len)?;
    }

    for i in 0..edits.len() {
        for j in (i + 1)..edits.len() {
            if edits[i].overlaps_with(&edits[j]) {
                return Err(FixError::OverlappingEdits(edits[i].start_byte));
            }
        }
    }

    Ok(())
}

/// Apply a list of non-overlapping edits to source code.
///
/// Edits are sorted by start_byte in descending order before application so
/// that earlier byte offsets remain valid as edits land.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    validate_edits(edits, source.len())?;

    let mut sorted_edits = edits.to_vec();
    // Ties on start_byte happen when an insertion sits exactly at a deleted
    // range's start; the deletion must land first or it would eat the
    // freshly inserted text.
    sorted_edits.sort_by(|a, b| {
        b.start_byte
            .cmp(&a.start_byte)
            .then(b.end_byte.cmp(&a.end_byte))
    });

    let mut result = source.to_string();

    for edit in sorted_edits {
        result.drain(edit.start_byte..edit.end_byte);
        result.insert_str(edit.start_byte, &edit.replacement);
    }

    Ok(result)
}

/// Result of applying corrections from one lint pass.
#[derive(Debug)]
pub struct FixOutcome {
    /// The modified source code.
    pub fixed_source: String,
    /// Number of suggestions applied.
    pub fixes_applied: usize,
    /// Suggestions that were skipped (not machine-applicable).
    pub fixes_skipped: usize,
}

/// Apply correction suggestions carried by diagnostics to source code.
pub fn apply_suggestions(
    source: &str,
    diagnostics: &[Diagnostic],
    allow_unsafe: bool,
) -> Result<FixOutcome, FixError> {
    let mut edits: Vec<TextEdit> = Vec::new();
    let mut applied = 0usize;
    let mut skipped = 0usize;

    for diag in diagnostics {
        let Some(suggestion) = &diag.suggestion else {
            continue;
        };

        match suggestion.applicability {
            Applicability::MachineApplicable => {}
            Applicability::MaybeIncorrect | Applicability::HasPlaceholders => {
                if !allow_unsafe {
                    skipped += 1;
                    continue;
                }
            }
            Applicability::Unspecified => {
                skipped += 1;
                continue;
            }
        }

        edits.extend(suggestion.edits.iter().cloned());
        applied += 1;
    }

    if edits.is_empty() {
        return Ok(FixOutcome {
            fixed_source: source.to_string(),
            fixes_applied: 0,
            fixes_skipped: skipped,
        });
    }

    let fixed_source = apply_edits(source, &edits)?;

    Ok(FixOutcome {
        fixed_source,
        fixes_applied: applied,
        fixes_skipped: skipped,
    })
}

/// Generate a unified diff between original and fixed source, with three
/// context lines around each change.
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    format_diff_with_context(original, fixed, path, 3)
}

/// Generate a unified diff with configurable context lines.
pub fn format_diff_with_context(
    original: &str,
    fixed: &str,
    path: &Path,
    context: usize,
) -> String {
    use std::fmt::Write;

    let path_str = path.display().to_string();
    let mut output = String::new();

    let orig_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();

    let max_len = orig_lines.len().max(fixed_lines.len());
    let mut changes: Vec<(usize, Option<&str>, Option<&str>)> = Vec::new();

    for i in 0..max_len {
        let orig = orig_lines.get(i).copied();
        let fix = fixed_lines.get(i).copied();

        if orig != fix {
            changes.push((i, orig, fix));
        }
    }

    if changes.is_empty() {
        return String::new();
    }

    writeln!(output, "--- a/{}", path_str).unwrap();
    writeln!(output, "+++ b/{}", path_str).unwrap();

    // Group changes into hunks with context.
    let mut hunks: Vec<(usize, usize, Vec<usize>)> = Vec::new();
    let mut hunk_start = 0usize;
    let mut hunk_end = 0usize;
    let mut hunk_lines: Vec<usize> = Vec::new();

    for (i, _, _) in &changes {
        let change_start = i.saturating_sub(context);
        let change_end = (i + context + 1).min(max_len);

        if hunk_lines.is_empty() {
            hunk_start = change_start;
            hunk_end = change_end;
            hunk_lines.push(*i);
        } else if change_start <= hunk_end {
            hunk_end = change_end;
            hunk_lines.push(*i);
        } else {
            hunks.push((hunk_start, hunk_end, std::mem::take(&mut hunk_lines)));
            hunk_start = change_start;
            hunk_end = change_end;
            hunk_lines.push(*i);
        }
    }

    if !hunk_lines.is_empty() {
        hunks.push((hunk_start, hunk_end, hunk_lines));
    }

    for (start, end, changed) in hunks {
        let changed: std::collections::HashSet<usize> = changed.into_iter().collect();

        let orig_size = end.min(orig_lines.len()).saturating_sub(start);
        let fixed_size = end.min(fixed_lines.len()).saturating_sub(start);

        writeln!(
            output,
            "@@ -{},{} +{},{} @@",
            start + 1,
            orig_size,
            start + 1,
            fixed_size
        )
        .unwrap();

        for line_idx in start..end {
            if changed.contains(&line_idx) {
                if let Some(orig) = orig_lines.get(line_idx) {
                    writeln!(output, "-{}", orig).unwrap();
                }
                if let Some(fix) = fixed_lines.get(line_idx) {
                    writeln!(output, "+{}", fix).unwrap();
                }
            } else if let Some(line) = orig_lines.get(line_idx) {
                writeln!(output, " {}", line).unwrap();
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Position, Span, Suggestion};

    #[test]
    fn text_edit_constructors() {
        let edit = TextEdit::delete(10, 20);
        assert_eq!(edit.start_byte, 10);
        assert_eq!(edit.end_byte, 20);
        assert_eq!(edit.replacement, "");

        let edit = TextEdit::insert(5, "inserted".to_string());
        assert_eq!(edit.start_byte, 5);
        assert_eq!(edit.end_byte, 5);
    }

    #[test]
    fn overlap_detection() {
        let edit1 = TextEdit::new(0, 10, "a".to_string());
        let edit2 = TextEdit::new(5, 15, "b".to_string());
        let edit3 = TextEdit::new(10, 20, "c".to_string());

        assert!(edit1.overlaps_with(&edit2));
        assert!(edit2.overlaps_with(&edit1));
        assert!(!edit1.overlaps_with(&edit3));
        assert!(!edit3.overlaps_with(&edit1));
    }

    #[test]
    fn insertion_overlap_rules() {
        let delete = TextEdit::delete(4, 12);

        // An insert strictly inside a deleted range conflicts.
        let inside = TextEdit::insert(8, "x".to_string());
        assert!(delete.overlaps_with(&inside));

        // The move-method pair (insert before the deleted range) is fine.
        let before = TextEdit::insert(2, "y".to_string());
        assert!(!delete.overlaps_with(&before));
        assert!(validate_edits(&[before, delete], 20).is_ok());
    }

    #[test]
    fn validate_rejects_inverted_and_oversized_edits() {
        let edit = TextEdit::new(10, 5, "hello".to_string());
        assert!(matches!(
            edit.validate(20),
            Err(FixError::InvalidEditOrder { .. })
        ));

        let edit = TextEdit::new(0, 15, "hello".to_string());
        assert!(matches!(
            edit.validate(10),
            Err(FixError::InvalidRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_overlapping_edits() {
        let edits = vec![
            TextEdit::new(0, 10, "a".to_string()),
            TextEdit::new(5, 15, "b".to_string()),
        ];
        assert!(matches!(
            validate_edits(&edits, 20),
            Err(FixError::OverlappingEdits(_))
        ));
    }

    #[test]
    fn apply_move_pair() {
        // Delete a word and re-insert it earlier, the shape every
        // method-order correction takes.
        let source = "alpha beta gamma";
        let edits = vec![
            TextEdit::insert(5, " gamma".to_string()),
            TextEdit::delete(10, 16),
        ];
        let result = apply_edits(source, &edits).unwrap();
        assert_eq!(result, "alpha gamma beta");
    }

    #[test]
    fn insert_at_delete_start_applies_delete_first() {
        let source = "xy";
        let edits = vec![TextEdit::insert(0, "z".to_string()), TextEdit::delete(0, 1)];
        assert_eq!(apply_edits(source, &edits).unwrap(), "zy");
    }

    #[test]
    fn apply_multiple_edits_preserves_offsets() {
        let source = "one two three";
        let edits = vec![
            TextEdit::replace(0, 3, "1".to_string()),
            TextEdit::replace(4, 7, "2".to_string()),
            TextEdit::replace(8, 13, "3".to_string()),
        ];
        let result = apply_edits(source, &edits).unwrap();
        assert_eq!(result, "1 2 3");
    }

    #[test]
    fn apply_edits_input_order_does_not_matter() {
        let source = "abc def ghi";
        let edits = vec![
            TextEdit::replace(8, 11, "3".to_string()),
            TextEdit::replace(0, 3, "1".to_string()),
            TextEdit::replace(4, 7, "2".to_string()),
        ];
        let result = apply_edits(source, &edits).unwrap();
        assert_eq!(result, "1 2 3");
    }

    #[test]
    fn no_edits_is_identity() {
        let source = "unchanged";
        assert_eq!(apply_edits(source, &[]).unwrap(), source);
    }

    fn diagnostic_with(applicability: Applicability, edits: Vec<TextEdit>) -> Diagnostic {
        static TEST_COP: crate::cop::CopDescriptor = crate::cop::CopDescriptor {
            name: "test",
            category: crate::cop::CopCategory::Style,
            description: "test",
            fix: crate::cop::FixDescriptor::none(),
        };

        Diagnostic {
            cop: &TEST_COP,
            level: crate::level::CopLevel::Warn,
            file: None,
            span: Span {
                start: Position { row: 1, column: 1 },
                end: Position { row: 1, column: 1 },
            },
            message: "test".into(),
            help: None,
            suggestion: Some(Suggestion {
                message: "move".into(),
                edits,
                applicability,
            }),
        }
    }

    #[test]
    fn apply_suggestions_applies_machine_applicable() {
        let source = "alpha beta gamma";
        let diag = diagnostic_with(
            Applicability::MachineApplicable,
            vec![
                TextEdit::insert(5, " gamma".to_string()),
                TextEdit::delete(10, 16),
            ],
        );

        let outcome = apply_suggestions(source, &[diag], false).unwrap();
        assert_eq!(outcome.fixed_source, "alpha gamma beta");
        assert_eq!(outcome.fixes_applied, 1);
        assert_eq!(outcome.fixes_skipped, 0);
    }

    #[test]
    fn apply_suggestions_skips_unsafe_without_opt_in() {
        let source = "alpha beta gamma";
        let diag = diagnostic_with(
            Applicability::MaybeIncorrect,
            vec![TextEdit::delete(0, 6)],
        );

        let outcome = apply_suggestions(source, &[diag], false).unwrap();
        assert_eq!(outcome.fixed_source, source);
        assert_eq!(outcome.fixes_applied, 0);
        assert_eq!(outcome.fixes_skipped, 1);
    }

    #[test]
    fn format_diff_shows_changed_lines() {
        let original = "def a; end\ndef b; end";
        let fixed = "def b; end\ndef a; end";
        let diff = format_diff(original, fixed, Path::new("test.rb"));

        assert!(diff.contains("--- a/test.rb"));
        assert!(diff.contains("+++ b/test.rb"));
        assert!(diff.contains("-def a; end"));
        assert!(diff.contains("+def b; end"));
    }
}
