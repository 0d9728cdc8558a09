//! Unified diff generation for materialized fixes.

use std::collections::BTreeMap;

use crate::patch::OutputEdit;

/// Generate a unified diff from materialized edits.
///
/// Files appear in path order and hunks in line order. Each edit becomes one
/// hunk; multi-line old or new text is split across `-`/`+` lines.
pub fn generate_unified_diff(edits: &[OutputEdit]) -> String {
    let mut by_file: BTreeMap<&str, Vec<&OutputEdit>> = BTreeMap::new();
    for edit in edits {
        by_file.entry(&edit.file).or_default().push(edit);
    }

    let mut diff = String::new();
    for (file, mut file_edits) in by_file {
        file_edits.sort_by_key(|e| (e.line, e.col));
        diff.push_str(&format!("--- a/{}\n+++ b/{}\n", file, file));

        for edit in file_edits {
            let old_lines: Vec<&str> = edit.old_text.split('\n').collect();
            let new_lines: Vec<&str> = edit.new_text.split('\n').collect();
            diff.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                edit.line,
                old_lines.len(),
                edit.line,
                new_lines.len()
            ));
            for line in old_lines {
                diff.push('-');
                diff.push_str(line);
                diff.push('\n');
            }
            for line in new_lines {
                diff.push('+');
                diff.push_str(line);
                diff.push('\n');
            }
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Span;

    fn edit(file: &str, line: u32, old: &str, new: &str) -> OutputEdit {
        OutputEdit {
            file: file.to_string(),
            span: Span::new(0, old.len()),
            old_text: old.to_string(),
            new_text: new.to_string(),
            line,
            col: 1,
        }
    }

    #[test]
    fn files_are_ordered_and_headed_once() {
        let diff = generate_unified_diff(&[
            edit("b.cs", 3, "x", "y"),
            edit("a.cs", 9, "p", "q"),
            edit("a.cs", 2, "m", "n"),
        ]);
        assert_eq!(diff.matches("--- a/a.cs").count(), 1);
        let a = diff.find("--- a/a.cs").unwrap_or(usize::MAX);
        let b = diff.find("--- a/b.cs").unwrap_or(0);
        assert!(a < b);
        let first_hunk = diff.find("@@ -2,").unwrap_or(usize::MAX);
        let second_hunk = diff.find("@@ -9,").unwrap_or(0);
        assert!(first_hunk < second_hunk);
    }

    #[test]
    fn multiline_old_text_counts_lines() {
        let diff = generate_unified_diff(&[edit(
            "p.cs",
            4,
            "Thread.CurrentThread\n    .ManagedThreadId",
            "Environment.CurrentManagedThreadId",
        )]);
        assert!(diff.contains("@@ -4,2 +4,1 @@"));
        assert!(diff.contains("-    .ManagedThreadId\n"));
    }

    #[test]
    fn empty_edits_produce_empty_diff() {
        assert!(generate_unified_diff(&[]).is_empty());
    }
}
