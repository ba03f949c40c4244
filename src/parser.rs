//! Parsing of `git show --stat` summaries into per-file line counts.
//!
//! Per-file numbers come from the `+`/`-` glyph run, which git scales down once a
//! file has more changes than the display width allows. Only the totals line is
//! exact; per-file counts for large changes are approximate and are reported as
//! such rather than rescaled.

use serde::{Deserialize, Serialize};

/// Line-level changes for one file in a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub file_name: String,
    pub added: u32,
    pub removed: u32,
}

/// Parsed form of a stat summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowStat {
    pub changes: Vec<FileChange>,
    pub total_insertions: u32,
    pub total_deletions: u32,
}

/// Parse raw `git show --stat` output.
///
/// Lines that are neither a file line (`<file> | <n> <+-run>`) nor the
/// `N file(s) changed` summary are ignored.
pub fn parse_show_stat(raw: &str) -> ShowStat {
    let mut stat = ShowStat::default();

    for line in raw.lines() {
        if is_summary_line(line) {
            let (insertions, deletions) = parse_summary_line(line);
            stat.total_insertions = insertions;
            stat.total_deletions = deletions;
            continue;
        }

        if let Some(change) = parse_file_line(line) {
            stat.changes.push(change);
        }
    }

    stat
}

fn is_summary_line(line: &str) -> bool {
    line.contains("file changed") || line.contains("files changed")
}

/// Extract insertion and deletion counts from
/// ` 2 files changed, 4 insertions(+), 2 deletions(-)`.
fn parse_summary_line(line: &str) -> (u32, u32) {
    let mut insertions = 0;
    let mut deletions = 0;

    for part in line.split(',') {
        let part = part.trim();
        let count = leading_number(part).unwrap_or(0);
        if part.contains("insertion") {
            insertions = count;
        } else if part.contains("deletion") {
            deletions = count;
        }
    }

    (insertions, deletions)
}

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn parse_file_line(line: &str) -> Option<FileChange> {
    let (name, graph) = line.rsplit_once('|')?;
    let file_name = name.trim();
    if file_name.is_empty() {
        return None;
    }

    let mut tokens = graph.split_whitespace();
    // Binary entries read "Bin 0 -> 1234 bytes" and carry no line counts
    tokens.next()?.parse::<u32>().ok()?;

    let glyphs = tokens.next().unwrap_or("");
    if tokens.next().is_some() || !glyphs.chars().all(|c| c == '+' || c == '-') {
        return None;
    }

    Some(FileChange {
        file_name: file_name.to_string(),
        added: glyphs.chars().filter(|&c| c == '+').count() as u32,
        removed: glyphs.chars().filter(|&c| c == '-').count() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_files_with_summary() {
        let raw = " src/a.ts | 4 ++--\n src/b.ts | 2 +-\n 2 files changed, 4 insertions(+), 2 deletions(-)";
        let stat = parse_show_stat(raw);

        assert_eq!(stat.total_insertions, 4);
        assert_eq!(stat.total_deletions, 2);
        assert_eq!(
            stat.changes,
            vec![
                FileChange {
                    file_name: "src/a.ts".to_string(),
                    added: 2,
                    removed: 2,
                },
                FileChange {
                    file_name: "src/b.ts".to_string(),
                    added: 1,
                    removed: 1,
                },
            ]
        );
    }

    #[test]
    fn test_insertions_only_summary() {
        let raw = " README.md | 3 +++\n 1 file changed, 3 insertions(+)";
        let stat = parse_show_stat(raw);

        assert_eq!(stat.total_insertions, 3);
        assert_eq!(stat.total_deletions, 0);
        assert_eq!(stat.changes.len(), 1);
        assert_eq!(stat.changes[0].added, 3);
        assert_eq!(stat.changes[0].removed, 0);
    }

    #[test]
    fn test_deletions_only_summary() {
        let raw = " old.txt | 5 -----\n 1 file changed, 5 deletions(-)";
        let stat = parse_show_stat(raw);

        assert_eq!(stat.total_insertions, 0);
        assert_eq!(stat.total_deletions, 5);
        assert_eq!(stat.changes[0].removed, 5);
    }

    #[test]
    fn test_binary_files_are_skipped_and_totals_default_to_zero() {
        let raw = " logo.png | Bin 0 -> 2048 bytes\n 1 file changed, 0 insertions(+), 0 deletions(-)";
        let stat = parse_show_stat(raw);

        assert!(stat.changes.is_empty());
        assert_eq!(stat.total_insertions, 0);
        assert_eq!(stat.total_deletions, 0);
    }

    #[test]
    fn test_missing_summary_defaults_to_zero() {
        let stat = parse_show_stat("");
        assert_eq!(stat, ShowStat::default());
    }

    #[test]
    fn test_truncated_glyphs_are_reported_as_is() {
        // 120 changed lines rendered with fewer glyphs
        let raw = " big.rs | 120 ++++++++++++++++++++++++++++++----------\n 1 file changed, 90 insertions(+), 30 deletions(-)";
        let stat = parse_show_stat(raw);

        assert_eq!(stat.changes[0].added, 30);
        assert_eq!(stat.changes[0].removed, 10);
        assert_eq!(stat.total_insertions, 90);
        assert_eq!(stat.total_deletions, 30);
    }

    #[test]
    fn test_mode_only_change_has_zero_counts() {
        let stat = parse_show_stat(" script.sh | 0\n 1 file changed, 0 insertions(+), 0 deletions(-)");
        assert_eq!(stat.changes.len(), 1);
        assert_eq!(stat.changes[0].added, 0);
        assert_eq!(stat.changes[0].removed, 0);
    }

    #[test]
    fn test_rename_line_keeps_arrow_in_name() {
        let stat = parse_show_stat(" src/{old.rs => new.rs} | 2 +-");
        assert_eq!(stat.changes[0].file_name, "src/{old.rs => new.rs}");
    }

    #[test]
    fn test_unrelated_lines_are_ignored() {
        let raw = "commit abc\nAuthor: Someone\n\n    message | with pipe\n a.txt | 1 +\n";
        let stat = parse_show_stat(raw);
        assert_eq!(stat.changes.len(), 1);
        assert_eq!(stat.changes[0].file_name, "a.txt");
    }
}
