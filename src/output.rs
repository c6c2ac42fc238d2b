// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console rendering: `WARNING:`/`ERROR:` prefixed messages, and the
//! add/modify/remove/matched percentage summary (spec.md §7).

use colored::Colorize;

pub fn warning(message: impl AsRef<str>) {
    eprintln!("{} {}", "WARNING:".yellow().bold(), message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    eprintln!("{} {}", "ERROR:".red().bold(), message.as_ref());
}

/// One bucket of the add/modify/remove/matched summary.
pub struct SummaryCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub matched: usize,
}

impl SummaryCounts {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.removed + self.matched
    }

    fn percentage(&self, value: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (value as f64 / total as f64) * 100.0
        }
    }

    /// Render the summary the way the reference tool does: one line per
    /// bucket with a percentage, e.g. `- 3 files to add (12.5000%)`.
    pub fn render(&self) -> String {
        format!(
            "- {} to add ({:.4}%)\n- {} to modify ({:.4}%)\n- {} to remove ({:.4}%)\n- {} matched ({:.4}%)\n",
            plural(self.added, "file"),
            self.percentage(self.added),
            plural(self.modified, "file"),
            self.percentage(self.modified),
            plural(self.removed, "file"),
            self.percentage(self.removed),
            plural(self.matched, "file"),
            self.percentage(self.matched),
        )
    }

    pub fn print(&self) {
        print!("\nResults: {}", self.render());
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_sum_to_one_hundred() {
        let counts = SummaryCounts {
            added: 1,
            modified: 1,
            removed: 1,
            matched: 1,
        };
        let rendered = counts.render();
        assert!(rendered.contains("25.0000%"));
    }

    #[test]
    fn empty_summary_reports_zero_percent() {
        let counts = SummaryCounts {
            added: 0,
            modified: 0,
            removed: 0,
            matched: 0,
        };
        assert!(counts.render().contains("0.0000%"));
    }
}
