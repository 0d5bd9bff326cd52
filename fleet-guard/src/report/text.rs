//! Fixed-width, paginated plain-text reports.
//!
//! Pages are `page_lines` lines tall and separated by a form feed. Each page
//! ends with a blank line and a centered `Page i of n` footer. Lines wider
//! than the page wrap at word boundaries with a two-space hanging indent.

use std::fmt::Write;

use tracing::{debug, instrument};

use super::{report_file_name, ReportDocument, ReportRenderer};
use crate::config::{DistributionOverflow, ReportConfig, MAINTENANCE_THRESHOLD};
use crate::error::Result;
use crate::repository::UploadRecord;
use crate::summary::Summary;

/// Title printed at the top of every report.
pub const REPORT_TITLE: &str = "Chemical Equipment Analytics Report";

/// Conclusion for health scores below [`MAINTENANCE_THRESHOLD`].
pub const MAINTENANCE_MESSAGE: &str =
    "Maintenance Required: Multiple equipment units are operating outside nominal bounds.";
/// Conclusion for health scores at or above [`MAINTENANCE_THRESHOLD`].
pub const NORMAL_MESSAGE: &str =
    "Normal Operation: All parameters are consistent with plant safety standards.";

const STATISTICS_HEADING: &str = "Summary Statistics";
const DISTRIBUTION_HEADING: &str = "Equipment Type Distribution";
const CONCLUSION_HEADING: &str = "Engineering Conclusion:";
const BULLET: &str = "• ";
const HANGING_INDENT: &str = "  ";
const PAGE_BREAK: char = '\x0c';
/// Blank line plus footer.
const FOOTER_LINES: usize = 2;

/// Renders reports as paginated plain text.
#[derive(Debug, Clone, Default)]
pub struct TextReportRenderer {
    config: ReportConfig,
}

impl TextReportRenderer {
    /// Creates a renderer with the default page layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with a custom page layout.
    pub fn with_config(config: ReportConfig) -> Self {
        Self { config }
    }

    /// The page layout in use.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Renders the report body as a string.
    ///
    /// # Errors
    ///
    /// Returns a render error if the summary is malformed, or a configuration
    /// error if the page layout is too small.
    pub fn render_to_string(&self, record: &UploadRecord) -> Result<(String, usize)> {
        record.summary.check_invariants()?;
        self.config.validate()?;

        let width = self.config.page_width;
        let mut pager = Pager::new(self.config.page_lines - FOOTER_LINES);

        pager.place(Block::new(self.preamble(record), None));
        self.place_distribution(&mut pager, &record.summary);
        pager.spacer();
        pager.place(Block::new(
            wrapped(&[CONCLUSION_HEADING, conclusion(&record.summary)], width),
            None,
        ));

        let pages = pager.finish();
        let page_count = pages.len();
        let mut out = String::new();

        for (index, mut lines) in pages.into_iter().enumerate() {
            if index > 0 {
                out.push(PAGE_BREAK);
            }
            lines.resize(self.config.page_lines - FOOTER_LINES, String::new());
            lines.push(String::new());
            let footer = format!("Page {} of {page_count}", index + 1);
            lines.push(format!("{footer:^width$}").trim_end().to_string());

            for line in lines {
                // Writing to a String cannot fail.
                let _ = writeln!(out, "{line}");
            }
        }

        Ok((out, page_count))
    }

    fn preamble(&self, record: &UploadRecord) -> Vec<String> {
        let summary = &record.summary;
        let source = format!("Source File: {}", record.file_name);
        let date = format!("Date Generated: {}", record.created_at_display());
        let total = format!("{BULLET}Total Equipment Count: {}", summary.total_count);
        let flowrate = format!("{BULLET}Average Flowrate: {:.2}", summary.avg_flowrate);
        let pressure = format!("{BULLET}Average Pressure: {:.2}", summary.avg_pressure);
        let temperature = format!("{BULLET}Average Temperature: {:.2} C", summary.avg_temperature);
        let title_rule = "=".repeat(REPORT_TITLE.chars().count());
        let stats_rule = "-".repeat(STATISTICS_HEADING.chars().count());

        wrapped(
            &[
                REPORT_TITLE,
                title_rule.as_str(),
                "",
                source.as_str(),
                date.as_str(),
                "",
                STATISTICS_HEADING,
                stats_rule.as_str(),
                total.as_str(),
                flowrate.as_str(),
                pressure.as_str(),
                temperature.as_str(),
                "",
            ],
            self.config.page_width,
        )
    }

    fn place_distribution(&self, pager: &mut Pager, summary: &Summary) {
        let width = self.config.page_width;
        let distribution = &summary.type_distribution;
        let shown = match self.config.overflow {
            DistributionOverflow::Paginate => distribution.len(),
            DistributionOverflow::Truncate { max_entries } => max_entries.min(distribution.len()),
        };

        let mut heading = vec![
            DISTRIBUTION_HEADING.to_string(),
            "-".repeat(DISTRIBUTION_HEADING.chars().count()),
        ];
        let mut entries = distribution
            .iter()
            .take(shown)
            .map(|(name, count)| wrap(&format!("{BULLET}{name}: {count}"), width));

        // The heading never sits alone at the bottom of a page.
        if let Some(first) = entries.next() {
            heading.extend(first);
        }
        pager.place(Block::new(heading, None));

        for entry in entries {
            pager.spacer();
            pager.place(Block::new(entry, Some(DISTRIBUTION_HEADING)));
        }

        let hidden = distribution.len() - shown;
        if hidden > 0 {
            let hidden_units: u64 = distribution.iter().skip(shown).map(|(_, count)| count).sum();
            debug!(hidden, hidden_units, "truncating type distribution");
            pager.spacer();
            pager.place(Block::new(
                wrap(
                    &format!("... and {hidden} more types ({hidden_units} units)"),
                    width,
                ),
                Some(DISTRIBUTION_HEADING),
            ));
        }
    }
}

impl ReportRenderer for TextReportRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    #[instrument(skip(self, record), fields(record_id = %record.id))]
    fn render(&self, record: &UploadRecord) -> Result<ReportDocument> {
        let (text, page_count) = self.render_to_string(record)?;
        debug!(page_count, bytes = text.len(), "text report rendered");

        Ok(ReportDocument {
            file_name: report_file_name(record.id, self.extension()),
            content_type: self.content_type(),
            bytes: text.into_bytes(),
            page_count,
        })
    }
}

/// Conclusion line for a summary's health score.
fn conclusion(summary: &Summary) -> &'static str {
    if summary.health_score < MAINTENANCE_THRESHOLD {
        MAINTENANCE_MESSAGE
    } else {
        NORMAL_MESSAGE
    }
}

/// Lines that should stay on one page when possible.
struct Block {
    lines: Vec<String>,
    /// Heading repeated as "(continued)" when the block starts a new page
    continues: Option<&'static str>,
}

impl Block {
    fn new(lines: Vec<String>, continues: Option<&'static str>) -> Self {
        Self { lines, continues }
    }
}

/// Greedy page filler.
struct Pager {
    capacity: usize,
    pages: Vec<Vec<String>>,
    current: Vec<String>,
}

impl Pager {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pages: Vec::new(),
            current: Vec::new(),
        }
    }

    fn remaining(&self) -> usize {
        self.capacity - self.current.len()
    }

    fn spacer(&mut self) {
        if !self.current.is_empty() && self.remaining() > 0 {
            self.current.push(String::new());
        }
    }

    fn place(&mut self, block: Block) {
        if block.lines.len() > self.remaining() && !self.current.is_empty() {
            self.break_page(block.continues);
        }
        for line in block.lines {
            if self.remaining() == 0 {
                self.break_page(block.continues);
            }
            self.current.push(line);
        }
    }

    fn break_page(&mut self, continues: Option<&str>) {
        self.pages.push(std::mem::take(&mut self.current));
        if let Some(heading) = continues {
            let heading = format!("{heading} (continued)");
            let rule = "-".repeat(heading.chars().count());
            self.current.push(heading);
            self.current.push(rule);
        }
    }

    fn finish(mut self) -> Vec<Vec<String>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn wrapped(lines: &[&str], width: usize) -> Vec<String> {
    lines.iter().flat_map(|line| wrap(line, width)).collect()
}

/// Wraps `line` at word boundaries to `width` characters, continuation
/// lines carrying a hanging indent. Words longer than a whole line are split.
fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let body = width - HANGING_INDENT.len();
    let limit = |out: &Vec<String>| if out.is_empty() { width } else { body };
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let used = current.chars().count();
            let separator = usize::from(used > 0);
            let room = limit(&out).saturating_sub(used + separator);
            if word.len() <= room {
                if separator == 1 {
                    current.push(' ');
                }
                current.extend(word);
                break;
            }
            if used > 0 && (word.len() <= limit(&out) || room == 0) {
                out.push(std::mem::take(&mut current));
                continue;
            }
            // Longer than a whole line: fill what is left and carry the rest.
            let rest = word.split_off(room);
            if separator == 1 {
                current.push(' ');
            }
            current.extend(word);
            out.push(std::mem::take(&mut current));
            word = rest;
        }
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }

    out.into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line
            } else {
                format!("{HANGING_INDENT}{line}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::TypeDistribution;
    use crate::error::ErrorKind;
    use crate::test_fixtures::{all_clear_summary, overheating_summary, record_at};

    fn record(summary: Summary) -> UploadRecord {
        UploadRecord {
            summary,
            ..record_at(7, 5)
        }
    }

    fn wide_fleet(types: usize) -> Summary {
        let entries: Vec<(String, u64)> = (0..types).map(|i| (format!("Type-{i:03}"), 2)).collect();
        Summary {
            total_count: 2 * types as u64,
            type_distribution: TypeDistribution::from_entries(entries),
            ..all_clear_summary()
        }
    }

    fn pages(text: &str) -> Vec<&str> {
        text.split(PAGE_BREAK).collect()
    }

    #[test]
    fn test_single_page_layout() {
        let document = TextReportRenderer::new()
            .render(&record(overheating_summary()))
            .unwrap();
        let text = String::from_utf8(document.bytes).unwrap();

        assert_eq!(document.file_name, "Report_7.txt");
        assert_eq!(document.page_count, 1);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], REPORT_TITLE);
        assert_eq!(lines[3], "Source File: upload-7.csv");
        assert_eq!(lines[4], "Date Generated: 2025-01-01 12:05");
        assert!(lines.contains(&"• Total Equipment Count: 3"));
        assert!(lines.contains(&"• Average Flowrate: 96.83"));
        assert!(lines.contains(&"• Average Pressure: 2.00"));
        assert!(lines.contains(&"• Average Temperature: 78.67 C"));

        let conclusion = lines.iter().position(|l| *l == CONCLUSION_HEADING).unwrap();
        assert!(lines[conclusion + 1].starts_with("Maintenance Required:"));
        assert_eq!(lines[conclusion + 2], "  bounds.");

        let pump = lines.iter().position(|l| *l == "• Pump: 2").unwrap();
        assert_eq!(lines[pump + 1], "");
        assert_eq!(lines[pump + 2], "• Valve: 1");

        assert_eq!(lines.len(), 60);
        assert_eq!(lines[59].trim(), "Page 1 of 1");
    }

    #[test]
    fn test_conclusion_threshold_boundary() {
        let renderer = TextReportRenderer::new();
        let at_threshold = Summary {
            health_score: MAINTENANCE_THRESHOLD,
            ..all_clear_summary()
        };
        let below = Summary {
            health_score: MAINTENANCE_THRESHOLD - 1,
            ..all_clear_summary()
        };

        let (text, _) = renderer.render_to_string(&record(at_threshold)).unwrap();
        assert!(text.contains("Normal Operation:"));
        assert!(!text.contains("Maintenance Required:"));
        let (text, _) = renderer.render_to_string(&record(below)).unwrap();
        assert!(text.contains("Maintenance Required:"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let renderer = TextReportRenderer::new();
        let record = record(wide_fleet(50));
        assert_eq!(
            renderer.render(&record).unwrap(),
            renderer.render(&record).unwrap()
        );
    }

    #[test]
    fn test_large_distribution_paginates() {
        let renderer = TextReportRenderer::new();
        let (text, page_count) = renderer.render_to_string(&record(wide_fleet(40))).unwrap();

        assert_eq!(page_count, 2);
        let pages = pages(&text);
        assert_eq!(pages.len(), 2);
        for page in &pages {
            assert_eq!(page.lines().count(), 60);
        }
        assert!(pages[1].starts_with("Equipment Type Distribution (continued)\n"));
        assert!(pages[1].contains("Page 2 of 2"));
        for i in 0..40 {
            assert!(text.contains(&format!("• Type-{i:03}: 2\n")), "missing type {i}");
        }
        assert!(pages[1].contains(CONCLUSION_HEADING));
    }

    #[test]
    fn test_truncated_distribution() {
        let renderer = TextReportRenderer::with_config(ReportConfig::single_page(5));
        let (text, page_count) = renderer.render_to_string(&record(wide_fleet(30))).unwrap();

        assert_eq!(page_count, 1);
        assert!(text.contains("• Type-004: 2"));
        assert!(!text.contains("• Type-005: 2"));
        assert!(text.contains("... and 25 more types (50 units)"));
    }

    #[test]
    fn test_long_lines_wrap_within_width() {
        let long_name = "X".repeat(150);
        let summary = Summary {
            total_count: 1,
            type_distribution: TypeDistribution::from_entries([(long_name.as_str(), 1)]),
            ..all_clear_summary()
        };
        let renderer = TextReportRenderer::with_config(ReportConfig::default().with_page_width(40));
        let (text, _) = renderer.render_to_string(&record(summary)).unwrap();

        for line in text.lines() {
            assert!(line.chars().count() <= 40, "line too wide: {line:?}");
        }
        assert!(text.lines().any(|l| l.starts_with("  XXXX")));
    }

    #[test]
    fn test_empty_fleet_renders() {
        let summary = Summary {
            total_count: 0,
            avg_flowrate: 0.0,
            avg_pressure: 0.0,
            avg_temperature: 0.0,
            type_distribution: TypeDistribution::new(),
            health_score: 100,
            alerts: vec![crate::analyzers::ALL_CLEAR.to_string()],
        };
        let (text, page_count) = TextReportRenderer::new()
            .render_to_string(&record(summary))
            .unwrap();
        assert_eq!(page_count, 1);
        assert!(text.contains("• Average Flowrate: 0.00"));
        assert!(text.contains("Normal Operation:"));
    }

    #[test]
    fn test_malformed_summary_is_render_error() {
        let mut summary = all_clear_summary();
        summary.alerts.clear();
        let err = TextReportRenderer::new()
            .render(&record(summary))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderError);
    }

    #[test]
    fn test_tiny_page_rejected() {
        let renderer = TextReportRenderer::with_config(ReportConfig::default().with_page_lines(5));
        let err = renderer.render(&record(all_clear_summary())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("short", 10), vec!["short"]);
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "  cc"]);
        assert_eq!(wrap("ab cdefgh", 5), vec!["ab cd", "  efg", "  h"]);
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde", "  fgh", "  ijk", "  l"]);
    }
}
