//! Pipeline and report configuration.
//!
//! Everything here has a working default. Binaries can layer environment
//! overrides on top with [`PipelineConfig::from_env`].

use crate::error::{FleetError, Result};
use crate::ingest::CsvOptions;
use crate::logging::LogConfig;

/// Health scores strictly below this value call for maintenance in reports.
///
/// Independent of the scoring penalties.
pub const MAINTENANCE_THRESHOLD: u32 = 90;

/// Number of uploads shown by the history listing unless configured otherwise.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Environment variable overriding [`PipelineConfig::history_window`].
pub const ENV_HISTORY_WINDOW: &str = "FLEET_HISTORY_WINDOW";
/// Environment variable overriding [`ReportConfig::page_lines`].
pub const ENV_REPORT_PAGE_LINES: &str = "FLEET_REPORT_PAGE_LINES";
/// Environment variable overriding [`ReportConfig::page_width`].
pub const ENV_REPORT_PAGE_WIDTH: &str = "FLEET_REPORT_PAGE_WIDTH";

/// Smallest page that still fits the fixed report header, statistics,
/// conclusion and footer blocks.
pub(crate) const MIN_PAGE_LINES: usize = 24;
/// Narrowest page that still fits every fixed label.
pub(crate) const MIN_PAGE_WIDTH: usize = 40;

/// What to do with a type distribution that does not fit on the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionOverflow {
    /// Continue the listing on as many extra pages as needed.
    Paginate,
    /// Show at most `max_entries` types and summarize the rest in one line.
    Truncate { max_entries: usize },
}

/// Layout settings for the text report renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Lines per page, footer included
    pub page_lines: usize,
    /// Columns per line; longer lines are wrapped
    pub page_width: usize,
    /// Policy for large type distributions
    pub overflow: DistributionOverflow,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_lines: 60,
            page_width: 80,
            overflow: DistributionOverflow::Paginate,
        }
    }
}

impl ReportConfig {
    /// Keeps every report to a single page, truncating the distribution.
    pub fn single_page(max_entries: usize) -> Self {
        Self {
            overflow: DistributionOverflow::Truncate { max_entries },
            ..Self::default()
        }
    }

    /// Sets the page height in lines.
    pub fn with_page_lines(mut self, lines: usize) -> Self {
        self.page_lines = lines;
        self
    }

    /// Sets the page width in columns.
    pub fn with_page_width(mut self, width: usize) -> Self {
        self.page_width = width;
        self
    }

    /// Sets the distribution overflow policy.
    pub fn with_overflow(mut self, overflow: DistributionOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    /// Checks the page fits the fixed report sections.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Configuration`] for pages too small to lay out.
    pub fn validate(&self) -> Result<()> {
        if self.page_lines < MIN_PAGE_LINES {
            return Err(FleetError::Configuration(format!(
                "report page must have at least {MIN_PAGE_LINES} lines, got {}",
                self.page_lines
            )));
        }
        if self.page_width < MIN_PAGE_WIDTH {
            return Err(FleetError::Configuration(format!(
                "report page must be at least {MIN_PAGE_WIDTH} columns wide, got {}",
                self.page_width
            )));
        }
        Ok(())
    }
}

/// Settings for one analytics pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of uploads returned by the history listing
    pub history_window: usize,
    /// CSV decoding options
    pub csv: CsvOptions,
    /// Text report layout
    pub report: ReportConfig,
    /// Pipeline logging verbosity
    pub log: LogConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            csv: CsvOptions::default(),
            report: ReportConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with overrides read from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Configuration`] if a variable is set to something
    /// other than a positive integer, or the result fails [`Self::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(window) = parse_var(&lookup, ENV_HISTORY_WINDOW)? {
            config.history_window = window;
        }
        if let Some(lines) = parse_var(&lookup, ENV_REPORT_PAGE_LINES)? {
            config.report.page_lines = lines;
        }
        if let Some(width) = parse_var(&lookup, ENV_REPORT_PAGE_WIDTH)? {
            config.report.page_width = width;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the history window.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Sets the CSV decoding options.
    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    /// Sets the report layout.
    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }

    /// Sets the pipeline logging configuration.
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Configuration`] for a zero history window, a zero
    /// CSV batch size or an unusable report page.
    pub fn validate(&self) -> Result<()> {
        if self.history_window == 0 {
            return Err(FleetError::Configuration(
                "history window must be at least 1".to_string(),
            ));
        }
        if self.csv.batch_size == 0 {
            return Err(FleetError::Configuration(
                "CSV batch size must be at least 1".to_string(),
            ));
        }
        self.report.validate()
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| FleetError::Configuration(format!("{key} must be a positive integer, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.history_window, 5);
        assert_eq!(config.report.page_lines, 60);
        assert_eq!(config.report.page_width, 80);
        assert_eq!(config.report.overflow, DistributionOverflow::Paginate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_HISTORY_WINDOW, "12"),
            (ENV_REPORT_PAGE_LINES, " 40 "),
        ]))
        .unwrap();

        assert_eq!(config.history_window, 12);
        assert_eq!(config.report.page_lines, 40);
        assert_eq!(config.report.page_width, 80);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = PipelineConfig::from_lookup(lookup(&[(ENV_HISTORY_WINDOW, "five")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains(ENV_HISTORY_WINDOW));

        let err = PipelineConfig::from_lookup(lookup(&[(ENV_HISTORY_WINDOW, "0")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_report_page_limits() {
        assert!(ReportConfig::default().with_page_lines(10).validate().is_err());
        assert!(ReportConfig::default().with_page_width(20).validate().is_err());
        assert!(ReportConfig::default()
            .with_page_lines(MIN_PAGE_LINES)
            .with_page_width(MIN_PAGE_WIDTH)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_single_page_preset() {
        let config = ReportConfig::single_page(10);
        assert_eq!(
            config.overflow,
            DistributionOverflow::Truncate { max_entries: 10 }
        );
    }
}
