//! Optional YAML defaults for `plot-ev`; command-line flags take precedence.

use anyhow::{Context, Result};
use ev_pipeline::{ChartOptions, FilterSpec, DEFAULT_TITLE};
use ev_render::DEFAULT_SIZE;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUT: &str = "ev_by_seed.svg";

/// File-level settings. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    pub out: PathBuf,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub log_x: bool,
    pub show_legend: bool,
    pub filters: FilterSpec,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            out: PathBuf::from(DEFAULT_OUT),
            width: DEFAULT_SIZE.0,
            height: DEFAULT_SIZE.1,
            title: DEFAULT_TITLE.to_string(),
            log_x: false,
            show_legend: true,
            filters: FilterSpec::default(),
        }
    }
}

impl PlotConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("invalid plot config")?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            title: self.title.clone(),
            log_x: self.log_x,
            show_legend: self.show_legend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PlotConfig::from_yaml("{}").unwrap(), PlotConfig::default());
    }

    #[test]
    fn partial_document() {
        let cfg = PlotConfig::from_yaml(
            "out: charts/ev.png\nwidth: 800\nlog_x: true\nfilters:\n  min_trials: 100\n  sides: 6\n",
        )
        .unwrap();
        assert_eq!(cfg.out, PathBuf::from("charts/ev.png"));
        assert_eq!(cfg.width, 800);
        assert_eq!(cfg.height, DEFAULT_SIZE.1);
        assert!(cfg.log_x);
        assert_eq!(cfg.filters.min_trials, Some(100.0));
        assert_eq!(cfg.filters.sides, Some(6));
        assert_eq!(cfg.filters.payout, None);
        assert_eq!(cfg.chart_options().title, DEFAULT_TITLE);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PlotConfig::from_yaml("colour: red\n").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlotConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
