//! Static registry for guided-conversion wizard plugins.
//!
//! Plugins are a closed set known at compile time. Each kind carries its own
//! strongly-typed configuration and wizard step sequence; the registry is
//! resolved once at startup, so a missing or misnamed plugin is impossible
//! at runtime.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of plugin identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Guided Excel-to-chart conversion wizard.
    ExcelChart,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::ExcelChart => write!(f, "excel_chart"),
        }
    }
}

/// Steps a wizard walks the user through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    UploadWorkbook,
    SelectRange,
    ChooseChart,
    ReviewRun,
}

/// Chart outputs the Excel wizard can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
}

/// Configuration for the Excel-to-chart wizard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExcelChartConfig {
    /// Rows shown in the range-selection preview.
    pub max_preview_rows: usize,
    /// Chart kinds offered in the chooser.
    pub chart_kinds: Vec<ChartKind>,
}

impl Default for ExcelChartConfig {
    fn default() -> Self {
        Self {
            max_preview_rows: 50,
            chart_kinds: vec![
                ChartKind::Bar,
                ChartKind::Line,
                ChartKind::Scatter,
                ChartKind::Pie,
            ],
        }
    }
}

/// Per-kind configuration, one variant per [`PluginKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginConfig {
    ExcelChart(ExcelChartConfig),
}

/// Everything the UI needs to present and drive one plugin.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginDescriptor {
    pub kind: PluginKind,
    pub title: &'static str,
    pub description: &'static str,
    pub steps: &'static [WizardStep],
    pub config: PluginConfig,
}

/// Startup-resolved table of all known plugins.
pub struct PluginRegistry {
    plugins: FxHashMap<PluginKind, PluginDescriptor>,
}

impl PluginRegistry {
    /// The compile-time registration table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut plugins = FxHashMap::default();
        plugins.insert(
            PluginKind::ExcelChart,
            PluginDescriptor {
                kind: PluginKind::ExcelChart,
                title: "Excel to chart",
                description: "Turn an uploaded spreadsheet range into a chart run.",
                steps: &[
                    WizardStep::UploadWorkbook,
                    WizardStep::SelectRange,
                    WizardStep::ChooseChart,
                    WizardStep::ReviewRun,
                ],
                config: PluginConfig::ExcelChart(ExcelChartConfig::default()),
            },
        );
        Self { plugins }
    }

    #[must_use]
    pub fn get(&self, kind: PluginKind) -> Option<&PluginDescriptor> {
        self.plugins.get(&kind)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
