//! Per-mnemonic configuration loaded from instrument catalogs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Relational predicate applied to a dependency mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Relation {
    /// `value == threshold`
    Equal,
    /// `value > threshold`
    GreaterThan,
    /// `value < threshold`
    LessThan,
}

impl Relation {
    /// Canonical symbolic form used in catalogs.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
        }
    }

    /// Evaluate the predicate for one sample. Non-finite values never hold.
    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            #[allow(clippy::float_cmp)]
            Self::Equal => value == threshold,
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Relation {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" | "equal" => Ok(Self::Equal),
            ">" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "less_than" => Ok(Self::LessThan),
            other => Err(MonitorError::configuration(format!(
                "unrecognized dependency relation: {other:?}"
            ))),
        }
    }
}

impl TryFrom<String> for Relation {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Relation> for String {
    fn from(r: Relation) -> Self {
        r.symbol().to_string()
    }
}

/// A condition on another mnemonic that must hold for target samples to count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Dependency mnemonic name.
    pub name: String,
    /// Relation applied to each dependency sample.
    pub relation: Relation,
    /// Threshold compared against each dependency sample.
    pub threshold: f64,
}

impl DependencySpec {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, relation: Relation, threshold: f64) -> Self {
        Self {
            name: name.into(),
            relation,
            threshold,
        }
    }
}

/// How filtered samples are grouped before statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One bin per UTC calendar day.
    DailyMeans,
    /// One bin per condition-satisfying block.
    BlockMeans,
    /// Fixed-width time bins restarted at every block.
    TimeInterval,
    /// Groups delimited by jumps in the single dependency.
    EveryChange,
    /// Raw filtered samples, never persisted.
    None,
}

impl AggregationMode {
    /// All modes in catalog order.
    pub const ALL: [Self; 5] = [
        Self::DailyMeans,
        Self::BlockMeans,
        Self::TimeInterval,
        Self::EveryChange,
        Self::None,
    ];

    /// Catalog key for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyMeans => "daily_means",
            Self::BlockMeans => "block_means",
            Self::TimeInterval => "time_interval",
            Self::EveryChange => "every_change",
            Self::None => "none",
        }
    }

    /// Whether results for this mode are written to persistence and tracked
    /// in the last-query-time store.
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to plot for a mnemonic once its trend is computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum PlotData {
    /// Plot the filtered mnemonic itself.
    #[default]
    Nominal,
    /// Plot the product of the mnemonic and another mnemonic (`"*OTHER"`).
    Product(String),
}

impl FromStr for PlotData {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "nominal" {
            return Ok(Self::Nominal);
        }
        match s.strip_prefix('*') {
            Some(other) if is_valid_mnemonic(other) => Ok(Self::Product(other.to_string())),
            _ => Err(MonitorError::configuration(format!(
                "plot_data must be \"nominal\" or \"*<MNEMONIC>\", got {s:?}"
            ))),
        }
    }
}

impl TryFrom<String> for PlotData {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlotData> for String {
    fn from(p: PlotData) -> Self {
        match p {
            PlotData::Nominal => "nominal".to_string(),
            PlotData::Product(other) => format!("*{other}"),
        }
    }
}

/// Configuration of a single monitored mnemonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnemonicConfig {
    /// Target mnemonic name.
    pub name: String,
    /// Conditions that must all hold; empty means always true.
    #[serde(default)]
    pub dependency: Vec<DependencySpec>,
    /// Plot directive.
    #[serde(default)]
    pub plot_data: PlotData,
    /// Bin width for `time_interval` mode, e.g. `"15_minutes"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_time_block: Option<String>,
    /// Nominal value drawn on plots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_value: Option<f64>,
    /// Yellow (warning) limits `[low, high]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yellow_limits: Option<[f64; 2]>,
    /// Red (alarm) limits `[low, high]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_limits: Option<[f64; 2]>,
}

impl MnemonicConfig {
    /// Minimal configuration: no dependencies, nominal plotting.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependency: Vec::new(),
            plot_data: PlotData::Nominal,
            mean_time_block: None,
            nominal_value: None,
            yellow_limits: None,
            red_limits: None,
        }
    }

    /// Add a dependency condition.
    #[must_use]
    pub fn with_dependency(mut self, dep: DependencySpec) -> Self {
        self.dependency.push(dep);
        self
    }

    /// Set the plot directive.
    #[must_use]
    pub fn with_plot_data(mut self, plot: PlotData) -> Self {
        self.plot_data = plot;
        self
    }

    /// Set the `time_interval` bin width string.
    #[must_use]
    pub fn with_mean_time_block(mut self, block: impl Into<String>) -> Self {
        self.mean_time_block = Some(block.into());
        self
    }

    /// Check the target and dependency names.
    ///
    /// # Errors
    /// Returns `MonitorError::Configuration` naming the first invalid mnemonic.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let names = std::iter::once(self.name.as_str())
            .chain(self.dependency.iter().map(|d| d.name.as_str()));
        for name in names {
            if !is_valid_mnemonic(name) {
                return Err(MonitorError::configuration(format!(
                    "invalid mnemonic name {name:?}"
                )));
            }
        }
        Ok(())
    }

    /// Parsed `mean_time_block`, if set.
    ///
    /// # Errors
    /// Returns `MonitorError::Configuration` if the width cannot be parsed.
    pub fn time_block(&self) -> Result<Option<Duration>, MonitorError> {
        self.mean_time_block
            .as_deref()
            .map(parse_time_block)
            .transpose()
    }
}

/// Parse a bin width such as `"15_minutes"`, `"1_hour"` or `"2_days"`.
///
/// # Errors
/// Returns `MonitorError::Configuration` for an unknown unit, a missing or
/// zero count, or a malformed string.
pub fn parse_time_block(s: &str) -> Result<Duration, MonitorError> {
    let bad = || MonitorError::configuration(format!("invalid mean_time_block: {s:?}"));
    let (count, unit) = s.trim().split_once('_').ok_or_else(bad)?;
    let count: u64 = count.parse().map_err(|_| bad())?;
    if count == 0 {
        return Err(bad());
    }
    let unit_secs = match unit {
        "second" | "seconds" | "sec" => 1,
        "minute" | "minutes" | "min" => 60,
        "hour" | "hours" => 3_600,
        "day" | "days" => 86_400,
        _ => return Err(bad()),
    };
    count
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(bad)
}

/// Returns true if `name` looks like an engineering-database mnemonic:
/// non-empty, uppercase ASCII letters, digits and underscores only.
#[must_use]
pub fn is_valid_mnemonic(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// All mnemonics monitored for one instrument, grouped by aggregation mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MnemonicCatalog {
    modes: BTreeMap<AggregationMode, Vec<MnemonicConfig>>,
}

impl MnemonicCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a catalog from its JSON form.
    ///
    /// # Errors
    /// Returns `MonitorError::Configuration` for malformed JSON, unknown
    /// aggregation modes, unknown relations, bad plot directives or invalid
    /// mnemonic names.
    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| MonitorError::configuration(format!("invalid catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Add a mnemonic under a mode.
    #[must_use]
    pub fn with(mut self, mode: AggregationMode, config: MnemonicConfig) -> Self {
        self.modes.entry(mode).or_default().push(config);
        self
    }

    /// Check every mnemonic and dependency name.
    ///
    /// # Errors
    /// Returns `MonitorError::Configuration` naming the first invalid mnemonic.
    pub fn validate(&self) -> Result<(), MonitorError> {
        for (mode, config) in self.entries() {
            config.validate().map_err(|e| match e {
                MonitorError::Configuration(msg) => {
                    MonitorError::configuration(format!("{msg} under {mode}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Iterate `(mode, config)` pairs in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (AggregationMode, &MnemonicConfig)> {
        self.modes
            .iter()
            .flat_map(|(mode, list)| list.iter().map(move |c| (*mode, c)))
    }

    /// Mnemonics configured for one mode.
    #[must_use]
    pub fn mode(&self, mode: AggregationMode) -> &[MnemonicConfig] {
        self.modes.get(&mode).map_or(&[], Vec::as_slice)
    }

    /// Total number of configured mnemonics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modes.values().map(Vec::len).sum()
    }

    /// True if no mnemonic is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
