use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of a campaign performance export.
///
/// Fields other than the date are kept as raw text; segment columns are read
/// as strings and metric columns are parsed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub date: NaiveDate,
    fields: BTreeMap<String, String>,
}

impl CampaignRecord {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Non-empty text of a segment column.
    #[must_use]
    pub fn segment(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Finite numeric value of a metric column.
    #[must_use]
    pub fn number(&self, column: &str) -> Option<f64> {
        self.fields
            .get(column)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

/// How a metric is read from each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSource {
    Column(String),
    /// `revenue / spend`, for exports without a `roas` column
    DerivedRoas,
}

impl MetricSource {
    /// Row value, `None` when missing, unparseable, or spend is zero.
    #[must_use]
    pub fn value(&self, record: &CampaignRecord) -> Option<f64> {
        match self {
            Self::Column(column) => record.number(column),
            Self::DerivedRoas => {
                let spend = record.number("spend")?;
                if spend.abs() < f64::EPSILON {
                    return None;
                }
                Some(record.number("revenue")? / spend)
            }
        }
    }
}

/// Parsed campaign export with its header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignTable {
    headers: Vec<String>,
    records: Vec<CampaignRecord>,
}

impl CampaignTable {
    #[must_use]
    pub fn new(headers: Vec<String>, records: Vec<CampaignRecord>) -> Self {
        Self { headers, records }
    }

    /// Reads a campaign CSV file.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened, the date column is
    /// missing, or any date fails to parse as `YYYY-MM-DD`
    pub fn from_path(path: impl AsRef<Path>, date_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        Self::from_reader(file, date_column)
            .with_context(|| format!("Failed to read campaign data from {}", path.display()))
    }

    /// Reads campaign rows from any CSV source with a header row.
    ///
    /// # Errors
    /// Returns error if the date column is missing or a row is malformed
    pub fn from_reader<R: Read>(reader: R, date_column: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let Some(date_index) = headers.iter().position(|h| h == date_column) else {
            bail!("CSV is missing the date column '{date_column}'");
        };

        let mut records = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let row = result.with_context(|| format!("Failed to read CSV row {}", line + 1))?;
            let raw_date = row.get(date_index).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
                .with_context(|| format!("Row {}: invalid date '{raw_date}'", line + 1))?;

            let mut record = CampaignRecord::new(date);
            for (index, value) in row.iter().enumerate() {
                if index != date_index {
                    if let Some(header) = headers.get(index) {
                        record = record.with_field(header.as_str(), value);
                    }
                }
            }
            records.push(record);
        }

        tracing::debug!(rows = records.len(), columns = headers.len(), "Loaded campaign CSV");
        Ok(Self { headers, records })
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    #[must_use]
    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// Picks how `metric` is read, deriving ROAS from revenue and spend when
    /// there is no `roas` column.
    ///
    /// # Errors
    /// Returns error if the metric column is absent and cannot be derived
    pub fn metric_source(&self, metric: &str) -> Result<MetricSource> {
        if self.has_column(metric) {
            return Ok(MetricSource::Column(metric.to_string()));
        }
        if metric == "roas" && self.has_column("revenue") && self.has_column("spend") {
            return Ok(MetricSource::DerivedRoas);
        }
        bail!("CSV has no '{metric}' column")
    }
}
