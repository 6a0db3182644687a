use crate::columnar::Columnar;
use crate::error::{PipelineError, Result};
use crate::records::AnonymizedRecord;
use crate::storage::BatchStore;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const GMAIL: &str = "gmail.com";

/// Gmail-user count for one country, with its dense rank.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryGmailCount {
    pub country: String,
    pub gmail_users: i64,
    pub rank: i64,
}

/// Aggregate results of one mart run.
#[derive(Debug, Clone, PartialEq)]
pub struct MartReport {
    pub gmail_in_germany_pct: f64,
    pub top_gmail_countries: Vec<CountryGmailCount>,
    pub gmail_users_over_60: i64,
}

/// Computes aggregate tables from the full transformed dataset and persists
/// each one as a named mart table (overwritten on every run).
pub struct DataMart {
    store: Arc<dyn BatchStore>,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl DataMart {
    pub fn new(store: Arc<dyn BatchStore>, input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            store,
            input_dir,
            output_dir,
        }
    }

    /// Runs every aggregate over one bulk read of the transformed dataset.
    pub fn run(&self) -> Result<MartReport> {
        let rows = self.load()?;
        let report = MartReport {
            gmail_in_germany_pct: self.percentage_gmail_users_in_germany(&rows)?,
            top_gmail_countries: self.top_three_countries_using_gmail(&rows)?,
            gmail_users_over_60: self.gmail_users_over_age_60(&rows)?,
        };
        info!(
            gmail_in_germany_pct = report.gmail_in_germany_pct,
            top_countries = report.top_gmail_countries.len(),
            over_60 = report.gmail_users_over_60,
            "mart stage complete"
        );
        Ok(report)
    }

    fn load(&self) -> Result<Vec<AnonymizedRecord>> {
        let combined = self.store.read_all(&self.input_dir)?;
        let rows = AnonymizedRecord::from_batch(&combined)?;
        if rows.is_empty() {
            return Err(PipelineError::Validation(
                "transformed dataset holds no rows to aggregate".to_string(),
            ));
        }
        Ok(rows)
    }

    fn is_gmail(row: &AnonymizedRecord) -> bool {
        row.email_provider.as_deref() == Some(GMAIL)
    }

    /// Share of rows that are Gmail users in Germany, as a percentage
    /// rounded to two decimal places.
    pub fn percentage_gmail_users_in_germany(&self, rows: &[AnonymizedRecord]) -> Result<f64> {
        let matching = rows
            .iter()
            .filter(|r| r.country == "Germany" && Self::is_gmail(r))
            .count();
        let pct = (matching as f64 / rows.len() as f64) * 100.0;
        let pct = (pct * 100.0).round() / 100.0;

        let schema = Arc::new(Schema::new(vec![Field::new(
            "percentage",
            DataType::Float64,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Float64Array::from_iter_values([pct])) as ArrayRef],
        )?;
        self.store
            .write(&self.output_dir, &batch, Some("percentage_gmail_users_in_germany"))?;
        Ok(pct)
    }

    /// Countries with the highest Gmail-user counts, dense-ranked, ranks
    /// one through three retained.
    pub fn top_three_countries_using_gmail(
        &self,
        rows: &[AnonymizedRecord],
    ) -> Result<Vec<CountryGmailCount>> {
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for row in rows.iter().filter(|r| Self::is_gmail(r)) {
            *counts.entry(row.country.as_str()).or_default() += 1;
        }

        let mut ordered: Vec<(&str, i64)> = counts.into_iter().collect();
        // Country name breaks count ties deterministically
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut top = Vec::new();
        let mut rank = 0i64;
        let mut last_count = None;
        for (country, gmail_users) in ordered {
            if last_count != Some(gmail_users) {
                rank += 1;
                last_count = Some(gmail_users);
            }
            if rank > 3 {
                break;
            }
            top.push(CountryGmailCount {
                country: country.to_string(),
                gmail_users,
                rank,
            });
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new("country", DataType::Utf8, false),
            Field::new("gmail_users", DataType::Int64, false),
            Field::new("rank", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from_iter_values(top.iter().map(|c| c.country.as_str())))
                    as ArrayRef,
                Arc::new(Int64Array::from_iter_values(top.iter().map(|c| c.gmail_users))),
                Arc::new(Int64Array::from_iter_values(top.iter().map(|c| c.rank))),
            ],
        )?;
        self.store
            .write(&self.output_dir, &batch, Some("top_three_countries_using_gmail"))?;
        Ok(top)
    }

    /// Count of Gmail users whose age group's upper bound reaches 60.
    pub fn gmail_users_over_age_60(&self, rows: &[AnonymizedRecord]) -> Result<i64> {
        let count = rows
            .iter()
            .filter(|r| Self::is_gmail(r))
            .filter(|r| {
                r.age_group
                    .as_deref()
                    .and_then(|label| label.split('-').nth(1))
                    .and_then(|upper| upper.parse::<i64>().ok())
                    .is_some_and(|upper| upper >= 60)
            })
            .count() as i64;

        let schema = Arc::new(Schema::new(vec![Field::new(
            "users_count",
            DataType::Int64,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from_iter_values([count])) as ArrayRef],
        )?;
        self.store
            .write(&self.output_dir, &batch, Some("gmail_users_over_age_60"))?;
        Ok(count)
    }
}
