//! CSV file data adapter. Expects one `{TICKER}.csv` per ticker with
//! `date,open,high,low,close,volume` columns.

use crate::domain::error::SwingsimError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn parse_field<T: std::str::FromStr>(
        record: &csv::StringRecord,
        index: usize,
        name: &str,
    ) -> Result<T, SwingsimError>
    where
        T::Err: std::fmt::Display,
    {
        record
            .get(index)
            .ok_or_else(|| SwingsimError::Data {
                reason: format!("missing {} column", name),
            })?
            .parse()
            .map_err(|e| SwingsimError::Data {
                reason: format!("invalid {} value: {}", name, e),
            })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SwingsimError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| SwingsimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SwingsimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| SwingsimError::Data {
                reason: "missing date column".into(),
            })?;
            let date =
                NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| SwingsimError::Data {
                    reason: format!("invalid date format: {}", e),
                })?;

            if date < start_date || date > end_date {
                continue;
            }

            let open: f64 = Self::parse_field(&record, 1, "open")?;
            let high: f64 = Self::parse_field(&record, 2, "high")?;
            let low: f64 = Self::parse_field(&record, 3, "low")?;
            let close: f64 = Self::parse_field(&record, 4, "close")?;
            let volume: i64 = Self::parse_field(&record, 5, "volume")?;

            bars.push(OhlcvBar {
                ticker: ticker.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SwingsimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SwingsimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| SwingsimError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SwingsimError> {
        if !self.csv_path(ticker).exists() {
            return Ok(None);
        }
        let bars = self.fetch_ohlcv(ticker, NaiveDate::MIN, NaiveDate::MAX)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}
