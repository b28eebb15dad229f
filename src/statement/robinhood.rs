//! Robinhood activity exports: a flat CSV with a single header row.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::statement::{StatementParser, non_blank, parse_amount};
use crate::types::execution::{EXEC_DATE_FORMAT, Execution, Side};

const ACTIVITY_DATE_FORMAT: &str = "%m/%d/%Y";
const OPTION_TRANS_CODES: [&str; 3] = ["BTO", "STO", "STC"];

pub struct Robinhood;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RobinhoodRow {
    #[serde(rename = "Activity Date", default)]
    pub activity_date: Option<String>,
    #[serde(rename = "Instrument", default)]
    pub instrument: Option<String>,
    #[serde(rename = "Trans Code", default)]
    pub trans_code: Option<String>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<String>,
    #[serde(rename = "Price", default)]
    pub price: Option<String>,
}

impl RobinhoodRow {
    fn into_execution(self) -> Option<Execution> {
        let symbol = non_blank(self.instrument.as_deref())?.to_uppercase();
        let trans_code = non_blank(self.trans_code.as_deref())?;
        let quantity = non_blank(self.quantity.as_deref())?;
        let price = non_blank(self.price.as_deref())?;

        if OPTION_TRANS_CODES.contains(&trans_code) {
            tracing::debug!(symbol = %symbol, trans_code, "skipping option activity");
            return None;
        }
        let side = match trans_code {
            "Buy" => Side::Buy,
            "Sell" => Side::Sell,
            _ => return None,
        };

        Some(Execution {
            symbol,
            side,
            quantity: parse_amount(quantity).abs(),
            price: parse_amount(price),
            exec_time: canonical_activity_date(self.activity_date.as_deref().unwrap_or("")),
        })
    }
}

/// `MM/DD/YYYY` -> `MM/DD/YY`; anything else is kept verbatim.
pub(crate) fn canonical_activity_date(raw: &str) -> String {
    let raw = raw.trim();
    match NaiveDate::parse_from_str(raw, ACTIVITY_DATE_FORMAT) {
        Ok(date) => date.format(EXEC_DATE_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

impl StatementParser for Robinhood {
    fn parse(&self, text: &str) -> Vec<Execution> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        match reader.headers() {
            Ok(headers) if headers.iter().any(|h| h.trim() == "Trans Code") => {}
            _ => {
                tracing::info!("statement has no Robinhood activity header");
                return Vec::new();
            }
        }

        let mut out = Vec::new();
        for (idx, record) in reader.deserialize::<RobinhoodRow>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(row = idx + 1, error = %e, "skipping unreadable row");
                    continue;
                }
            };
            if let Some(execution) = row.into_execution() {
                out.push(execution);
            }
        }
        out
    }
}
