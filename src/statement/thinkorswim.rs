//! ThinkOrSwim account statements: a multi-section CSV where trades live under
//! an "Account Trade History" marker row.

use crate::statement::{StatementParser, non_blank, parse_amount};
use crate::types::execution::{Execution, Side};

const SECTION_MARKER: &str = "Account Trade History";
const MIN_CELLS: usize = 12;
const EXEC_TIME_COLUMNS: [&str; 3] = ["Exec Time", "ExecTime", "Date"];

pub struct ThinkOrSwim;

/// One data row of the trade history section, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThinkOrSwimRow {
    pub exec_time: Option<String>,
    pub side: Option<String>,
    pub qty: Option<String>,
    pub symbol: Option<String>,
    pub price: Option<String>,
}

impl ThinkOrSwimRow {
    fn from_cells(headers: &[String], cells: &[String]) -> Self {
        let field = |name: &str| -> Option<String> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|idx| cells.get(idx))
                .map(|v| v.trim().to_string())
        };
        let exec_time = EXEC_TIME_COLUMNS
            .iter()
            .filter_map(|name| field(*name))
            .find(|v| !v.is_empty());
        Self {
            exec_time,
            side: field("Side"),
            qty: field("Qty"),
            symbol: field("Symbol"),
            price: field("Price"),
        }
    }

    fn into_execution(self) -> Option<Execution> {
        let symbol = non_blank(self.symbol.as_deref())?.to_uppercase();
        let side = match non_blank(self.side.as_deref())?.to_uppercase().as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            other => {
                tracing::debug!(symbol = %symbol, side = other, "skipping row with unknown side");
                return None;
            }
        };
        let quantity = self.qty.as_deref().map(parse_amount).unwrap_or_default().abs();
        let price = self.price.as_deref().map(parse_amount).unwrap_or_default();
        Some(Execution {
            symbol,
            side,
            quantity,
            price,
            exec_time: self.exec_time.unwrap_or_default(),
        })
    }
}

impl StatementParser for ThinkOrSwim {
    fn parse(&self, text: &str) -> Vec<Execution> {
        let rows = read_rows(text);

        let Some(marker) = rows
            .iter()
            .position(|row| row.iter().any(|cell| cell.contains(SECTION_MARKER)))
        else {
            tracing::info!("no '{}' section in statement", SECTION_MARKER);
            return Vec::new();
        };
        let Some(headers) = rows.get(marker + 1) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for (offset, cells) in rows.iter().skip(marker + 2).enumerate() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                break;
            }
            if cells.len() < MIN_CELLS || cells[2].trim().is_empty() {
                tracing::debug!(row = marker + 2 + offset, "skipping malformed trade row");
                continue;
            }
            if let Some(execution) = ThinkOrSwimRow::from_cells(headers, cells).into_execution() {
                out.push(execution);
            }
        }
        out
    }
}

/// Split the statement into CSV rows. Blank lines are kept as empty rows since
/// they terminate a section.
fn read_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                return Vec::new();
            }
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(line.as_bytes());
            match reader.records().next() {
                Some(Ok(record)) => record.iter().map(str::to_string).collect(),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "unreadable statement line");
                    vec![line.to_string()]
                }
                None => Vec::new(),
            }
        })
        .collect()
}
