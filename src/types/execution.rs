use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Date format used internally for execution timestamps (two-digit year).
pub const EXEC_DATE_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// One normalized fill from a broker statement. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Raw execution time as found in the statement, canonically `MM/DD/YY[ HH:MM:SS]`.
    pub exec_time: String,
}

impl Execution {
    /// `quantity * price`, or `None` when the product does not fit a `Decimal`.
    pub fn notional(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }

    /// Calendar date of the fill, taken from the first token of `exec_time`.
    pub fn trade_date(&self) -> Option<NaiveDate> {
        let first = self.exec_time.split_whitespace().next()?;
        NaiveDate::parse_from_str(first, EXEC_DATE_FORMAT).ok()
    }
}
