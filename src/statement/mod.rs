//! Broker statement parsing: raw CSV bytes -> normalized executions.

mod robinhood;
mod thinkorswim;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

pub use robinhood::{Robinhood, RobinhoodRow};
pub use thinkorswim::{ThinkOrSwim, ThinkOrSwimRow};

use crate::types::execution::Execution;

/// A broker statement format. Implementations never fail: a statement they
/// cannot make sense of yields no executions.
pub trait StatementParser {
    fn parse(&self, text: &str) -> Vec<Execution>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broker {
    ThinkOrSwim,
    Robinhood,
}

impl Broker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Broker::ThinkOrSwim => "thinkorswim",
            Broker::Robinhood => "robinhood",
        }
    }

    fn parser(&self) -> &'static dyn StatementParser {
        match self {
            Broker::ThinkOrSwim => &ThinkOrSwim,
            Broker::Robinhood => &Robinhood,
        }
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedBroker(pub String);

impl fmt::Display for UnsupportedBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported platform '{}'", self.0)
    }
}

impl std::error::Error for UnsupportedBroker {}

impl FromStr for Broker {
    type Err = UnsupportedBroker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "thinkorswim" => Ok(Broker::ThinkOrSwim),
            "robinhood" => Ok(Broker::Robinhood),
            _ => Err(UnsupportedBroker(s.trim().to_string())),
        }
    }
}

/// Parse a raw upload for the given broker.
pub fn parse_statement(raw: &[u8], broker: Broker) -> Vec<Execution> {
    let text = decode_text_lossy(raw);
    let executions = broker.parser().parse(&text);
    tracing::debug!(%broker, count = executions.len(), "parsed statement");
    executions
}

fn decode_text_lossy(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse a statement amount, stripping a leading currency symbol and thousands
/// separators. Anything unparseable degrades to zero.
pub(crate) fn parse_amount(raw: &str) -> Decimal {
    let cleaned = raw.trim().replace(',', "");
    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let body = body.trim_start_matches('$').trim();
    match Decimal::from_str(body).or_else(|_| Decimal::from_scientific(body)) {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => {
            if !body.is_empty() {
                tracing::warn!(raw, "unparseable amount, using zero");
            }
            Decimal::ZERO
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
