use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "OPEN",
            PositionStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Some(PositionStatus::Open),
            "CLOSED" => Some(PositionStatus::Closed),
            _ => None,
        }
    }
}

/// Consolidated holding per (user, symbol). At most one OPEN position exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub user_id: Uuid,
    pub symbol: String,
    pub status: PositionStatus,
    pub total_shares: Decimal,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
    pub sell_price: Option<Decimal>,
    pub sell_date: Option<NaiveDate>,
    pub pnl: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// New OPEN position with a fresh `POS_XXXXXXXX` id.
    pub fn open(
        user_id: Uuid,
        symbol: &str,
        total_shares: Decimal,
        buy_price: Decimal,
        buy_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_position_id(),
            user_id,
            symbol: symbol.to_uppercase(),
            status: PositionStatus::Open,
            total_shares,
            buy_price,
            buy_date,
            sell_price: None,
            sell_date: None,
            pnl: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Realized P&L, zero while nothing has been sold.
    pub fn realized_pnl(&self) -> Decimal {
        self.pnl.unwrap_or(Decimal::ZERO)
    }
}

pub fn generate_position_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("POS_{}", hex[..8].to_uppercase())
}
