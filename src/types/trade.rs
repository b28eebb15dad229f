use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::position::PositionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingType {
    Swing,
    Day,
}

impl TradingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingType::Swing => "Swing",
            TradingType::Day => "Day",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Swing" => Some(TradingType::Swing),
            "Day" => Some(TradingType::Day),
            _ => None,
        }
    }

    /// Day iff entry and exit fall on the same calendar date.
    pub fn classify(entry: NaiveDate, exit: Option<NaiveDate>) -> Self {
        match exit {
            Some(exit) if exit == entry => TradingType::Day,
            _ => TradingType::Swing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinLoss {
    Win,
    Loss,
    Pending,
}

impl WinLoss {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinLoss::Win => "Win",
            WinLoss::Loss => "Loss",
            WinLoss::Pending => "Pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Win" => Some(WinLoss::Win),
            "Loss" => Some(WinLoss::Loss),
            "Pending" => Some(WinLoss::Pending),
            _ => None,
        }
    }
}

/// Audit-trail leg. Cost basis, proceeds and win/loss always come from
/// [`Trade::derive`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker_symbol: String,
    pub number_of_shares: Decimal,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub price_cost_basis: Option<Decimal>,
    pub proceeds: Option<Decimal>,
    pub date: NaiveDate,
    pub trading_type: TradingType,
    pub win_loss: WinLoss,
    pub status: PositionStatus,
    pub position_id: Option<String>,
    pub shares_remaining: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies; cost basis, proceeds and win/loss are derived.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub user_id: Uuid,
    pub ticker_symbol: String,
    pub number_of_shares: Decimal,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub date: NaiveDate,
    pub trading_type: TradingType,
    pub status: PositionStatus,
    pub position_id: Option<String>,
    pub shares_remaining: Option<Decimal>,
}

impl Trade {
    pub fn new(new: NewTrade) -> Self {
        let now = Utc::now();
        let mut trade = Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            ticker_symbol: new.ticker_symbol.to_uppercase(),
            number_of_shares: new.number_of_shares,
            buy_price: new.buy_price,
            sell_price: new.sell_price,
            price_cost_basis: None,
            proceeds: None,
            date: new.date,
            trading_type: new.trading_type,
            win_loss: WinLoss::Pending,
            status: new.status,
            position_id: new.position_id,
            shares_remaining: new.shares_remaining,
            created_at: now,
            updated_at: now,
        };
        trade.derive();
        trade.updated_at = now;
        trade
    }

    /// Recompute cost basis, proceeds and win/loss from shares and prices.
    /// A product that does not fit a `Decimal` is left unknown.
    pub fn derive(&mut self) {
        let shares = self.number_of_shares;
        self.price_cost_basis = self.buy_price.and_then(|p| shares.checked_mul(p));
        self.proceeds = self.sell_price.and_then(|p| shares.checked_mul(p));
        self.win_loss = match (self.proceeds, self.price_cost_basis) {
            (Some(proceeds), Some(cost)) if proceeds > cost => WinLoss::Win,
            (Some(_), _) => WinLoss::Loss,
            (None, _) => WinLoss::Pending,
        };
        self.updated_at = Utc::now();
    }

    /// `proceeds - price_cost_basis`, when both sides are known.
    pub fn profit_loss(&self) -> Option<Decimal> {
        self.proceeds?.checked_sub(self.price_cost_basis?)
    }
}
