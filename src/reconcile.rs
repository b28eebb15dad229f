//! Per-symbol position reconciliation.
//!
//! Each symbol in an upload lands in exactly one of three outcomes, decided
//! from the aggregated buy/sell totals:
//!
//! * `NoBuys`: only sells were seen. The position is closed immediately with
//!   the sell average standing in as the entry price, so realized P&L is zero.
//! * `NetOpen`: more shares bought than sold. The position stays open with the
//!   net quantity; P&L is realized on the sold portion only.
//! * `NetClosedOrFlat`: everything bought was sold (or more). The position is
//!   closed at the weighted sell average.
//!
//! Totals from the current upload overwrite the target position's figures.
//! Symbols absent from the upload are never touched.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::LegTotals;
use crate::types::position::{Position, PositionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    NoBuys,
    NetOpen,
    NetClosedOrFlat,
}

impl Outcome {
    pub fn classify(totals: &LegTotals) -> Self {
        if totals.total_buy_shares.is_zero() {
            Outcome::NoBuys
        } else if totals.net_shares() > Decimal::ZERO {
            Outcome::NetOpen
        } else {
            Outcome::NetClosedOrFlat
        }
    }
}

/// A user's existing positions, built once at the start of an upload.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    open: HashMap<String, Position>,
    latest: HashMap<String, Position>,
}

impl PositionIndex {
    pub fn new<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut index = Self::default();
        for pos in positions {
            if pos.is_open() {
                index.open.insert(pos.symbol.clone(), pos.clone());
            }
            let newer = index
                .latest
                .get(&pos.symbol)
                .is_none_or(|current| pos.updated_at > current.updated_at);
            if newer {
                index.latest.insert(pos.symbol.clone(), pos.clone());
            }
        }
        index
    }

    pub fn open_for(&self, symbol: &str) -> Option<&Position> {
        self.open.get(symbol)
    }

    /// OPEN position if there is one, otherwise the most recently updated one.
    pub fn any_for(&self, symbol: &str) -> Option<&Position> {
        self.open.get(symbol).or_else(|| self.latest.get(symbol))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcome: Outcome,
    pub position: Position,
    /// True when no existing row was found and `position` must be inserted.
    pub is_new: bool,
}

/// Decide the resulting position for one symbol. `today` dates a position that
/// has no dated leg on the relevant side.
pub fn reconcile_symbol(
    user_id: Uuid,
    symbol: &str,
    totals: &LegTotals,
    index: &PositionIndex,
    today: NaiveDate,
) -> Reconciliation {
    let outcome = Outcome::classify(totals);
    let buy_avg = totals.buy_avg_price();
    let sell_avg = totals.sell_avg_price();

    let existing = match outcome {
        Outcome::NoBuys => index.any_for(symbol),
        Outcome::NetOpen | Outcome::NetClosedOrFlat => index.open_for(symbol),
    };
    let is_new = existing.is_none();
    let mut position = existing.cloned().unwrap_or_else(|| {
        Position::open(user_id, symbol, Decimal::ZERO, Decimal::ZERO, today)
    });

    match outcome {
        Outcome::NoBuys => {
            let sell_date = totals.latest_sell_date.unwrap_or(today);
            position.status = PositionStatus::Closed;
            position.total_shares = totals.total_sell_shares;
            position.buy_price = sell_avg;
            position.buy_date = sell_date;
            position.sell_price = Some(sell_avg);
            position.sell_date = Some(sell_date);
            position.pnl = Some(Decimal::ZERO);
        }
        Outcome::NetOpen => {
            position.status = PositionStatus::Open;
            position.total_shares = totals.net_shares();
            position.buy_price = buy_avg;
            position.buy_date = totals.earliest_buy_date.unwrap_or(today);
            position.sell_price = None;
            position.sell_date = None;
            position.pnl = if totals.total_sell_shares > Decimal::ZERO {
                Some((sell_avg - buy_avg).saturating_mul(totals.total_sell_shares))
            } else {
                None
            };
        }
        Outcome::NetClosedOrFlat => {
            position.status = PositionStatus::Closed;
            position.total_shares = Decimal::ZERO;
            position.buy_price = buy_avg;
            position.buy_date = totals.earliest_buy_date.unwrap_or(today);
            position.sell_price = Some(sell_avg);
            position.sell_date = Some(totals.latest_sell_date.unwrap_or(today));
            position.pnl = Some((sell_avg - buy_avg).saturating_mul(totals.total_sell_shares));
        }
    }
    position.updated_at = Utc::now();

    tracing::debug!(
        symbol,
        position_id = %position.id,
        ?outcome,
        is_new,
        total_shares = %position.total_shares,
        pnl = ?position.pnl,
        "reconciled symbol"
    );

    Reconciliation {
        outcome,
        position,
        is_new,
    }
}
