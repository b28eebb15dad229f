//! Ledger writer: turns reconciled positions into staged Position upserts and
//! per-leg Trade audit rows, and summarizes an upload.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{SymbolLegs, aggregate, cash_flow_by_symbol};
use crate::reconcile::{Outcome, PositionIndex, Reconciliation, reconcile_symbol};
use crate::types::execution::Execution;
use crate::types::position::{Position, PositionStatus};
use crate::types::trade::{NewTrade, Trade, TradingType};

/// Every mutation of one upload, staged in memory until commit.
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
}

impl LedgerBatch {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.trades.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadSummary {
    pub num_executions: usize,
    pub trades_added: usize,
    pub symbols: Vec<String>,
    pub pnl_by_symbol: BTreeMap<String, Decimal>,
    pub total_pnl: Decimal,
    pub new_positions: usize,
    pub updated_positions: usize,
    pub closed_positions: usize,
    pub open_positions: usize,
    pub day_trades: usize,
    pub swing_trades: usize,
}

/// How one leg was matched against the opposite side.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LegMatch {
    counter_date: Option<NaiveDate>,
    unmatched: Decimal,
}

/// Match sells against buys in statement order. Each leg's counter-leg is the
/// first opposite leg it traded shares with.
fn match_legs(legs: &SymbolLegs) -> (Vec<LegMatch>, Vec<LegMatch>) {
    let mut buys: Vec<LegMatch> = legs
        .buys
        .iter()
        .map(|l| LegMatch {
            counter_date: None,
            unmatched: l.quantity,
        })
        .collect();
    let mut sells: Vec<LegMatch> = legs
        .sells
        .iter()
        .map(|l| LegMatch {
            counter_date: None,
            unmatched: l.quantity,
        })
        .collect();

    let mut b = 0;
    for (s, sell_leg) in legs.sells.iter().enumerate() {
        while sells[s].unmatched > Decimal::ZERO && b < buys.len() {
            if buys[b].unmatched.is_zero() {
                b += 1;
                continue;
            }
            let qty = sells[s].unmatched.min(buys[b].unmatched);
            sells[s].unmatched -= qty;
            buys[b].unmatched -= qty;
            sells[s].counter_date.get_or_insert(legs.buys[b].date);
            buys[b].counter_date.get_or_insert(sell_leg.date);
        }
    }
    (buys, sells)
}

/// Stage the position and one Trade per buy leg and per sell leg.
///
/// Realized P&L lives on the sell legs only: a buy leg records its entry
/// price and never an exit price, so a round trip is counted once.
pub fn write_symbol(
    batch: &mut LedgerBatch,
    user_id: Uuid,
    legs: &SymbolLegs,
    reconciliation: &Reconciliation,
) -> Vec<Trade> {
    let position = &reconciliation.position;
    let (buy_matches, sell_matches) = match_legs(legs);

    let mut trades = Vec::with_capacity(legs.buys.len() + legs.sells.len());
    for (leg, m) in legs.buys.iter().zip(&buy_matches) {
        let remaining = match position.status {
            PositionStatus::Open => m.unmatched,
            PositionStatus::Closed => Decimal::ZERO,
        };
        trades.push(Trade::new(NewTrade {
            user_id,
            ticker_symbol: position.symbol.clone(),
            number_of_shares: leg.quantity,
            buy_price: Some(leg.price),
            sell_price: None,
            date: leg.date,
            trading_type: TradingType::classify(leg.date, m.counter_date),
            status: position.status,
            position_id: Some(position.id.clone()),
            shares_remaining: Some(remaining),
        }));
    }
    for (leg, m) in legs.sells.iter().zip(&sell_matches) {
        let counter_date = m.counter_date.unwrap_or(position.buy_date);
        trades.push(Trade::new(NewTrade {
            user_id,
            ticker_symbol: position.symbol.clone(),
            number_of_shares: leg.quantity,
            buy_price: Some(position.buy_price),
            sell_price: Some(leg.price),
            date: leg.date,
            trading_type: TradingType::classify(counter_date, Some(leg.date)),
            status: PositionStatus::Closed,
            position_id: Some(position.id.clone()),
            shares_remaining: Some(Decimal::ZERO),
        }));
    }

    batch.positions.push(position.clone());
    batch.trades.extend(trades.iter().cloned());
    trades
}

/// Run aggregation, reconciliation and ledger staging for one parsed upload.
pub fn build_upload(
    user_id: Uuid,
    executions: &[Execution],
    index: &PositionIndex,
    today: NaiveDate,
) -> (LedgerBatch, UploadSummary) {
    let mut batch = LedgerBatch::default();
    let pnl_by_symbol = cash_flow_by_symbol(executions);
    let mut summary = UploadSummary {
        num_executions: executions.len(),
        symbols: pnl_by_symbol.keys().cloned().collect(),
        total_pnl: pnl_by_symbol
            .values()
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v)),
        pnl_by_symbol,
        ..UploadSummary::default()
    };

    for (symbol, legs) in aggregate(executions) {
        if legs.is_empty() {
            continue;
        }
        let totals = legs.totals();
        let reconciliation = reconcile_symbol(user_id, &symbol, &totals, index, today);

        if reconciliation.is_new {
            summary.new_positions += 1;
        } else {
            summary.updated_positions += 1;
        }
        match reconciliation.position.status {
            PositionStatus::Open => summary.open_positions += 1,
            PositionStatus::Closed => summary.closed_positions += 1,
        }
        if reconciliation.outcome == Outcome::NoBuys {
            tracing::info!(symbol = %symbol, "sell-only activity, closing at sell average with zero P&L");
        }

        for trade in write_symbol(&mut batch, user_id, &legs, &reconciliation) {
            summary.trades_added += 1;
            if trade.sell_price.is_some() {
                match trade.trading_type {
                    TradingType::Day => summary.day_trades += 1,
                    TradingType::Swing => summary.swing_trades += 1,
                }
            }
        }
    }

    (batch, summary)
}
