//! Groups normalized executions by symbol and computes per-side totals.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::types::execution::{Execution, Side};

/// One dated fill, as consumed by the reconciler and ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub date: NaiveDate,
}

impl Leg {
    pub fn notional(&self) -> Decimal {
        self.quantity.saturating_mul(self.price)
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Buy and sell legs for one symbol, each in statement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolLegs {
    pub buys: Vec<Leg>,
    pub sells: Vec<Leg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegTotals {
    pub total_buy_shares: Decimal,
    pub total_buy_cost: Decimal,
    pub earliest_buy_date: Option<NaiveDate>,
    pub total_sell_shares: Decimal,
    pub total_sell_cost: Decimal,
    pub latest_sell_date: Option<NaiveDate>,
}

impl LegTotals {
    pub fn buy_avg_price(&self) -> Decimal {
        if self.total_buy_shares.is_zero() {
            Decimal::ZERO
        } else {
            self.total_buy_cost / self.total_buy_shares
        }
    }

    pub fn sell_avg_price(&self) -> Decimal {
        if self.total_sell_shares.is_zero() {
            Decimal::ZERO
        } else {
            self.total_sell_cost / self.total_sell_shares
        }
    }

    /// Bought minus sold; positive means shares are still held.
    pub fn net_shares(&self) -> Decimal {
        self.total_buy_shares - self.total_sell_shares
    }
}

impl SymbolLegs {
    pub fn push(&mut self, leg: Leg) {
        match leg.side {
            Side::Buy => self.buys.push(leg),
            Side::Sell => self.sells.push(leg),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    pub fn totals(&self) -> LegTotals {
        LegTotals {
            total_buy_shares: saturating_sum(self.buys.iter().map(|l| l.quantity)),
            total_buy_cost: saturating_sum(self.buys.iter().map(Leg::notional)),
            earliest_buy_date: self.buys.iter().map(|l| l.date).min(),
            total_sell_shares: saturating_sum(self.sells.iter().map(|l| l.quantity)),
            total_sell_cost: saturating_sum(self.sells.iter().map(Leg::notional)),
            latest_sell_date: self.sells.iter().map(|l| l.date).max(),
        }
    }
}

/// Group executions by symbol. Executions without a usable date, or whose
/// notional does not fit a `Decimal`, are left out.
pub fn aggregate(executions: &[Execution]) -> BTreeMap<String, SymbolLegs> {
    let mut by_symbol: BTreeMap<String, SymbolLegs> = BTreeMap::new();
    for execution in executions {
        let Some(date) = execution.trade_date() else {
            tracing::warn!(
                symbol = %execution.symbol,
                exec_time = %execution.exec_time,
                "execution has no usable date, excluded from aggregation"
            );
            continue;
        };
        if execution.notional().is_none() {
            tracing::warn!(
                symbol = %execution.symbol,
                quantity = %execution.quantity,
                price = %execution.price,
                "execution notional overflows, excluded from aggregation"
            );
            continue;
        }
        by_symbol
            .entry(execution.symbol.clone())
            .or_default()
            .push(Leg {
                side: execution.side,
                quantity: execution.quantity,
                price: execution.price,
                date,
            });
    }
    by_symbol
}

/// Cash-flow view per symbol: sell notional minus buy notional, over every
/// execution regardless of date. Overflowing executions are skipped.
pub fn cash_flow_by_symbol(executions: &[Execution]) -> BTreeMap<String, Decimal> {
    let mut flows: BTreeMap<String, Decimal> = BTreeMap::new();
    for execution in executions {
        let Some(notional) = execution.notional() else {
            continue;
        };
        let entry = flows.entry(execution.symbol.clone()).or_default();
        *entry = match execution.side {
            Side::Buy => entry.saturating_sub(notional),
            Side::Sell => entry.saturating_add(notional),
        };
    }
    flows
}
