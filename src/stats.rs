//! Dashboard statistics over a user's trades. Only CLOSED trades with an exit
//! price contribute to win/loss counts and realized P&L; the buy legs of a
//! closed statement position carry no exit and are counted once, as trades.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::position::PositionStatus;
use crate::types::trade::{Trade, TradingType, WinLoss};

const RECENT_WINDOW_DAYS: i64 = 30;
const WIN_COLOR: &str = "#10B981";
const LOSS_COLOR: &str = "#EF4444";
const EMPTY_COLOR: &str = "#6B7280";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_trades: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub win_rate: Decimal,
    pub total_profit_loss: Decimal,
    pub avg_profit_loss: Decimal,
    pub recent_profit_loss: Decimal,
    pub recent_trades_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradingTypeStats {
    pub total_trades: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub total_profit_loss: Decimal,
    pub win_rate: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonutChart {
    pub labels: Vec<String>,
    pub data: Vec<usize>,
    pub background_color: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineChart {
    pub labels: Vec<String>,
    pub data: Vec<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub donut_chart: DonutChart,
    pub line_chart: LineChart,
}

fn closed_only<'a>(trades: &[&'a Trade]) -> Vec<&'a Trade> {
    trades
        .iter()
        .copied()
        .filter(|t| t.status == PositionStatus::Closed && t.sell_price.is_some())
        .collect()
}

fn realized(trades: &[&Trade]) -> Decimal {
    trades
        .iter()
        .filter_map(|t| t.profit_loss())
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

fn count(trades: &[&Trade], outcome: WinLoss) -> usize {
    trades.iter().filter(|t| t.win_loss == outcome).count()
}

fn percent(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2)
}

fn of_type(trades: &[Trade], trading_type: Option<TradingType>) -> Vec<&Trade> {
    trades
        .iter()
        .filter(|t| trading_type.is_none_or(|tt| t.trading_type == tt))
        .collect()
}

pub fn dashboard_stats(
    trades: &[Trade],
    trading_type: Option<TradingType>,
    today: NaiveDate,
) -> DashboardStats {
    let all = of_type(trades, trading_type);
    if all.is_empty() {
        return DashboardStats::default();
    }
    let closed = closed_only(&all);
    let win_count = count(&closed, WinLoss::Win);
    let loss_count = count(&closed, WinLoss::Loss);
    let total = realized(&closed);
    let avg = if closed.is_empty() {
        Decimal::ZERO
    } else {
        total / Decimal::from(closed.len())
    };

    let cutoff = today - Duration::days(RECENT_WINDOW_DAYS);
    let recent: Vec<&Trade> = closed.iter().copied().filter(|t| t.date >= cutoff).collect();

    DashboardStats {
        total_trades: all.len(),
        win_count,
        loss_count,
        win_rate: percent(win_count, closed.len()),
        total_profit_loss: total.round_dp(2),
        avg_profit_loss: avg.round_dp(2),
        recent_profit_loss: realized(&recent).round_dp(2),
        recent_trades_count: recent.len(),
    }
}

pub fn chart_data(trades: &[Trade], trading_type: Option<TradingType>) -> ChartData {
    let all = of_type(trades, trading_type);
    if all.is_empty() {
        return ChartData::default();
    }
    let closed = closed_only(&all);

    let mut donut = DonutChart::default();
    for (outcome, label, color) in [
        (WinLoss::Win, "Win", WIN_COLOR),
        (WinLoss::Loss, "Loss", LOSS_COLOR),
    ] {
        let n = count(&closed, outcome);
        if n > 0 {
            donut.labels.push(label.to_string());
            donut.data.push(n);
            donut.background_color.push(color.to_string());
        }
    }
    if donut.labels.is_empty() {
        donut.labels.push("No Data".to_string());
        donut.data.push(1);
        donut.background_color.push(EMPTY_COLOR.to_string());
    }

    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for trade in &closed {
        if let Some(pl) = trade.profit_loss() {
            let day = daily.entry(trade.date).or_default();
            *day = day.saturating_add(pl);
        }
    }
    let line = LineChart {
        labels: daily.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        data: daily.values().map(|v| v.round_dp(2)).collect(),
    };

    ChartData {
        donut_chart: donut,
        line_chart: line,
    }
}

/// Counters split by trading type: `(swing, day)`.
pub fn trading_type_stats(trades: &[Trade]) -> (TradingTypeStats, TradingTypeStats) {
    let split = |tt: TradingType| {
        let all = of_type(trades, Some(tt));
        let closed = closed_only(&all);
        let win_count = count(&closed, WinLoss::Win);
        TradingTypeStats {
            total_trades: all.len(),
            win_count,
            loss_count: count(&closed, WinLoss::Loss),
            total_profit_loss: realized(&closed).round_dp(2),
            win_rate: percent(win_count, closed.len()),
        }
    };
    (split(TradingType::Swing), split(TradingType::Day))
}
