//! In-memory journal of positions, trades and notes, partitioned by user.
//! Hydrated from the database at startup and updated after each commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::LedgerBatch;
use crate::reconcile::PositionIndex;
use crate::types::entry::{EntryType, JournalEntry};
use crate::types::position::{Position, PositionStatus};
use crate::types::trade::{Trade, TradingType, WinLoss};

pub type SharedJournal = Arc<RwLock<Journal>>;

#[derive(Debug, Clone, Default)]
pub struct Journal {
    positions: HashMap<String, Position>,
    trades: Vec<Trade>,
    entries: Vec<JournalEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct PositionFilter {
    pub status: Option<PositionStatus>,
    /// Case-insensitive substring match.
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub trading_type: Option<TradingType>,
    pub win_loss: Option<WinLoss>,
    pub status: Option<PositionStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TradeFilter {
    fn matches(&self, trade: &Trade) -> bool {
        self.trading_type.is_none_or(|t| trade.trading_type == t)
            && self.win_loss.is_none_or(|w| trade.win_loss == w)
            && self.status.is_none_or(|s| trade.status == s)
            && self.date_from.is_none_or(|d| trade.date >= d)
            && self.date_to.is_none_or(|d| trade.date <= d)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub trade_id: Option<Uuid>,
    pub entry_type: Option<EntryType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl EntryFilter {
    fn matches(&self, entry: &JournalEntry) -> bool {
        self.trade_id.is_none_or(|id| entry.trade_id == Some(id))
            && self.entry_type.is_none_or(|t| entry.entry_type == t)
            && self.date_from.is_none_or(|d| entry.date >= d)
            && self.date_to.is_none_or(|d| entry.date <= d)
    }
}

fn open_first(status: PositionStatus) -> u8 {
    match status {
        PositionStatus::Open => 0,
        PositionStatus::Closed => 1,
    }
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedJournal {
        Arc::new(RwLock::new(self))
    }

    /// Build from rows loaded out of the database.
    pub fn from_parts(
        positions: Vec<Position>,
        trades: Vec<Trade>,
        entries: Vec<JournalEntry>,
    ) -> Self {
        Self {
            positions: positions.into_iter().map(|p| (p.id.clone(), p)).collect(),
            trades,
            entries,
        }
    }

    /// Apply a committed batch: upsert positions by id, append trades.
    pub fn apply(&mut self, batch: &LedgerBatch) {
        for position in &batch.positions {
            self.positions.insert(position.id.clone(), position.clone());
        }
        self.trades.extend(batch.trades.iter().cloned());
    }

    pub fn position_index(&self, user_id: Uuid) -> PositionIndex {
        PositionIndex::new(self.positions.values().filter(|p| p.user_id == user_id))
    }

    /// Positions for a user, OPEN first then by symbol.
    pub fn positions_for_user(&self, user_id: Uuid, filter: &PositionFilter) -> Vec<Position> {
        let needle = filter.symbol.as_ref().map(|s| s.to_uppercase());
        let mut out: Vec<Position> = self
            .positions
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| needle.as_ref().is_none_or(|n| p.symbol.contains(n.as_str())))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            open_first(a.status)
                .cmp(&open_first(b.status))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        out
    }

    pub fn position(&self, user_id: Uuid, position_id: &str) -> Option<&Position> {
        self.positions
            .get(position_id)
            .filter(|p| p.user_id == user_id)
    }

    /// Trades linked to a position, newest first.
    pub fn trades_for_position(&self, user_id: Uuid, position_id: &str) -> Vec<Trade> {
        let mut out: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| t.user_id == user_id && t.position_id.as_deref() == Some(position_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out
    }

    /// A position with its linked trades, newest first.
    pub fn position_detail(&self, user_id: Uuid, position_id: &str) -> Option<(Position, Vec<Trade>)> {
        let position = self.position(user_id, position_id)?.clone();
        Some((position, self.trades_for_position(user_id, position_id)))
    }

    /// Remove a position and every trade linked to it. Returns the number of
    /// trades removed, or `None` if the position does not belong to the user.
    pub fn remove_position(&mut self, user_id: Uuid, position_id: &str) -> Option<usize> {
        self.position(user_id, position_id)?;
        self.positions.remove(position_id);
        let (removed, kept): (Vec<Trade>, Vec<Trade>) = std::mem::take(&mut self.trades)
            .into_iter()
            .partition(|t| t.user_id == user_id && t.position_id.as_deref() == Some(position_id));
        self.trades = kept;
        for trade in &removed {
            self.unlink_entries(trade.id);
        }
        Some(removed.len())
    }

    /// Trades for a user, OPEN first then newest first.
    pub fn trades_for_user(&self, user_id: Uuid, filter: &TradeFilter) -> Vec<Trade> {
        let mut out: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| t.user_id == user_id && filter.matches(t))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            open_first(a.status)
                .cmp(&open_first(b.status))
                .then_with(|| b.date.cmp(&a.date))
        });
        out
    }

    pub fn trade(&self, user_id: Uuid, trade_id: Uuid) -> Option<&Trade> {
        self.trades
            .iter()
            .find(|t| t.id == trade_id && t.user_id == user_id)
    }

    /// Replace a stored trade with an edited copy of itself.
    pub fn replace_trade(&mut self, trade: Trade) -> Option<()> {
        let slot = self
            .trades
            .iter_mut()
            .find(|t| t.id == trade.id && t.user_id == trade.user_id)?;
        *slot = trade;
        Some(())
    }

    /// Remove a trade. Notes attached to it become general notes.
    pub fn remove_trade(&mut self, user_id: Uuid, trade_id: Uuid) -> Option<Trade> {
        let idx = self
            .trades
            .iter()
            .position(|t| t.id == trade_id && t.user_id == user_id)?;
        self.unlink_entries(trade_id);
        Some(self.trades.remove(idx))
    }

    fn unlink_entries(&mut self, trade_id: Uuid) {
        for entry in self.entries.iter_mut().filter(|e| e.trade_id == Some(trade_id)) {
            entry.link_trade(None);
        }
    }

    /// Notes for a user, newest date first.
    pub fn entries_for_user(&self, user_id: Uuid, filter: &EntryFilter) -> Vec<JournalEntry> {
        let mut out: Vec<JournalEntry> = self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && filter.matches(e))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out
    }

    pub fn entry(&self, user_id: Uuid, entry_id: Uuid) -> Option<&JournalEntry> {
        self.entries
            .iter()
            .find(|e| e.id == entry_id && e.user_id == user_id)
    }

    /// Insert a note, or overwrite the stored note with the same id.
    pub fn upsert_entry(&mut self, entry: JournalEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove_entry(&mut self, user_id: Uuid, entry_id: Uuid) -> Option<JournalEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == entry_id && e.user_id == user_id)?;
        Some(self.entries.remove(idx))
    }
}
