use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    TradeSpecific,
    General,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::TradeSpecific => "trade_specific",
            EntryType::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "trade_specific" => Some(EntryType::TradeSpecific),
            "general" => Some(EntryType::General),
            _ => None,
        }
    }

    fn for_trade(trade_id: Option<Uuid>) -> Self {
        match trade_id {
            Some(_) => EntryType::TradeSpecific,
            None => EntryType::General,
        }
    }
}

/// Dated free-text note, optionally attached to one of the user's trades.
/// `entry_type` always follows `trade_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub notes: String,
    pub trade_id: Option<Uuid>,
    pub entry_type: EntryType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(user_id: Uuid, date: NaiveDate, notes: String, trade_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            notes,
            trade_id,
            entry_type: EntryType::for_trade(trade_id),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn link_trade(&mut self, trade_id: Option<Uuid>) {
        self.trade_id = trade_id;
        self.entry_type = EntryType::for_trade(trade_id);
    }
}
