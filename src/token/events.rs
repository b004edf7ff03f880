//! Append-only token event log
//!
//! Every committed state change appends exactly one record. Sequence numbers
//! start at 0 and increase by one per record.

use crate::core::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A state change emitted by the token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenEvent {
    /// Balance moved. `from` is null on mint, `to` is null on burn.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_string")]
        amount: u128,
    },
    /// Allowance set
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "amount_string")]
        amount: u128,
    },
}

impl TokenEvent {
    /// Whether `holder` is a party to this event
    pub fn involves(&self, holder: &Address) -> bool {
        match self {
            TokenEvent::Transfer { from, to, .. } => from == holder || to == holder,
            TokenEvent::Approval { owner, spender, .. } => owner == holder || spender == holder,
        }
    }
}

/// An event together with its position in the log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TokenEvent,
}

/// Ordered, append-only record of token events
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next record will get
    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// Append an event and return its sequence number
    pub fn append(&mut self, event: TokenEvent) -> u64 {
        let sequence = self.next_sequence();
        self.records.push(EventRecord {
            sequence,
            timestamp: Utc::now(),
            event,
        });
        sequence
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn get(&self, sequence: u64) -> Option<&EventRecord> {
        usize::try_from(sequence)
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// Records with a sequence number at or after `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// The last `count` records
    pub fn latest(&self, count: usize) -> &[EventRecord] {
        let start = self.records.len().saturating_sub(count);
        &self.records[start..]
    }

    /// Records that involve `holder`
    pub fn for_holder<'a>(&'a self, holder: &'a Address) -> impl Iterator<Item = &'a EventRecord> {
        self.records.iter().filter(move |r| r.event.involves(holder))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check that sequence numbers are contiguous from 0
    pub fn is_contiguous(&self) -> bool {
        self.records
            .iter()
            .enumerate()
            .all(|(i, r)| r.sequence == i as u64)
    }
}

/// Amounts exceed the range JSON numbers carry exactly, so they are strings
pub(crate) mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
