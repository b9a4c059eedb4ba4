/*
 * edcal/src/journal.rs
 *
 * Mutation journal for optimistic item updates.
 *
 * Every optimistic change is recorded against its (item, field) pair with a
 * sequence number that grows per pair. Only the entry carrying the latest
 * sequence number of a pair may settle it; resolutions of superseded entries
 * are reported as stale and change nothing.
 */

use crate::model::{Field, FieldValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationKey {
    pub item_id: u64,
    pub field: Field,
}

impl MutationKey {
    pub fn new(item_id: u64, field: Field) -> Self {
        Self { item_id, field }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Applying,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub item_id: u64,
    pub field: Field,
    pub previous_value: FieldValue,
    pub next_value: FieldValue,
    pub state: MutationState,
    pub seq: u64,
}

impl PendingMutation {
    pub fn key(&self) -> MutationKey {
        MutationKey::new(self.item_id, self.field)
    }
}

/// Outcome of settling one journal entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The latest mutation was saved; nothing to restore.
    Confirmed(PendingMutation),
    /// The latest mutation failed; `previous_value` must be restored.
    RolledBack(PendingMutation),
    /// A newer mutation was issued for the pair; this result is ignored.
    Stale {
        key: MutationKey,
        seq: u64,
        latest: u64,
    },
}

impl Resolution {
    pub fn is_stale(&self) -> bool {
        matches!(self, Resolution::Stale { .. })
    }
}

#[derive(Debug, Default)]
pub struct MutationJournal {
    pending: HashMap<MutationKey, PendingMutation>,
    latest_seq: HashMap<MutationKey, u64>,
}

impl MutationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new mutation for the pair, superseding any in-flight one.
    /// Returns its sequence number.
    pub fn record(&mut self, item_id: u64, previous: FieldValue, next: FieldValue) -> u64 {
        let key = MutationKey::new(item_id, next.field());
        let seq = self.latest_seq.entry(key).or_insert(0);
        *seq += 1;
        let seq = *seq;

        if let Some(old) = self.pending.get(&key) {
            log::debug!(
                "Mutation #{} on item {} {} supersedes #{}",
                seq,
                item_id,
                key.field,
                old.seq
            );
        }

        self.pending.insert(
            key,
            PendingMutation {
                item_id,
                field: key.field,
                previous_value: previous,
                next_value: next,
                state: MutationState::Applying,
                seq,
            },
        );
        seq
    }

    /// Settles the entry `seq` of `key`. Only the latest entry of the pair is
    /// acted on; it is removed from the journal either way.
    pub fn resolve(&mut self, key: MutationKey, seq: u64, succeeded: bool) -> Resolution {
        let latest = self.latest_seq(key);
        if seq != latest {
            return Resolution::Stale { key, seq, latest };
        }
        match self.pending.remove(&key) {
            Some(mut m) if succeeded => {
                m.state = MutationState::Confirmed;
                Resolution::Confirmed(m)
            }
            Some(mut m) => {
                m.state = MutationState::Failed;
                Resolution::RolledBack(m)
            }
            // Already settled once; a duplicate resolution is treated as stale.
            None => Resolution::Stale { key, seq, latest },
        }
    }

    pub fn latest_seq(&self, key: MutationKey) -> u64 {
        self.latest_seq.get(&key).copied().unwrap_or(0)
    }

    pub fn pending(&self, key: MutationKey) -> Option<&PendingMutation> {
        self.pending.get(&key)
    }

    pub fn is_pending(&self, item_id: u64) -> bool {
        self.pending.keys().any(|k| k.item_id == item_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMutation> {
        self.pending.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn status(s: Status) -> FieldValue {
        FieldValue::Status(s)
    }

    #[test]
    fn sequence_numbers_are_per_pair() {
        let mut j = MutationJournal::new();
        assert_eq!(j.record(1, status(Status::Draft), status(Status::Publish)), 1);
        assert_eq!(j.record(1, status(Status::Publish), status(Status::Future)), 2);
        assert_eq!(j.record(2, status(Status::Draft), status(Status::Publish)), 1);
        assert_eq!(j.len(), 2);
    }

    #[test]
    fn superseded_resolution_is_stale_and_keeps_entry() {
        let mut j = MutationJournal::new();
        let first = j.record(1, status(Status::Draft), status(Status::Publish));
        let second = j.record(1, status(Status::Publish), status(Status::Future));

        let r = j.resolve(MutationKey::new(1, Field::Status), first, false);
        assert!(r.is_stale());
        assert!(j.is_pending(1));

        match j.resolve(MutationKey::new(1, Field::Status), second, true) {
            Resolution::Confirmed(m) => {
                assert_eq!(m.state, MutationState::Confirmed);
                assert_eq!(m.next_value, status(Status::Future));
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
        assert!(j.is_empty());
    }

    #[test]
    fn failed_latest_reports_its_previous_value() {
        let mut j = MutationJournal::new();
        let seq = j.record(3, status(Status::Publish), status(Status::Draft));
        match j.resolve(MutationKey::new(3, Field::Status), seq, false) {
            Resolution::RolledBack(m) => assert_eq!(m.previous_value, status(Status::Publish)),
            other => panic!("expected rollback, got {:?}", other),
        }
        // A second resolution of the same entry changes nothing.
        assert!(j.resolve(MutationKey::new(3, Field::Status), seq, false).is_stale());
    }
}
