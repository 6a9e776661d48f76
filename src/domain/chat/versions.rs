//! Sibling-version grouping over a flat message log.
//!
//! Messages are stored as an append-only sequence with a `parent_id`
//! back-reference. Consumers that need "versions of this turn" group by the
//! parent instead of walking an in-memory tree.

use std::collections::BTreeMap;

use super::Message;
use crate::domain::foundation::MessageId;

/// Messages of one window grouped by logical slot (shared parent).
#[derive(Debug, Clone, Default)]
pub struct VersionGroups<'a> {
    slots: BTreeMap<Option<MessageId>, Vec<&'a Message>>,
}

impl<'a> VersionGroups<'a> {
    /// Groups messages by `parent_id`, each slot ordered by version index.
    pub fn from_messages(messages: &'a [Message]) -> Self {
        let mut slots: BTreeMap<Option<MessageId>, Vec<&'a Message>> = BTreeMap::new();
        for message in messages {
            slots.entry(message.parent_id).or_default().push(message);
        }
        for versions in slots.values_mut() {
            versions.sort_by_key(|m| (m.version_index, m.sequence));
        }
        Self { slots }
    }

    /// All versions that answer the given parent, oldest version first.
    pub fn versions_of(&self, parent_id: Option<MessageId>) -> &[&'a Message] {
        self.slots
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Versions in the same slot as `message`, including itself.
    pub fn siblings_of(&self, message: &Message) -> &[&'a Message] {
        self.versions_of(message.parent_id)
    }

    /// The newest version in reading order for a slot.
    ///
    /// Completions can land out of submission order, so the highest
    /// `sequence` wins rather than the highest version index.
    pub fn latest_in_slot(&self, parent_id: Option<MessageId>) -> Option<&'a Message> {
        self.versions_of(parent_id)
            .iter()
            .max_by_key(|m| m.sequence)
            .copied()
    }

    /// Number of distinct slots in the window.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
