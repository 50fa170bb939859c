//! # Identity Reconciliation Map
//!
//! Entities created on the client start with a placeholder id that the host
//! later replaces. Graph ids built from the placeholder stay in flight for a
//! while (pending edges, debounced writes), so the map remembers which live
//! control a placeholder was issued to and resolves it to that control's
//! current id.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::controls::{ConversationTreeControl, DialogNodeKey, DialogResponseKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    DialogNode(DialogNodeKey),
    DialogResponse(DialogResponseKey),
}

#[derive(Debug, Default)]
pub struct IdentityMap {
    original_ids: HashMap<String, EntityKey>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, original_id: impl Into<String>, entity: EntityKey) {
        self.original_ids.insert(original_id.into(), entity);
    }

    /// Current id of the entity first known as `id`; unknown ids and ids of
    /// removed entities resolve to themselves
    pub fn resolve<'a>(&self, id: &'a str, tree: &ConversationTreeControl) -> Cow<'a, str> {
        let current = match self.original_ids.get(id) {
            Some(EntityKey::DialogNode(key)) => tree.node(*key).map(|node| node.id().to_string()),
            Some(EntityKey::DialogResponse(key)) => {
                tree.response(*key).map(|response| response.id().to_string())
            }
            None => None,
        };
        match current {
            Some(current) => Cow::Owned(current),
            None => Cow::Borrowed(id),
        }
    }

    /// Drop every entry pointing at `entity`
    pub fn forget(&mut self, entity: EntityKey) {
        self.original_ids.retain(|_, remembered| *remembered != entity);
    }

    pub fn len(&self) -> usize {
        self.original_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original_ids.is_empty()
    }
}
