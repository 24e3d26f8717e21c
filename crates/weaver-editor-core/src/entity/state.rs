//! Registry of entities the editor has seen.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use smol_str::{SmolStr, format_smolstr};
use weaver_content_model::WrapperHandle;

use crate::events::EntityInfo;

static ENTITY_ID_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d{1,8})$").expect("BUG: invalid ENTITY_ID_SUFFIX_RE regex literal")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEntry {
    pub id: SmolStr,
    pub entity_type: SmolStr,
    pub wrapper: WrapperHandle,
    pub is_readonly: bool,
    /// The owner asked to keep this entity's content across exports.
    pub can_persist: bool,
    /// Removed from the document. The id stays reserved so undo can bring
    /// the entity back under the same id.
    pub is_deleted: bool,
}

impl EntityEntry {
    pub fn info(&self) -> EntityInfo {
        EntityInfo {
            id: self.id.clone(),
            entity_type: self.entity_type.clone(),
            is_readonly: self.is_readonly,
            wrapper: self.wrapper,
        }
    }
}

/// Entities by id, in the order they were first seen.
#[derive(Debug, Clone, Default)]
pub struct EntityPluginState {
    entries: IndexMap<SmolStr, EntityEntry>,
}

impl EntityPluginState {
    pub fn get(&self, id: &str) -> Option<&EntityEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut EntityEntry> {
        self.entries.get_mut(id)
    }

    pub fn by_wrapper(&self, wrapper: WrapperHandle) -> Option<&EntityEntry> {
        self.entries.values().find(|e| e.wrapper == wrapper)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace by id. A replaced entry keeps its position.
    pub fn insert(&mut self, entry: EntityEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Id to use for an entity, given the id it carries.
    ///
    /// Ids already taken by a different wrapper get a numeric suffix:
    /// `base`, `base_1`, `base_2`, ... An id that already ends in `_N`
    /// continues counting from `N`. Without an id the entity type is the base.
    pub fn ensure_unique_id(&self, entity_type: &str, id: &str, wrapper: WrapperHandle) -> SmolStr {
        let (base, start) = match ENTITY_ID_SUFFIX_RE.captures(id) {
            Some(captures) => {
                let suffix = captures.get(0).map_or(0, |m| m.start());
                let num = captures[1].parse::<u32>().unwrap_or(0);
                (&id[..suffix], num)
            }
            None => (id, 0),
        };
        let base = if base.is_empty() { entity_type } else { base };

        let mut num = start;
        loop {
            let candidate = if num > 0 {
                format_smolstr!("{base}_{num}")
            } else {
                SmolStr::new(base)
            };
            match self.get(&candidate) {
                Some(entry) if entry.wrapper != wrapper => num += 1,
                _ => return candidate,
            }
        }
    }

    /// Mark entries whose wrapper is not in `present` as deleted, returning
    /// the ones that changed.
    pub fn mark_missing(&mut self, present: &[WrapperHandle]) -> Vec<EntityInfo> {
        let mut removed = Vec::new();
        for entry in self.entries.values_mut() {
            if !entry.is_deleted && !present.contains(&entry.wrapper) {
                entry.is_deleted = true;
                removed.push(entry.info());
            }
        }
        removed
    }

    /// Mark the entry owning `wrapper` deleted. Returns its info when it
    /// was live.
    pub fn mark_deleted(&mut self, wrapper: WrapperHandle) -> Option<EntityInfo> {
        let entry = self
            .entries
            .values_mut()
            .find(|e| e.wrapper == wrapper && !e.is_deleted)?;
        entry.is_deleted = true;
        Some(entry.info())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, wrapper: WrapperHandle) -> EntityEntry {
        EntityEntry {
            id: id.into(),
            entity_type: "foo".into(),
            wrapper,
            is_readonly: true,
            can_persist: false,
            is_deleted: false,
        }
    }

    #[test]
    fn test_unique_ids_count_up() {
        let mut state = EntityPluginState::default();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let wrapper = WrapperHandle::next();
            let id = state.ensure_unique_id("foo", "", wrapper);
            state.insert(entry(&id, wrapper));
            ids.push(id);
        }
        assert_eq!(ids, vec!["foo", "foo_1", "foo_2"]);
    }

    #[test]
    fn test_same_wrapper_keeps_its_id() {
        let mut state = EntityPluginState::default();
        let wrapper = WrapperHandle::next();
        state.insert(entry("foo", wrapper));
        assert_eq!(state.ensure_unique_id("foo", "foo", wrapper), "foo");
    }

    #[test]
    fn test_numbered_id_continues_from_suffix() {
        let mut state = EntityPluginState::default();
        state.insert(entry("card_3", WrapperHandle::next()));
        assert_eq!(state.ensure_unique_id("foo", "card_3", WrapperHandle::next()), "card_4");
        assert_eq!(state.ensure_unique_id("foo", "_7", WrapperHandle::next()), "foo_7");
    }

    #[test]
    fn test_replacing_an_entry_keeps_first_seen_order() {
        let mut state = EntityPluginState::default();
        let first = WrapperHandle::next();
        state.insert(entry("a", first));
        state.insert(entry("b", WrapperHandle::next()));
        let mut replaced = entry("a", first);
        replaced.can_persist = true;
        state.insert(replaced);

        let ids: Vec<&str> = state.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(state.len(), 2);
        assert!(state.get("a").is_some_and(|e| e.can_persist));
    }

    #[test]
    fn test_deleted_entries_still_reserve_ids() {
        let mut state = EntityPluginState::default();
        let wrapper = WrapperHandle::next();
        state.insert(entry("foo", wrapper));
        assert_eq!(state.mark_missing(&[]).len(), 1);
        assert!(state.mark_missing(&[]).is_empty());
        assert_eq!(state.ensure_unique_id("foo", "", WrapperHandle::next()), "foo_1");
    }
}
