//! In-memory, indexed view of categories, command sets and access lists,
//! rebuilt wholesale from config and swapped in atomically (§4.1).
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::CatalogError;
use crate::model::{
    AccessList, AccessListMode, AccessListType, AppConfig, Category, CommandSet, FinalRuleConfig,
};

/// Immutable snapshot of the catalog. Constructed once by [`Catalog::rebuild`]
/// and never mutated afterwards; readers never take a lock.
///
/// Carries `admins`, `final_rule` and `self_id` alongside the indexed sets:
/// all three come from the same config document and must swap atomically
/// together with the rest of the catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sets_by_id: HashMap<String, CommandSet>,
    sets_by_prefix: HashMap<String, String>,
    sets_by_name_lower: HashMap<String, String>,
    sets_by_category: HashMap<String, Vec<String>>,
    public_sets: Vec<String>,
    categories_by_id: HashMap<String, Category>,
    categories_sorted: Vec<String>,
    access_lists_by_id: HashMap<String, AccessList>,
    pub admins: Vec<i64>,
    pub final_rule: FinalRuleConfig,
    pub self_id: i64,
}

impl Catalog {
    /// Build a fresh, validated snapshot from configuration. Pure function:
    /// no I/O, no reference to any previous catalog state.
    pub fn rebuild(config: &AppConfig) -> Result<Self, CatalogError> {
        let mut sets_by_id = HashMap::new();
        let mut sets_by_prefix = HashMap::new();
        let mut sets_by_name_lower = HashMap::new();
        let mut categories_by_id = HashMap::new();
        let mut access_lists_by_id = HashMap::new();

        for category in &config.categories {
            if categories_by_id.insert(category.id.clone(), category.clone()).is_some() {
                return Err(CatalogError::DuplicateCategoryId(category.id.clone()));
            }
        }

        for list in &config.access_lists {
            if access_lists_by_id.insert(list.id.clone(), list.clone()).is_some() {
                return Err(CatalogError::Validation(format!(
                    "duplicate access list id: {}",
                    list.id
                )));
            }
        }

        for set in &config.command_sets {
            if sets_by_id.contains_key(&set.id) {
                return Err(CatalogError::DuplicateSetId(set.id.clone()));
            }
            if let Some(prefix) = &set.prefix {
                if sets_by_prefix.insert(prefix.clone(), set.id.clone()).is_some() {
                    return Err(CatalogError::DuplicatePrefix(prefix.clone()));
                }
            }
            if let Some(list_id) = &set.user_access_list {
                if !access_lists_by_id.contains_key(list_id) {
                    return Err(CatalogError::NotFound(list_id.clone()));
                }
            }
            if let Some(list_id) = &set.group_access_list {
                if !access_lists_by_id.contains_key(list_id) {
                    return Err(CatalogError::NotFound(list_id.clone()));
                }
            }

            sets_by_name_lower.insert(set.name.to_lowercase(), set.id.clone());
            sets_by_id.insert(set.id.clone(), set.clone());
        }

        let mut sets_by_category: HashMap<String, Vec<String>> = HashMap::new();
        let mut public_sets = Vec::new();

        for set in sets_by_id.values() {
            if let Some(category) = &set.category {
                sets_by_category.entry(category.clone()).or_default().push(set.id.clone());
            }
            if set.is_public {
                public_sets.push(set.id.clone());
            }
        }

        for ids in sets_by_category.values_mut() {
            ids.sort_by(|a, b| {
                let set_a = &sets_by_id[a];
                let set_b = &sets_by_id[b];
                set_b.priority.cmp(&set_a.priority).then_with(|| a.cmp(b))
            });
        }
        public_sets.sort();

        let mut categories_sorted: Vec<String> = categories_by_id.keys().cloned().collect();
        categories_sorted.sort_by(|a, b| {
            categories_by_id[a]
                .order
                .cmp(&categories_by_id[b].order)
                .then_with(|| a.cmp(b))
        });

        Ok(Self {
            sets_by_id,
            sets_by_prefix,
            sets_by_name_lower,
            sets_by_category,
            public_sets,
            categories_by_id,
            categories_sorted,
            access_lists_by_id,
            admins: config.admins.clone(),
            final_rule: config.final_rule.clone(),
            self_id: config.server.self_id,
        })
    }

    pub fn set_by_id(&self, id: &str) -> Option<&CommandSet> {
        self.sets_by_id.get(id)
    }

    /// Every known command-set prefix, for the parser's longest-first match.
    pub fn known_prefixes(&self) -> Vec<String> {
        self.sets_by_prefix.keys().cloned().collect()
    }

    pub fn set_by_prefix(&self, prefix: &str) -> Option<&CommandSet> {
        self.sets_by_prefix.get(prefix).and_then(|id| self.sets_by_id.get(id))
    }

    pub fn set_by_name_lower(&self, name_lower: &str) -> Option<&CommandSet> {
        self.sets_by_name_lower
            .get(name_lower)
            .and_then(|id| self.sets_by_id.get(id))
    }

    pub fn sets_in_category(&self, category_id: &str) -> impl Iterator<Item = &CommandSet> {
        self.sets_by_category
            .get(category_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.sets_by_id.get(id))
    }

    /// All enabled sets, for scored selection.
    pub fn enabled_sets(&self) -> impl Iterator<Item = &CommandSet> {
        self.sets_by_id.values().filter(|s| s.enabled)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories_by_id.get(id)
    }

    pub fn categories_sorted(&self) -> impl Iterator<Item = &Category> {
        self.categories_sorted.iter().filter_map(move |id| self.categories_by_id.get(id))
    }

    pub fn access_list(&self, id: &str) -> Option<&AccessList> {
        self.access_lists_by_id.get(id)
    }

    pub fn set_count(&self) -> usize {
        self.sets_by_id.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories_by_id.len()
    }

    /// Resolve a category by display name, name, or id (display name match is
    /// case-insensitive), as used by `/list` and `/style select`.
    pub fn resolve_category(&self, token: &str) -> Option<&Category> {
        self.categories_by_id.get(token).or_else(|| {
            self.categories_by_id
                .values()
                .find(|c| c.display_name.eq_ignore_ascii_case(token) || c.name == token)
        })
    }

    /// Resolve a command set by display name, name, or id, as used by
    /// `/style select`.
    pub fn resolve_set(&self, token: &str) -> Option<&CommandSet> {
        self.sets_by_id.get(token).or_else(|| self.set_by_name_lower(&token.to_lowercase()))
    }
}

/// Atomically-swappable handle to the current catalog snapshot.
#[derive(Debug)]
pub struct CatalogHandle {
    inner: ArcSwap<Catalog>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: ArcSwap::from_pointee(catalog),
        }
    }

    /// Current snapshot. Cheap: an `Arc` clone, no locking.
    pub fn load(&self) -> Arc<Catalog> {
        self.inner.load_full()
    }

    /// Publish a freshly rebuilt snapshot. Readers that already hold a
    /// reference keep seeing the old one; new loads see the new one.
    pub fn swap(&self, catalog: Catalog) {
        self.inner.store(Arc::new(catalog));
    }
}

/// For every pair of access lists of the same `type` but different `mode`,
/// a non-empty item intersection is a conflict. Pure function over the
/// configured access lists, exposed for the (out-of-scope) CRUD layer.
pub fn conflicting_access_lists(lists: &[AccessList]) -> Vec<(String, String)> {
    let mut conflicts = Vec::new();
    for (i, a) in lists.iter().enumerate() {
        for b in &lists[i + 1..] {
            if a.kind == b.kind && a.mode != b.mode && lists_intersect(&a.items, &b.items) {
                conflicts.push((a.id.clone(), b.id.clone()));
            }
        }
    }
    conflicts
}

fn lists_intersect(a: &[i64], b: &[i64]) -> bool {
    a.iter().any(|item| b.contains(item))
}

#[allow(dead_code)]
fn is_whitelist(mode: AccessListMode) -> bool {
    matches!(mode, AccessListMode::Whitelist)
}

#[allow(dead_code)]
fn is_user_list(kind: AccessListType) -> bool {
    matches!(kind, AccessListType::User)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, FinalRuleConfig};

    fn set(id: &str, prefix: Option<&str>, category: Option<&str>, priority: i64, is_public: bool) -> CommandSet {
        CommandSet {
            id: id.to_string(),
            name: id.to_string(),
            prefix: prefix.map(ToString::to_string),
            category: category.map(ToString::to_string),
            description: String::new(),
            is_public,
            target_ws: "botA".to_string(),
            priority,
            strip_prefix: false,
            enabled: true,
            user_access_list: None,
            group_access_list: None,
            is_default: false,
            commands: vec![Command {
                name: "/chat".to_string(),
                aliases: vec![],
                description: String::new(),
                is_privileged: false,
                time_restriction: None,
                group_restriction: vec![],
                user_whitelist: vec![],
                user_blacklist: vec![],
            }],
        }
    }

    fn base_config() -> AppConfig {
        AppConfig {
            command_sets: vec![set("cute", Some("萌"), Some("tone"), 10, true)],
            final_rule: FinalRuleConfig::default(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn rebuild_indexes_prefix_and_name() {
        let catalog = Catalog::rebuild(&base_config()).unwrap();
        assert!(catalog.set_by_prefix("萌").is_some());
        assert!(catalog.set_by_name_lower("cute").is_some());
        assert_eq!(catalog.set_count(), 1);
    }

    #[test]
    fn rebuild_rejects_duplicate_prefix() {
        let mut config = base_config();
        config.command_sets.push(set("serious", Some("萌"), Some("tone"), 5, false));
        assert!(matches!(Catalog::rebuild(&config), Err(CatalogError::DuplicatePrefix(_))));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let config = base_config();
        let a = Catalog::rebuild(&config).unwrap();
        let b = Catalog::rebuild(&config).unwrap();
        assert_eq!(a.set_count(), b.set_count());
        assert_eq!(a.set_by_id("cute").unwrap(), b.set_by_id("cute").unwrap());
    }

    #[test]
    fn catalog_handle_swap_is_visible_to_new_loads() {
        let handle = CatalogHandle::new(Catalog::rebuild(&base_config()).unwrap());
        let before = handle.load();
        assert_eq!(before.set_count(), 1);

        let mut config = base_config();
        config.command_sets.push(set("serious", None, Some("tone"), 5, false));
        handle.swap(Catalog::rebuild(&config).unwrap());

        let after = handle.load();
        assert_eq!(after.set_count(), 2);
        assert_eq!(before.set_count(), 1, "previously loaded snapshot stays unchanged");
    }

    #[test]
    fn conflicting_access_lists_detects_symmetric_overlap() {
        let a = AccessList {
            id: "a".to_string(),
            name: "a".to_string(),
            kind: AccessListType::User,
            mode: AccessListMode::Whitelist,
            items: vec![1, 2, 3],
        };
        let b = AccessList {
            id: "b".to_string(),
            name: "b".to_string(),
            kind: AccessListType::User,
            mode: AccessListMode::Blacklist,
            items: vec![3, 4],
        };
        let conflicts = conflicting_access_lists(&[a.clone(), b.clone()]);
        assert_eq!(conflicts, vec![("a".to_string(), "b".to_string())]);

        let reordered = conflicting_access_lists(&[b, a]);
        assert_eq!(reordered.len(), 1);
    }

    #[test]
    fn conflicting_access_lists_ignores_same_mode() {
        let a = AccessList {
            id: "a".to_string(),
            name: "a".to_string(),
            kind: AccessListType::User,
            mode: AccessListMode::Whitelist,
            items: vec![1],
        };
        let b = AccessList {
            id: "b".to_string(),
            name: "b".to_string(),
            kind: AccessListType::User,
            mode: AccessListMode::Whitelist,
            items: vec![1],
        };
        assert!(conflicting_access_lists(&[a, b]).is_empty());
    }
}
