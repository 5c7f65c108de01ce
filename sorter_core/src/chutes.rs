//! Hot-reloadable in-memory chute configuration table.

use std::collections::HashMap;

use sorter_traits::{ChuteConfig, ChuteConfigSource};

use crate::snapshot::SnapshotCell;

#[derive(Debug, Default)]
pub struct ChuteConfigTable {
    chutes: SnapshotCell<HashMap<u32, ChuteConfig>>,
}

impl ChuteConfigTable {
    pub fn new(chutes: impl IntoIterator<Item = ChuteConfig>) -> Self {
        let table = Self::default();
        table.reload(chutes);
        table
    }

    /// Replace the whole table. Later duplicates of a chute id win.
    pub fn reload(&self, chutes: impl IntoIterator<Item = ChuteConfig>) {
        let map: HashMap<u32, ChuteConfig> =
            chutes.into_iter().map(|c| (c.chute_id, c)).collect();
        tracing::debug!(chutes = map.len(), "chute table reloaded");
        self.chutes.store(map);
    }

    /// Replace a single chute entry, keeping the rest.
    pub fn upsert(&self, chute: ChuteConfig) {
        self.chutes.update(|m| {
            let mut next = m.clone();
            next.insert(chute.chute_id, chute);
            (next, ())
        });
    }

    /// Configured chute ids in ascending order.
    pub fn chute_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.chutes.load().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.chutes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChuteConfigSource for ChuteConfigTable {
    fn chute_config(&self, chute_id: u32) -> Option<ChuteConfig> {
        self.chutes.load().get(&chute_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn chute(id: u32, base: i32) -> ChuteConfig {
        ChuteConfig {
            chute_id: id,
            is_enabled: true,
            cart_number_at_head_one: base,
            max_open_duration: Duration::from_millis(400),
        }
    }

    #[test]
    fn reload_replaces_everything() {
        let t = ChuteConfigTable::new([chute(1, 90), chute(3, 80)]);
        assert_eq!(t.chute_ids(), vec![1, 3]);
        t.reload([chute(2, 5)]);
        assert!(t.chute_config(1).is_none());
        assert_eq!(t.chute_config(2).map(|c| c.cart_number_at_head_one), Some(5));
    }

    #[test]
    fn upsert_keeps_other_entries() {
        let t = ChuteConfigTable::new([chute(1, 90)]);
        t.upsert(chute(1, 91));
        t.upsert(chute(4, 7));
        assert_eq!(t.len(), 2);
        assert_eq!(t.chute_config(1).map(|c| c.cart_number_at_head_one), Some(91));
    }
}
