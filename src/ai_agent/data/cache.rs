use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::ai_agent::data::error::StatementError;
use crate::ai_agent::data::models::{DerivedTable, LineItem, MarkerSet};
use crate::ai_agent::tools::ratios;

/// Content key of a derivation: every label and the exact bits of every value, plus the markers.
pub fn content_key(rows: &[LineItem], markers: &MarkerSet) -> u64 {
  let mut hasher = DefaultHasher::new();
  markers.hash(&mut hasher);
  rows.len().hash(&mut hasher);
  for row in rows {
    row.label.hash(&mut hasher);
    row.prior_value.to_bits().hash(&mut hasher);
    row.current_value.to_bits().hash(&mut hasher);
  }
  hasher.finish()
}

struct CacheEntry {
  rows: Vec<LineItem>,
  markers: MarkerSet,
  table: DerivedTable,
}

/// Memoizes derived tables by content. Returns exactly what `ratios::derive` would.
pub struct DerivationCache {
  capacity: usize,
  entries: Mutex<(HashMap<u64, CacheEntry>, VecDeque<u64>)>,
}

impl DerivationCache {
  pub fn new(capacity: usize) -> Self {
    DerivationCache { capacity, entries: Mutex::new((HashMap::new(), VecDeque::new())) }
  }

  pub fn derive(&self, rows: &[LineItem], markers: &MarkerSet) -> Result<DerivedTable, StatementError> {
    if self.capacity == 0 {
      return ratios::derive(rows, markers);
    }

    let key = content_key(rows, markers);
    if let Ok(guard) = self.entries.lock() {
      if let Some(entry) = guard.0.get(&key) {
        if entry.rows.as_slice() == rows && entry.markers == *markers {
          log::info!("Returning derived table from cache.");
          return Ok(entry.table.clone());
        }
      }
    }

    let table = ratios::derive(rows, markers)?;

    match self.entries.lock() {
      Ok(mut guard) => {
        let (map, order) = &mut *guard;
        if !map.contains_key(&key) {
          order.push_back(key);
        }
        map.insert(key, CacheEntry { rows: rows.to_vec(), markers: markers.clone(), table: table.clone() });
        while order.len() > self.capacity {
          if let Some(oldest) = order.pop_front() {
            map.remove(&oldest);
          }
        }
        log::debug!("Derivation cache holds {} tables", map.len());
      }
      Err(e) => log::error!("Derivation cache lock poisoned: {}", e),
    }

    return Ok(table);
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.lock().map(|guard| guard.0.len()).unwrap_or(0)
  }
}
