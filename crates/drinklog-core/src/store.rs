use std::collections::HashSet;

use rand::Rng;

use crate::{
    error::RecordError,
    record::{DrinkRecord, RecordInput},
};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_RANDOM_LEN: usize = 5;

/// Drink records ordered newest first.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: Vec<DrinkRecord>,
}

impl RecordStore {
    pub fn from_records(records: Vec<DrinkRecord>) -> Self {
        let mut store = Self { records };
        store.sort_newest_first();
        store
    }

    pub fn add(&mut self, input: RecordInput, now_ms: i64) -> Result<DrinkRecord, RecordError> {
        input.validate()?;

        let mut rng = rand::thread_rng();
        let mut id = generate_id(now_ms, &mut rng);
        while self.get(&id).is_some() {
            id = generate_id(now_ms, &mut rng);
        }

        let record = DrinkRecord::from_input(id, now_ms, input);
        self.records.insert(0, record.clone());
        Ok(record)
    }

    pub fn update(&mut self, id: &str, input: RecordInput) -> Result<&DrinkRecord, RecordError> {
        let Some(index) = self.position(id) else {
            return Err(RecordError::NotFound(id.to_string()));
        };
        input.validate()?;

        let record = &mut self.records[index];
        record.apply(input);
        Ok(record)
    }

    pub fn remove(&mut self, id: &str) -> Result<DrinkRecord, RecordError> {
        let Some(index) = self.position(id) else {
            return Err(RecordError::NotFound(id.to_string()));
        };
        Ok(self.records.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&DrinkRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn list(&self) -> &[DrinkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Unions `incoming` into the store. The first record seen for an id wins,
    /// so existing records are never overwritten. Returns how many were added.
    pub fn import_merge(&mut self, incoming: Vec<DrinkRecord>) -> usize {
        let mut seen: HashSet<String> = self.records.iter().map(|r| r.id.clone()).collect();
        let before = self.records.len();

        for record in incoming {
            if seen.insert(record.id.clone()) {
                self.records.push(record);
            }
        }

        self.sort_newest_first();
        self.records.len() - before
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    fn sort_newest_first(&mut self) {
        self.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

/// Base-36 millisecond clock followed by random base-36 characters.
fn generate_id(now_ms: i64, rng: &mut impl Rng) -> String {
    let mut id = to_base36(now_ms.max(0) as u64);
    for _ in 0..ID_RANDOM_LEN {
        id.push(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char);
    }
    id
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ID_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, timestamp: i64) -> DrinkRecord {
        DrinkRecord::from_input(id.into(), timestamp, RecordInput::new("Tea", "A"))
    }

    #[test]
    fn add_inserts_at_front_with_unique_id() {
        let mut store = RecordStore::default();
        let first = store.add(RecordInput::new("Tea", "A"), 1_000).expect("add");
        let second = store.add(RecordInput::new("Tea", "B"), 1_000).expect("add");

        assert_ne!(first.id, second.id);
        assert_eq!(store.list()[0].id, second.id);
        assert_eq!(store.list().iter().filter(|r| r.id == second.id).count(), 1);
    }

    #[test]
    fn adds_at_increasing_timestamps_stay_sorted() {
        let mut store = RecordStore::default();
        for ts in [10, 20, 30, 40] {
            store.add(RecordInput::new("Tea", "A"), ts).expect("add");
        }
        let stamps: Vec<i64> = store.list().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![40, 30, 20, 10]);
    }

    #[test]
    fn add_rejects_missing_brand() {
        let mut store = RecordStore::default();
        let result = store.add(RecordInput::new("Tea", ""), 1);
        assert!(matches!(result, Err(RecordError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn update_unknown_id_leaves_store_unchanged() {
        let mut store = RecordStore::from_records(vec![record("a", 1)]);
        let result = store.update("missing", RecordInput::new("Coffee", "B"));

        assert!(matches!(result, Err(RecordError::NotFound(_))));
        assert_eq!(store.list(), &[record("a", 1)]);
    }

    #[test]
    fn update_keeps_position_and_timestamp() {
        let mut store = RecordStore::from_records(vec![record("a", 2), record("b", 1)]);
        store
            .update("b", RecordInput::new("Coffee", "C").with_price(3.5))
            .expect("update");

        let updated = &store.list()[1];
        assert_eq!(updated.id, "b");
        assert_eq!(updated.timestamp, 1);
        assert_eq!(updated.brand, "C");
        assert_eq!(updated.price, Some(3.5));
    }

    #[test]
    fn remove_unknown_id_is_not_found() {
        let mut store = RecordStore::from_records(vec![record("a", 1)]);
        assert!(matches!(store.remove("zzz"), Err(RecordError::NotFound(_))));
        assert_eq!(store.remove("a").expect("remove").id, "a");
        assert!(store.is_empty());
    }

    #[test]
    fn import_merge_keeps_existing_and_sorts() {
        let mut store = RecordStore::from_records(vec![record("a", 5)]);
        let mut clash = record("a", 99);
        clash.brand = "Other".into();

        let added = store.import_merge(vec![record("b", 10), clash, record("c", 1)]);

        assert_eq!(added, 2);
        let ids: Vec<&str> = store.list().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(store.get("a").map(|r| r.brand.as_str()), Some("A"));
    }

    #[test]
    fn import_merge_is_idempotent() {
        let payload = vec![record("x", 3), record("y", 7), record("x", 8)];
        let mut once = RecordStore::from_records(vec![record("a", 5)]);
        once.import_merge(payload.clone());
        let mut twice = once.clone();
        twice.import_merge(payload);

        assert_eq!(once.list(), twice.list());
    }

    #[test]
    fn from_records_sorts_newest_first() {
        let store = RecordStore::from_records(vec![record("a", 1), record("b", 3), record("c", 2)]);
        let ids: Vec<&str> = store.list().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
