//! In-memory record store with optimistic, per-partition commits.

use std::collections::{
    BTreeMap,
    HashMap,
    HashSet,
};
use std::path::Path;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::RwLock;
use std::time::SystemTime;

use serde::{
    Deserialize,
    Serialize,
};

use super::{
    RecordStore,
    StoreError,
    StoreTransaction,
    check_uniqueness,
};
use crate::types::{
    DomainId,
    MessageId,
    NewRecord,
    RecordId,
    Scope,
    Side,
    SideFlags,
    TranslationRecord,
};

/// Partition key. Every engine call reads and writes exactly one partition.
type PartitionKey = (MessageId, DomainId);

#[derive(Debug, Clone, Default)]
struct Partition {
    /// Bumped on every successful write commit.
    version: u64,
    /// Keyed by id, so iteration is creation order.
    records: BTreeMap<RecordId, TranslationRecord>,
}

#[derive(Debug)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<PartitionKey, Partition>>,
    /// Store-wide, never reused.
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { partitions: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }
}

/// Serializable image of a whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub next_id: u64,
    pub records: Vec<TranslationRecord>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, ordered by id.
    pub fn all_records(&self) -> Result<Vec<TranslationRecord>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| StoreError::Poisoned)?;
        let mut records: Vec<_> =
            partitions.values().flat_map(|p| p.records.values().cloned()).collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot { next_id: self.next_id.load(Ordering::SeqCst), records: self.all_records()? })
    }

    /// Rebuilds a store from a snapshot, re-checking uniqueness per partition.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut partitions: HashMap<PartitionKey, Partition> = HashMap::new();
        let mut seen: HashSet<RecordId> = HashSet::new();
        let mut next_id = snapshot.next_id;
        for record in snapshot.records {
            if !seen.insert(record.id) {
                return Err(StoreError::InvariantViolation(format!(
                    "{} appears more than once in the snapshot",
                    record.id
                )));
            }
            let after = record.id.0.checked_add(1).ok_or_else(|| {
                StoreError::InvariantViolation(format!("{} leaves no room for new ids", record.id))
            })?;
            next_id = next_id.max(after);
            partitions
                .entry((record.message, record.domain.clone()))
                .or_default()
                .records
                .insert(record.id, record);
        }
        for partition in partitions.values() {
            check_uniqueness(partition.records.values()).map_err(StoreError::InvariantViolation)?;
        }
        tracing::debug!(partitions = partitions.len(), next_id, "Restored store from snapshot");
        Ok(Self { partitions: RwLock::new(partitions), next_id: AtomicU64::new(next_id) })
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.snapshot()?)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.to_json()?)?;
        tracing::debug!("Saved store snapshot to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        tracing::debug!("Loading store snapshot from {:?}", path);
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Ids taken by transactions that never commit are skipped.
    fn allocate_id(&self) -> RecordId {
        RecordId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl RecordStore for MemoryStore {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(
        &self,
        message: MessageId,
        domain: &DomainId,
    ) -> Result<MemoryTransaction<'_>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| StoreError::Poisoned)?;
        let partition = partitions.get(&(message, domain.clone())).cloned().unwrap_or_default();
        Ok(MemoryTransaction {
            store: self,
            message,
            domain: domain.clone(),
            base_version: partition.version,
            records: partition.records,
            dirty: false,
        })
    }

    fn records(
        &self,
        message: MessageId,
        domain: &DomainId,
    ) -> Result<Vec<TranslationRecord>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(partitions
            .get(&(message, domain.clone()))
            .map(|p| p.records.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Working copy of one partition. Writes stay local until `commit`.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    message: MessageId,
    domain: DomainId,
    /// Partition version seen by `begin`.
    base_version: u64,
    records: BTreeMap<RecordId, TranslationRecord>,
    /// Set by any write. A clean transaction commits without touching the partition.
    dirty: bool,
}

impl MemoryTransaction<'_> {
    /// # Errors
    /// [`StoreError::UnknownRecord`] if `id` is not in this partition
    fn record_mut(&mut self, id: RecordId) -> Result<&mut TranslationRecord, StoreError> {
        self.records.get_mut(&id).ok_or(StoreError::UnknownRecord(id))
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn message(&self) -> MessageId {
        self.message
    }

    fn domain(&self) -> &DomainId {
        &self.domain
    }

    fn records(&self) -> impl Iterator<Item = &TranslationRecord> {
        self.records.values()
    }

    fn get(&self, id: RecordId) -> Option<&TranslationRecord> {
        self.records.get(&id)
    }

    fn create(&mut self, record: NewRecord) -> Result<TranslationRecord, StoreError> {
        if record.message != self.message || record.domain != self.domain {
            return Err(StoreError::InvariantViolation(format!(
                "record for {} in '{}' created in partition {} / '{}'",
                record.message, record.domain, self.message, self.domain
            )));
        }
        let created = TranslationRecord {
            id: self.store.allocate_id(),
            message: record.message,
            domain: record.domain,
            translations: record.translations,
            submitter: record.submitter,
            origin: record.origin,
            created_at: SystemTime::now(),
            scope: record.scope,
            active: SideFlags::default(),
        };
        self.records.insert(created.id, created.clone());
        self.dirty = true;
        Ok(created)
    }

    fn set_active(&mut self, id: RecordId, side: Side, active: bool) -> Result<bool, StoreError> {
        let record = self.record_mut(id)?;
        if record.is_active(side) == active {
            return Ok(false);
        }
        record.active.set(side, active);
        self.dirty = true;
        Ok(true)
    }

    fn merge(
        &mut self,
        survivor: RecordId,
        superseded: RecordId,
        scope: Scope,
    ) -> Result<TranslationRecord, StoreError> {
        if survivor == superseded {
            return Err(StoreError::InvariantViolation(format!("{survivor} merged into itself")));
        }
        if !self.records.contains_key(&survivor) {
            return Err(StoreError::UnknownRecord(survivor));
        }
        let removed = self.records.remove(&superseded).ok_or(StoreError::UnknownRecord(superseded))?;
        self.dirty = true;
        let record = self.record_mut(survivor)?;
        record.active = record.active.union(removed.active);
        record.scope = scope;
        Ok(record.clone())
    }

    fn commit(self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        check_uniqueness(self.records.values()).map_err(StoreError::InvariantViolation)?;

        let mut partitions = self.store.partitions.write().map_err(|_| StoreError::Poisoned)?;
        let partition = partitions.entry((self.message, self.domain.clone())).or_default();
        if partition.version != self.base_version {
            tracing::debug!(
                message = %self.message,
                domain = %self.domain,
                base = self.base_version,
                current = partition.version,
                "Partition changed since begin"
            );
            return Err(StoreError::Conflict { message: self.message, domain: self.domain });
        }
        partition.version += 1;
        partition.records = self.records;
        Ok(())
    }
}
