//! The authoritative identifier-to-object mapping.

use crate::error::RegistryError;
use crate::registry::handle::ObjectHandle;
use crate::registry::id::ObjectId;
use crate::FastIndexMap;

/// One live registration: class name, handle, registry-level refcount.
#[derive(Debug, Clone)]
struct Record {
    class_name: String,
    handle: ObjectHandle,
    refs: usize,
}

/// Maps identifiers to live objects and owns their registry refcounts.
///
/// The refcount here is additive to whatever other owners hold on the
/// object itself; dropping the record releases the registry's one share
/// and nothing more. An identifier is registered in at most one record
/// at a time.
#[derive(Debug)]
pub struct ObjectRegistry {
    records: FastIndexMap<ObjectId, Record>,
    next_id: u32,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            records: FastIndexMap::default(),
            next_id: 1,
        }
    }

    /// Register `handle` under `id`. Fails on the null id and on an id
    /// that is already taken, leaving the prior record untouched.
    pub fn register(
        &mut self,
        handle: ObjectHandle,
        class_name: &str,
        id: ObjectId,
    ) -> Result<(), RegistryError> {
        if id.is_null() {
            return Err(RegistryError::NullId);
        }
        if self.records.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.records.insert(
            id,
            Record {
                class_name: class_name.to_string(),
                handle,
                refs: 1,
            },
        );
        Ok(())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.records.contains_key(&id)
    }

    /// Look up a handle, tolerating missing ids.
    pub fn lookup(&self, id: ObjectId) -> Option<ObjectHandle> {
        self.records.get(&id).map(|record| record.handle.clone())
    }

    /// Look up a handle, treating a missing or null id as an error.
    pub fn lookup_required(&self, id: ObjectId) -> Result<ObjectHandle, RegistryError> {
        self.lookup(id).ok_or(RegistryError::NotFound(id))
    }

    /// The registered runtime class name of an object.
    pub fn class_of(&self, id: ObjectId) -> Option<&str> {
        self.records.get(&id).map(|record| record.class_name.as_str())
    }

    /// Reverse lookup by object identity. With aliases present, returns
    /// the earliest-registered identifier.
    pub fn id_of(&self, handle: &ObjectHandle) -> Option<ObjectId> {
        self.records
            .iter()
            .find(|(_, record)| record.handle.ptr_eq(handle))
            .map(|(id, _)| *id)
    }

    /// Add one registry-level reference to a record.
    pub fn add_reference(&mut self, id: ObjectId) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Release one reference; the record is removed when the count hits
    /// zero. Unknown ids return false without error.
    pub fn unregister(&mut self, id: ObjectId) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.refs -= 1;
                if record.refs == 0 {
                    self.records.shift_remove(&id);
                }
                true
            }
            None => false,
        }
    }

    /// Hand out the next unused counter identifier.
    ///
    /// Externally chosen identifiers are not tracked here; keeping them
    /// out of the counter's range is the caller's convention.
    pub fn next_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.records.keys().copied()
    }
}
