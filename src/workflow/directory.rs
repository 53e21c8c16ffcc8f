use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::store::{StoreError, StoreTx};

/// Department → active manager ids, cached per department.
///
/// Entries expire after the configured TTL; the identity service calls
/// [`DirectoryCache::invalidate_department`] when it reassigns managers.
pub struct DirectoryCache {
    managers: Cache<u64, Arc<Vec<u64>>>,
}

impl DirectoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            managers: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn managers_of<T: StoreTx>(
        &self,
        tx: &mut T,
        department_id: u64,
    ) -> Result<Arc<Vec<u64>>, StoreError> {
        if let Some(managers) = self.managers.get(&department_id).await {
            return Ok(managers);
        }
        let managers = Arc::new(tx.department_managers(department_id).await?);
        self.managers.insert(department_id, managers.clone()).await;
        Ok(managers)
    }

    /// Union of the managers of every department the user belongs to,
    /// without the user themself.
    pub async fn approvers_for<T: StoreTx>(
        &self,
        tx: &mut T,
        user_id: u64,
    ) -> Result<Vec<u64>, StoreError> {
        let mut approvers = BTreeSet::new();
        for department_id in tx.departments_of(user_id).await? {
            approvers.extend(self.managers_of(tx, department_id).await?.iter().copied());
        }
        approvers.remove(&user_id);
        Ok(approvers.into_iter().collect())
    }

    pub async fn invalidate_department(&self, department_id: u64) {
        self.managers.invalidate(&department_id).await;
    }
}
