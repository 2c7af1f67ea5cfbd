//! Transaction wrapper for [`SqliteStore`].

use rusqlite::Connection;

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

impl SqliteStore {
    /// Runs a closure inside a database transaction.
    ///
    /// The transaction commits when the closure returns `Ok` and is rolled
    /// back otherwise, so every write helper applies to all beans or none.
    pub(crate) fn write_in_transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
                Ok(value)
            }
            // Rolled back on drop.
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use beanconf_core::{BeanBuilder, BeanId};

    use super::*;
    use crate::sqlite::beans::insert_beans_on_conn;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn transaction_commit() {
        let store = test_store();
        let bean = BeanBuilder::new("Pool", "p1").property("size", "1").build();

        let count = store
            .write_in_transaction(|conn| {
                insert_beans_on_conn(conn, std::slice::from_ref(&bean), "alice")?;
                Ok(1)
            })
            .unwrap();

        assert_eq!(count, 1);
        assert!(store.exists_impl(&bean.id).unwrap());
    }

    #[test]
    fn transaction_rollback_on_error() {
        let store = test_store();
        let bean = BeanBuilder::new("Pool", "p2").build();

        let result: Result<()> = store.write_in_transaction(|conn| {
            insert_beans_on_conn(conn, std::slice::from_ref(&bean), "alice")?;
            Err(StorageError::Internal("test rollback".into()))
        });

        assert!(result.is_err());
        assert!(!store.exists_impl(&BeanId::new("Pool", "p2")).unwrap());
        assert!(store.get_events_impl(&bean.id, 10).unwrap().is_empty());
    }
}
