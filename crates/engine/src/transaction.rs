//! Transaction handles
//!
//! A [`Transaction`] batches a sequence of writes so that either all or
//! none reach the backing store. Only one may be open per connection at a
//! time; `Connection::transaction` returns `None` while one is open.
//! Dropping an unfinished handle rolls back.
//!
//! Writes made inside a transaction refresh the cache as usual, so a
//! rollback clears the cache map: the discarded writes must not survive as
//! resident entries that no longer agree with the store.

use crate::connection::Connection;
use docket_core::Result;

/// An open transaction on one connection
pub struct Transaction<'c> {
    conn: &'c Connection,
    finished: bool,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Transaction {
            conn,
            finished: false,
        }
    }

    /// Commit every write made since the transaction began
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.store().commit()
    }

    /// Discard every write made since the transaction began
    ///
    /// Also clears the cache map, restoring cache/store agreement.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.store().rollback()?;
        self.conn.evict_all();
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished && self.conn.store().in_transaction() {
            let _ = self.conn.store().rollback();
            self.conn.evict_all();
        }
    }
}
