//! Registry of connections, keyed by their tuple.

use std::collections::HashMap;
use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::connection::Connection;
use super::tuple::ConnectionTuple;
use crate::{SocketError, debug};

/// Process-wide map of connections.
///
/// `by_tuple` makes connections discoverable for inbound segments. It does not
/// own them: a connection releases its entry when it reaches `Closed` or is
/// dropped. `closing` owns connections that were closed by the application
/// but still have a handshake to finish.
///
/// Lock order: a connection's own lock may be held while taking either map's
/// lock, never the reverse. No connection is dropped while a map lock is
/// held.
#[derive(Default)]
pub struct ConnectionTable {
    by_tuple: RwLock<HashMap<ConnectionTuple, Weak<Connection>>>,
    closing: RwLock<HashMap<ConnectionTuple, Arc<Connection>>>,
}

impl ConnectionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` under the exact `tuple`.
    ///
    /// # Errors
    ///
    /// Returns [SocketError::AddressInUse] if a live connection already owns
    /// the tuple.
    pub fn reserve(&self, tuple: ConnectionTuple, connection: &Arc<Connection>) -> crate::Result<()> {
        let mut by_tuple = self.by_tuple.write();

        if by_tuple.get(&tuple).is_some_and(is_live) {
            debug!("[{tuple}] tuple already reserved");
            return Err(SocketError::AddressInUse.into());
        }

        by_tuple.insert(tuple, Arc::downgrade(connection));

        Ok(())
    }

    /// Registers `connection` under the first tuple of `candidates` that no
    /// live connection owns, scanning all of them under a single exclusive
    /// lock. Returns the reserved tuple, or `None` if every candidate is
    /// taken.
    pub fn reserve_first<I>(&self, candidates: I, connection: &Arc<Connection>) -> Option<ConnectionTuple>
    where
        I: IntoIterator<Item = ConnectionTuple>,
    {
        let mut by_tuple = self.by_tuple.write();

        let tuple = candidates
            .into_iter()
            .find(|tuple| !by_tuple.get(tuple).is_some_and(is_live))?;

        by_tuple.insert(tuple, Arc::downgrade(connection));

        Some(tuple)
    }

    /// Returns the connection that should receive a segment addressed to
    /// `tuple`, trying most specific first:
    ///
    /// 1. the exact tuple,
    /// 2. the local address and port with any peer,
    /// 3. any local address on the local port with any peer.
    pub fn lookup(&self, tuple: &ConnectionTuple) -> Option<Arc<Connection>> {
        let by_tuple = self.by_tuple.read();

        [*tuple, tuple.with_wildcard_peer(), tuple.any_local()]
            .iter()
            .find_map(|key| by_tuple.get(key).and_then(Weak::upgrade))
    }

    /// Returns the connection registered under exactly `tuple`.
    pub fn get(&self, tuple: &ConnectionTuple) -> Option<Arc<Connection>> {
        self.by_tuple.read().get(tuple).and_then(Weak::upgrade)
    }

    /// Removes `tuple` from the registry. Returns `true` if it was present.
    pub fn release(&self, tuple: &ConnectionTuple) -> bool {
        self.by_tuple.write().remove(tuple).is_some()
    }

    /// Removes `tuple` only if it is still registered to `connection`.
    pub(crate) fn release_owned(&self, tuple: &ConnectionTuple, connection: *const Connection) -> bool {
        let mut by_tuple = self.by_tuple.write();

        match by_tuple.get(tuple) {
            Some(entry) if ptr::eq(entry.as_ptr(), connection) => {
                by_tuple.remove(tuple);
                true
            }
            _ => false,
        }
    }

    /// Keeps `connection` alive under `tuple` until it reaches `Closed`.
    ///
    /// Returns the connection previously held under the tuple, which the
    /// caller drops once no lock is held.
    #[must_use]
    pub fn mark_closing(
        &self,
        tuple: ConnectionTuple,
        connection: Arc<Connection>,
    ) -> Option<Arc<Connection>> {
        self.closing.write().insert(tuple, connection)
    }

    /// Removes `tuple` from the closing connections.
    ///
    /// Returns the removed connection, which the caller drops once no lock is
    /// held.
    #[must_use]
    pub fn unmark_closing(&self, tuple: &ConnectionTuple) -> Option<Arc<Connection>> {
        self.closing.write().remove(tuple)
    }

    /// Removes every closing connection, returning them for the caller to
    /// drop once no lock is held.
    pub(crate) fn drain_closing(&self) -> Vec<Arc<Connection>> {
        self.closing.write().drain().map(|(_, connection)| connection).collect()
    }

    /// Returns `true` if a closing connection is held under `tuple`.
    pub fn is_closing(&self, tuple: &ConnectionTuple) -> bool {
        self.closing.read().contains_key(tuple)
    }

    /// Returns the number of live registered tuples.
    pub fn len(&self) -> usize {
        self.by_tuple.read().values().filter(|entry| is_live(entry)).count()
    }

    /// Returns `true` if no live connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of closing connections.
    pub fn closing_len(&self) -> usize {
        self.closing.read().len()
    }

    /// Returns every live connection of both maps, each once.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Connection>> {
        let mut connections: Vec<Arc<Connection>> = {
            let by_tuple = self.by_tuple.read();
            by_tuple.values().filter_map(Weak::upgrade).collect()
        };

        let closing: Vec<Arc<Connection>> = self.closing.read().values().cloned().collect();

        for connection in closing {
            if !connections.iter().any(|c| Arc::ptr_eq(c, &connection)) {
                connections.push(connection);
            }
        }

        connections
    }
}

impl fmt::Debug for ConnectionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let by_tuple: Vec<ConnectionTuple> = self.by_tuple.read().keys().copied().collect();
        let closing: Vec<ConnectionTuple> = self.closing.read().keys().copied().collect();

        f.debug_struct("ConnectionTable")
            .field("by_tuple", &by_tuple)
            .field("closing", &closing)
            .finish()
    }
}

// Checked without upgrading, so no connection can be dropped under the lock.
fn is_live(entry: &Weak<Connection>) -> bool {
    entry.strong_count() > 0
}
