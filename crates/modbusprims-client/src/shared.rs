use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modbusprims_transport::Transport;

use crate::client::{ConnectionState, ModbusClient};
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// A client shared between threads.
///
/// Every call takes the lock for its full duration, so concurrent callers
/// are serialized onto the one connection and transaction ids are assigned
/// under the same lock.
pub struct SharedClient<T: Transport> {
    inner: Arc<Mutex<ModbusClient<T>>>,
}

impl<T: Transport> SharedClient<T> {
    pub fn new(client: ModbusClient<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub fn execute(&self, request: &Request) -> Result<Response> {
        self.lock().execute(request)
    }

    /// Run several calls back to back without another caller interleaving.
    pub fn with<R>(&self, f: impl FnOnce(&mut ModbusClient<T>) -> R) -> R {
        f(&mut *self.lock())
    }

    pub fn connect(&self) -> Result<()> {
        self.lock().connect()
    }

    pub fn close(&self) {
        self.lock().close();
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state()
    }

    // A panic inside another caller's closure leaves the client itself intact.
    fn lock(&self) -> MutexGuard<'_, ModbusClient<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> Clone for SharedClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> std::fmt::Debug for SharedClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedClient")
            .field("state", &self.state())
            .finish()
    }
}
