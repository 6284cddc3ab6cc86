//! Pooled response observation.
//!
//! Every instrumented request needs to know the status code and body size
//! the handler actually produced, without the handler cooperating. The
//! observer sits between handler and writer and records the first status
//! decision and the running byte count, passing everything through
//! unchanged. Observer records are recycled through a free list so the
//! steady-state request path allocates nothing for observation.

use std::io;
use std::sync::Mutex;

use crate::response::ResponseWriter;

const IMPLIED_STATUS: u16 = 200;

// ── Observer state ────────────────────────────────────────────────────────────

/// What one request's response looked like from the outside.
///
/// `written` latches on the first status-deciding event: an explicit
/// `write_status`, or a body write (which implies `200` on the wire). Once
/// latched, the recorded status never changes; only the byte count keeps
/// growing.
#[derive(Debug, Default)]
struct ObserverState {
    written: bool,
    bytes_written: u64,
    status: u16,
}

impl ObserverState {
    fn reset(&mut self) {
        self.written = false;
        self.bytes_written = 0;
        self.status = 0;
    }
}

// ── ObserverPool ──────────────────────────────────────────────────────────────

/// Free list of observer records.
///
/// `acquire` pops a record (allocating only when the list is empty), resets
/// it, and binds it to the request's writer; dropping the returned
/// [`ObservedWriter`] pushes the record back. The mutex-guarded pop is what
/// guarantees no two concurrent requests ever hold the same record.
pub(crate) struct ObserverPool {
    free: Mutex<Vec<Box<ObserverState>>>,
}

impl ObserverPool {
    pub(crate) fn new() -> Self {
        Self { free: Mutex::new(Vec::new()) }
    }

    pub(crate) fn acquire<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
    ) -> ObservedWriter<'a> {
        let mut state = self
            .free
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or_default();
        state.reset();
        ObservedWriter { pool: self, writer, state: Some(state) }
    }

    fn release(&self, state: Box<ObserverState>) {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).push(state);
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

// ── ObservedWriter ────────────────────────────────────────────────────────────

/// A `ResponseWriter` bound to the real writer for one request's lifetime.
///
/// The writer borrow ends when this guard drops, and the drop returns the
/// observation record to the pool, so a recycled record can never reach
/// into a finished request's writer.
pub(crate) struct ObservedWriter<'a> {
    pool: &'a ObserverPool,
    writer: &'a mut dyn ResponseWriter,
    state: Option<Box<ObserverState>>,
}

impl ObservedWriter<'_> {
    /// The recorded status: the first explicit write, `200` if the body was
    /// written first, `0` if the handler never wrote anything.
    pub(crate) fn status(&self) -> u16 {
        self.state().status
    }

    /// Total body bytes the handler wrote, across all writes.
    pub(crate) fn bytes_written(&self) -> u64 {
        self.state().bytes_written
    }

    fn state(&self) -> &ObserverState {
        // Present from acquire until drop.
        self.state.as_ref().expect("observer state taken before drop")
    }

    fn state_mut(&mut self) -> &mut ObserverState {
        self.state.as_mut().expect("observer state taken before drop")
    }
}

impl ResponseWriter for ObservedWriter<'_> {
    fn write_status(&mut self, status: u16) {
        let state = self.state_mut();
        if !state.written {
            state.written = true;
            state.status = status;
        }
        self.writer.write_status(status);
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        self.writer.insert_header(name, value);
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.writer.write_body(buf)?;
        let state = self.state_mut();
        if !state.written {
            state.written = true;
            state.status = IMPLIED_STATUS;
        }
        state.bytes_written += written as u64;
        Ok(written)
    }
}

impl Drop for ObservedWriter<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.pool.release(state);
        }
    }
}
