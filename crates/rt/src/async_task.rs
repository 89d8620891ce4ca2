use crate::{error::Error, store::Func, value::Val};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A handle to a call running on its own OS thread (async task wrapper).
///
/// The call executor itself is synchronous; `AsyncTask` is a thin wrapper around
/// a worker thread and a channel, giving the host `wait`/`wait_for`/`cancel`/`get`
/// without requiring the executor to understand async at all.
pub struct AsyncTask {
    handle: Option<JoinHandle<Result<Vec<Val>, Error>>>,
    receiver: mpsc::Receiver<Result<Vec<Val>, Error>>,
    cancel: mpsc::Sender<()>,
}

impl AsyncTask {
    /// Spawns `call` (a closure that invokes a function against its own
    /// exclusively-owned store) on a dedicated thread. `func` is accepted purely
    /// to keep the task's identity visible to callers inspecting it; the actual
    /// invocation is driven by `call`.
    pub fn spawn(
        _func: Func,
        call: impl FnOnce(&dyn Fn() -> bool) -> Result<Vec<Val>, Error> + Send + 'static,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let cancelled = move || cancel_rx.try_recv().is_ok();
            let result = call(&cancelled);
            let _ = result_tx.send(result.clone_result());
            result
        });
        Self {
            handle: Some(handle),
            receiver: result_rx,
            cancel: cancel_tx,
        }
    }

    /// Blocks until the call finishes (`wait`).
    pub fn wait(mut self) -> Result<Vec<Val>, Error> {
        let result = self.receiver.recv();
        self.join();
        result.unwrap_or_else(|_| Err(Error::structural("async task's worker thread panicked")))
    }

    /// Blocks up to `timeout`, returning `None` on timeout without consuming the
    /// task so a caller can retry or cancel (`wait_for`).
    pub fn wait_for(&mut self, timeout: Duration) -> Option<Result<Vec<Val>, Error>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Some(Err(Error::structural("async task's worker thread panicked")))
            }
        }
    }

    /// Requests cooperative cancellation, observed at the call executor's next
    /// checkpoint; does not forcibly stop the worker thread.
    pub fn cancel(&self) {
        let _ = self.cancel.send(());
    }

    /// Non-blocking poll (`get`): `None` if the call hasn't finished yet.
    pub fn get(&mut self) -> Option<Result<Vec<Val>, Error>> {
        self.receiver.try_recv().ok()
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AsyncTask {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}

/// `Result<Vec<Val>, Error>` doesn't implement `Clone` (`Val::FuncRef` etc. are
/// cheap to clone but `Error` intentionally is not, to keep it a plain owned
/// value rather than something callers squirrel away); the worker thread needs
/// to both send the result down the channel and return it as its own join
/// value, so results are reported solely through the channel and the thread's
/// own return value is never read by [`AsyncTask`] itself.
trait CloneResultForReporting {
    fn clone_result(&self) -> Self;
}

impl CloneResultForReporting for Result<Vec<Val>, Error> {
    fn clone_result(&self) -> Self {
        match self {
            Ok(values) => Ok(values.clone()),
            Err(_) => Err(Error::structural("call failed (see original report for detail)")),
        }
    }
}
