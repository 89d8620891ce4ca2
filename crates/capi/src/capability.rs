use std::collections::HashMap;
use std::sync::Mutex;
use vorpal_rt::Error;

/// The capability familiesrequires of a WASI-like host, modeled as a trait so
/// the execution core stays agnostic to how (or whether) they're really backed by
/// the OS (A). Every method is fallible in the same shape a WASI host call is:
/// success or a host-defined error the executor will preserve verbatim.
pub trait CapabilityHost: Send + Sync {
    fn args(&self) -> Vec<String>;
    fn env(&self) -> Vec<(String, String)>;
    fn clock_now(&self, clock_id: u32) -> Result<u64, Error>;
    fn fd_read(&self, fd: i32, len: usize) -> Result<Vec<u8>, Error>;
    fn fd_write(&self, fd: i32, data: &[u8]) -> Result<usize, Error>;
    fn fd_seek(&self, fd: i32, offset: i64, whence: u8) -> Result<u64, Error>;
    fn fd_stat(&self, fd: i32) -> Result<FileStat, Error>;
    fn dir_entries(&self, fd: i32) -> Result<Vec<String>, Error>;
    fn path_resolve(&self, fd: i32, path: &str) -> Result<String, Error>;
    fn poll(&self, fds: &[i32]) -> Result<Vec<bool>, Error>;
    fn random(&self, len: usize) -> Vec<u8>;
    fn socket_open(&self, domain: u32, socket_type: u32) -> Result<i32, Error>;
    /// The "procexit" exit channel: the host records the guest-supplied exit
    /// code so the embedder can read it back once the `Terminated` trap unwinds.
    fn proc_exit(&self, code: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStat {
    pub size: u64,
    pub is_directory: bool,
}

/// Traps every capability call with a structural "not implemented" error.
/// Appropriate for embeddings that never intend to run WASI-dependent guests —
/// registering it still satisfies the host-function import slots a module
/// declares, it just fails the moment one is actually called.
#[derive(Debug, Default)]
pub struct NullCapabilityHost;

impl CapabilityHost for NullCapabilityHost {
    fn args(&self) -> Vec<String> {
        Vec::new()
    }

    fn env(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn clock_now(&self, _clock_id: u32) -> Result<u64, Error> {
        Err(not_implemented())
    }

    fn fd_read(&self, _fd: i32, _len: usize) -> Result<Vec<u8>, Error> {
        Err(not_implemented())
    }

    fn fd_write(&self, _fd: i32, _data: &[u8]) -> Result<usize, Error> {
        Err(not_implemented())
    }

    fn fd_seek(&self, _fd: i32, _offset: i64, _whence: u8) -> Result<u64, Error> {
        Err(not_implemented())
    }

    fn fd_stat(&self, _fd: i32) -> Result<FileStat, Error> {
        Err(not_implemented())
    }

    fn dir_entries(&self, _fd: i32) -> Result<Vec<String>, Error> {
        Err(not_implemented())
    }

    fn path_resolve(&self, _fd: i32, _path: &str) -> Result<String, Error> {
        Err(not_implemented())
    }

    fn poll(&self, _fds: &[i32]) -> Result<Vec<bool>, Error> {
        Err(not_implemented())
    }

    fn random(&self, len: usize) -> Vec<u8> {
        vec![0; len]
    }

    fn socket_open(&self, _domain: u32, _socket_type: u32) -> Result<i32, Error> {
        Err(not_implemented())
    }

    fn proc_exit(&self, _code: i32) {}
}

fn not_implemented() -> Error {
    Error::structural("capability not implemented")
}

/// An in-memory, deterministic [`CapabilityHost`] for tests and the end-to-end
/// scenarios (A): file descriptors are `Vec<u8>` buffers held in a map,
/// the clock is a monotonically increasing counter rather than wall time so
/// tests stay reproducible, and `random` is a fixed xorshift stream rather than
/// real entropy.
pub struct TestCapabilityHost {
    args: Vec<String>,
    env: Vec<(String, String)>,
    fds: Mutex<HashMap<i32, Vec<u8>>>,
    clock: Mutex<u64>,
    rng_state: Mutex<u64>,
    exit_code: Mutex<Option<i32>>,
}

impl TestCapabilityHost {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            env: Vec::new(),
            fds: Mutex::new(HashMap::new()),
            clock: Mutex::new(0),
            rng_state: Mutex::new(0x2545_F491_4F6C_DD1D),
            exit_code: Mutex::new(None),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Pre-seeds a file descriptor with bytes a guest can `fd_read` back.
    pub fn seed_fd(&self, fd: i32, contents: Vec<u8>) {
        self.fds.lock().unwrap().insert(fd, contents);
    }

    /// The code the guest passed to `proc_exit`, if it has exited.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock().unwrap()
    }
}

impl Default for TestCapabilityHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityHost for TestCapabilityHost {
    fn args(&self) -> Vec<String> {
        self.args.clone()
    }

    fn env(&self) -> Vec<(String, String)> {
        self.env.clone()
    }

    fn clock_now(&self, _clock_id: u32) -> Result<u64, Error> {
        let mut clock = self.clock.lock().unwrap();
        *clock += 1;
        Ok(*clock)
    }

    fn fd_read(&self, fd: i32, len: usize) -> Result<Vec<u8>, Error> {
        let mut fds = self.fds.lock().unwrap();
        let buf = fds.entry(fd).or_default();
        let take = len.min(buf.len());
        Ok(buf.drain(..take).collect())
    }

    fn fd_write(&self, fd: i32, data: &[u8]) -> Result<usize, Error> {
        let mut fds = self.fds.lock().unwrap();
        fds.entry(fd).or_default().extend_from_slice(data);
        Ok(data.len())
    }

    fn fd_seek(&self, _fd: i32, _offset: i64, _whence: u8) -> Result<u64, Error> {
        Ok(0)
    }

    fn fd_stat(&self, fd: i32) -> Result<FileStat, Error> {
        let fds = self.fds.lock().unwrap();
        Ok(FileStat {
            size: fds.get(&fd).map(Vec::len).unwrap_or(0) as u64,
            is_directory: false,
        })
    }

    fn dir_entries(&self, _fd: i32) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }

    fn path_resolve(&self, _fd: i32, path: &str) -> Result<String, Error> {
        Ok(path.to_string())
    }

    fn poll(&self, fds: &[i32]) -> Result<Vec<bool>, Error> {
        let held = self.fds.lock().unwrap();
        Ok(fds.iter().map(|fd| held.contains_key(fd)).collect())
    }

    fn random(&self, len: usize) -> Vec<u8> {
        let mut state = self.rng_state.lock().unwrap();
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            *state ^= *state << 13;
            *state ^= *state >> 7;
            *state ^= *state << 17;
            out.extend_from_slice(&state.to_le_bytes());
        }
        out.truncate(len);
        out
    }

    fn socket_open(&self, _domain: u32, _socket_type: u32) -> Result<i32, Error> {
        Err(not_implemented())
    }

    fn proc_exit(&self, code: i32) {
        *self.exit_code.lock().unwrap() = Some(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_host_traps_fd_write_but_not_args() {
        let host = NullCapabilityHost;
        assert!(host.args().is_empty());
        assert!(host.fd_write(1, b"hi").is_err());
    }

    #[test]
    fn test_host_round_trips_fd_writes_and_reads() {
        let host = TestCapabilityHost::new();
        host.fd_write(3, b"hello").unwrap();
        let read = host.fd_read(3, 5).unwrap();
        assert_eq!(read, b"hello");
    }

    #[test]
    fn test_host_records_exit_code() {
        let host = TestCapabilityHost::new();
        assert_eq!(host.exit_code(), None);
        host.proc_exit(42);
        assert_eq!(host.exit_code(), Some(42));
    }

    #[test]
    fn random_is_deterministic_across_calls_on_a_fresh_host() {
        let a = TestCapabilityHost::new().random(16);
        let b = TestCapabilityHost::new().random(16);
        assert_eq!(a, b);
    }
}
