//! In-process stand-in for a remote sys-botbase server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use super::protocol::check_span;
use super::{AbortHandle, Connector, MemoryTransport};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect,
    Read(u32, usize),
    Write(u32, Vec<u8>),
    Disconnect,
}

#[derive(Default)]
struct MockState {
    memory: HashMap<u32, u8>,
    calls: Vec<MockCall>,
    refuse_connections: bool,
    fail_reads_at: Vec<u32>,
    fail_writes_at: Vec<u32>,
    block_reads: bool,
    read_blocked: bool,
}

struct Shared {
    state: Mutex<MockState>,
    cond: Condvar,
}

/// Shared remote memory. Clones observe the same state.
#[derive(Clone)]
pub struct MockRemote {
    shared: Arc<Shared>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MockState::default()),
                cond: Condvar::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.shared.state.lock().unwrap()
    }

    pub fn with_bytes(self, offset: u32, data: &[u8]) -> Self {
        self.poke(offset, data);
        self
    }

    pub fn refuse_connections(self, refuse: bool) -> Self {
        self.state().refuse_connections = refuse;
        self
    }

    pub fn fail_read_at(self, offset: u32) -> Self {
        self.state().fail_reads_at.push(offset);
        self
    }

    pub fn fail_write_at(self, offset: u32) -> Self {
        self.state().fail_writes_at.push(offset);
        self
    }

    /// From now on, every read parks until its transport is aborted.
    pub fn block_reads(&self) {
        self.state().block_reads = true;
    }

    pub fn poke(&self, offset: u32, data: &[u8]) {
        let mut state = self.state();
        for (i, byte) in data.iter().enumerate() {
            state.memory.insert(offset + i as u32, *byte);
        }
    }

    pub fn peek(&self, offset: u32, length: usize) -> Vec<u8> {
        let state = self.state();
        (0..length)
            .map(|i| *state.memory.get(&(offset + i as u32)).unwrap_or(&0))
            .collect()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn writes(&self) -> Vec<(u32, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Write(offset, data) => Some((offset, data)),
                _ => None,
            })
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == MockCall::Connect)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Wait until some transport is parked in a blocked read.
    pub fn wait_for_blocked_read(&self) {
        let state = self.state();
        let _state = self
            .shared
            .cond
            .wait_timeout_while(state, Duration::from_secs(5), |s| !s.read_blocked)
            .unwrap();
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            remote: self.clone(),
        }
    }
}

pub struct MockConnector {
    remote: MockRemote,
}

impl Connector for MockConnector {
    fn connect(
        &self,
        host: &str,
        port: u16,
        _timeout: Duration,
    ) -> Result<Box<dyn MemoryTransport>> {
        let mut state = self.remote.state();
        let peer = format!("{}:{}", host, port);
        if state.refuse_connections {
            return Err(Error::ConnectionFailed {
                address: peer,
                message: "connection refused".to_string(),
            });
        }
        state.calls.push(MockCall::Connect);
        Ok(Box::new(MockTransport {
            remote: self.remote.clone(),
            abort: Arc::new(MockAbort {
                shared: self.remote.shared.clone(),
                aborted: AtomicBool::new(false),
            }),
            connected: true,
            peer,
        }))
    }
}

struct MockAbort {
    shared: Arc<Shared>,
    aborted: AtomicBool,
}

impl AbortHandle for MockAbort {
    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        let _guard = self.shared.state.lock().unwrap();
        self.shared.cond.notify_all();
    }
}

pub struct MockTransport {
    remote: MockRemote,
    abort: Arc<MockAbort>,
    connected: bool,
    peer: String,
}

impl MockTransport {
    fn check(&self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.abort.aborted.load(Ordering::SeqCst) {
            return Err(Error::Aborted);
        }
        Ok(())
    }
}

impl MemoryTransport for MockTransport {
    fn read_bytes(&mut self, offset: u32, length: usize) -> Result<Vec<u8>> {
        self.check()?;
        check_span(offset, length)?;
        let mut state = self.remote.state();
        state.calls.push(MockCall::Read(offset, length));

        if state.block_reads {
            state.read_blocked = true;
            self.remote.shared.cond.notify_all();
            let _state = self
                .remote
                .shared
                .cond
                .wait_while(state, |_| !self.abort.aborted.load(Ordering::SeqCst))
                .unwrap();
            return Err(Error::Aborted);
        }

        if state.fail_reads_at.contains(&offset) {
            return Err(Error::RemoteIo {
                offset,
                message: "read timed out".to_string(),
            });
        }
        drop(state);
        Ok(self.remote.peek(offset, length))
    }

    fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.check()?;
        check_span(offset, data.len())?;
        let mut state = self.remote.state();
        state.calls.push(MockCall::Write(offset, data.to_vec()));
        if state.fail_writes_at.contains(&offset) {
            return Err(Error::RemoteIo {
                offset,
                message: "broken pipe".to_string(),
            });
        }
        drop(state);
        self.remote.poke(offset, data);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.remote.state().calls.push(MockCall::Disconnect);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn abort_handle(&self) -> Arc<dyn AbortHandle> {
        self.abort.clone()
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}
