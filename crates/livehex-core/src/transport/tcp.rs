use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, trace};

use super::protocol::{self, MAX_PEEK_CHUNK, MAX_POKE_CHUNK};
use super::{AbortHandle, Connector, MemoryTransport};
use crate::error::{Error, Result};

/// Connects to sys-botbase over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Box<dyn MemoryTransport>> {
        Ok(Box::new(SysBotClient::connect(host, port, timeout)?))
    }
}

struct TcpAbort {
    stream: TcpStream,
    aborted: AtomicBool,
}

impl AbortHandle for TcpAbort {
    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        // Unblocks any read or write parked on the socket.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// sys-botbase client over a single TCP stream.
pub struct SysBotClient {
    peer: String,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    abort: Arc<TcpAbort>,
    connected: bool,
}

impl SysBotClient {
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let peer = format!("{}:{}", host, port);
        let failed = |message: String| Error::ConnectionFailed {
            address: peer.clone(),
            message,
        };

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| failed(e.to_string()))?;

        let mut last_error = "address resolved to nothing".to_string();
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        let stream = stream.ok_or_else(|| failed(last_error))?;

        let setup = |s: &TcpStream| -> std::io::Result<()> {
            s.set_read_timeout(Some(timeout))?;
            s.set_write_timeout(Some(timeout))?;
            s.set_nodelay(true)
        };
        setup(&stream).map_err(|e| failed(e.to_string()))?;

        let reader = stream.try_clone().map_err(|e| failed(e.to_string()))?;
        let abort_stream = stream.try_clone().map_err(|e| failed(e.to_string()))?;

        debug!("Connected to {}", peer);

        Ok(Self {
            peer,
            reader: BufReader::new(reader),
            writer: stream,
            abort: Arc::new(TcpAbort {
                stream: abort_stream,
                aborted: AtomicBool::new(false),
            }),
            connected: true,
        })
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected && !self.abort.aborted.load(Ordering::SeqCst) {
            Ok(())
        } else if self.connected {
            Err(Error::Aborted)
        } else {
            Err(Error::NotConnected)
        }
    }

    fn map_io(&self, offset: u32, err: std::io::Error) -> Error {
        if self.abort.aborted.load(Ordering::SeqCst) {
            Error::Aborted
        } else {
            Error::remote(offset, err)
        }
    }

    fn send(&mut self, offset: u32, command: &str) -> Result<()> {
        self.writer
            .write_all(command.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| self.map_io(offset, e))
    }

    fn peek_chunk(&mut self, offset: u32, length: usize) -> Result<Vec<u8>> {
        self.send(offset, &protocol::peek_command(offset, length))?;

        let mut line = String::with_capacity(length * 2 + 1);
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| self.map_io(offset, e))?;
        if read == 0 {
            return Err(self.map_io(
                offset,
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed"),
            ));
        }

        protocol::parse_peek_response(offset, &line, length)
    }
}

impl MemoryTransport for SysBotClient {
    fn read_bytes(&mut self, offset: u32, length: usize) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        trace!("peek 0x{:08X} {}", offset, length);

        let mut data = Vec::with_capacity(length);
        let pieces = protocol::chunks(offset, length, MAX_PEEK_CHUNK)?;
        for (chunk_offset, chunk_len) in pieces {
            data.extend(self.peek_chunk(chunk_offset, chunk_len)?);
        }
        Ok(data)
    }

    fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        trace!("poke 0x{:08X} ({} bytes)", offset, data.len());

        let pieces = protocol::chunks(offset, data.len(), MAX_POKE_CHUNK)?;
        for (chunk_offset, chunk_len) in pieces {
            let start = (chunk_offset - offset) as usize;
            let command = protocol::poke_command(chunk_offset, &data[start..start + chunk_len]);
            self.send(chunk_offset, &command)?;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        let _ = self.writer.shutdown(Shutdown::Both);
        debug!("Disconnected from {}", self.peer);
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

impl Drop for SysBotClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
