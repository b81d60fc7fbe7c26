//! End-to-end tests against a loopback sys-botbase stand-in.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use livehex_core::record::pkx::{encrypt, refresh_checksum};
use livehex_core::{
    BoxCollection, Error, LinkState, LiveSyncController, RawMemoryBridge, RecordFormat,
    SlotPublisher, SlotRef, SyncConfig, TargetVersion, lookup,
};

/// Offset the server accepts a `peek` for but never answers.
const STALL_OFFSET: u32 = 0xDEAD_0000;

#[derive(Default)]
struct ServerState {
    memory: HashMap<u32, u8>,
    commands: Vec<String>,
    streams: Vec<TcpStream>,
}

struct FakeSysBot {
    port: u16,
    state: Arc<Mutex<ServerState>>,
    stalled: Arc<AtomicBool>,
}

impl FakeSysBot {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(ServerState::default()));
        let stalled = Arc::new(AtomicBool::new(false));

        let accept_state = state.clone();
        let accept_stalled = stalled.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                if let Ok(clone) = stream.try_clone() {
                    accept_state.lock().unwrap().streams.push(clone);
                }
                let state = accept_state.clone();
                let stalled = accept_stalled.clone();
                thread::spawn(move || serve(stream, state, stalled));
            }
        });

        Self {
            port,
            state,
            stalled,
        }
    }

    fn poke(&self, offset: u32, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for (i, byte) in data.iter().enumerate() {
            state.memory.insert(offset + i as u32, *byte);
        }
    }

    fn peek(&self, offset: u32, length: usize) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        (0..length)
            .map(|i| *state.memory.get(&(offset + i as u32)).unwrap_or(&0))
            .collect()
    }

    fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    fn clear_commands(&self) {
        self.state.lock().unwrap().commands.clear();
    }

    fn drop_all_connections(&self) {
        for stream in self.state.lock().unwrap().streams.drain(..) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn wait_until_stalled(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.stalled.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn serve(stream: TcpStream, state: Arc<Mutex<ServerState>>, stalled: Arc<AtomicBool>) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        state.lock().unwrap().commands.push(line.clone());

        match parts.as_slice() {
            ["peek", offset, length] => {
                let offset = u32::from_str_radix(offset.trim_start_matches("0x"), 16).unwrap();
                let length: usize = length.parse().unwrap();
                if offset == STALL_OFFSET {
                    stalled.store(true, Ordering::SeqCst);
                    continue;
                }
                let reply: String = {
                    let state = state.lock().unwrap();
                    (0..length)
                        .map(|i| {
                            format!("{:02X}", state.memory.get(&(offset + i as u32)).unwrap_or(&0))
                        })
                        .collect()
                };
                if writer.write_all(format!("{}\n", reply).as_bytes()).is_err() {
                    break;
                }
            }
            ["poke", offset, data] => {
                let offset = u32::from_str_radix(offset.trim_start_matches("0x"), 16).unwrap();
                let hex = data.trim_start_matches("0x");
                let mut state = state.lock().unwrap();
                for i in 0..hex.len() / 2 {
                    let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).unwrap();
                    state.memory.insert(offset + i as u32, byte);
                }
            }
            _ => {}
        }
    }
}

fn record(ec: u32, species: u16) -> Vec<u8> {
    let format = RecordFormat::Pk8;
    let mut data = vec![0u8; format.party_size()];
    data[0..4].copy_from_slice(&ec.to_le_bytes());
    data[8..10].copy_from_slice(&species.to_le_bytes());
    data[0x20] = 0x42;
    refresh_checksum(&mut data, format);
    encrypt(&data, format).unwrap()
}

fn slot_address(version: TargetVersion, box_index: u8, slot: u8) -> u32 {
    lookup(version).slot_address(box_index, slot).unwrap()
}

fn controller_for(server: &FakeSysBot) -> (Arc<BoxCollection>, Arc<LiveSyncController>) {
    let config = SyncConfig::builder()
        .host("127.0.0.1")
        .port(server.port)
        .timeout(Duration::from_secs(5))
        .build();
    let collection = Arc::new(BoxCollection::new(RecordFormat::Pk8, 32, 30));
    let controller = LiveSyncController::new(config, collection.clone());
    (collection, Arc::new(controller))
}

#[test]
fn test_probe_over_tcp_picks_matching_layout() {
    let server = FakeSysBot::start();
    // Only the 1.2.x layout has a record at box 1 slot 1.
    let first = record(0x1234_5678, 25);
    server.poke(slot_address(TargetVersion::SwshRigel1, 0, 0), &first);
    let (collection, controller) = controller_for(&server);

    let version = controller.connect(None).unwrap();

    assert_eq!(version, TargetVersion::SwshRigel1);
    assert!(controller.status().validated);
    assert_eq!(collection.slot_data(SlotRef::new(0, 0)), Some(first));

    let commands = server.commands();
    assert_eq!(
        commands[0],
        format!(
            "peek 0x{:08X} 344",
            slot_address(TargetVersion::SwshRigel2, 0, 0)
        )
    );
}

#[test]
fn test_slot_write_reaches_remote_memory() {
    let server = FakeSysBot::start();
    server.poke(
        slot_address(TargetVersion::SwshRigel2, 0, 0),
        &record(0x0101_0101, 1),
    );
    let (_collection, controller) = controller_for(&server);
    controller.connect(None).unwrap();

    let data = record(0xFEED_BEEF, 812);
    controller.write_active_slot(5, 17, &data).unwrap();
    let back = controller.read_active_slot(5, 17).unwrap();

    assert_eq!(back, data);
    assert_eq!(
        server.peek(slot_address(TargetVersion::SwshRigel2, 5, 17), 344),
        data
    );
}

#[test]
fn test_large_requests_are_chunked() {
    let server = FakeSysBot::start();
    server.poke(
        slot_address(TargetVersion::SwshRigel2, 0, 0),
        &record(0x0101_0101, 1),
    );
    let (_collection, controller) = controller_for(&server);
    controller.connect(None).unwrap();
    server.clear_commands();

    let payload: Vec<u8> = (0..0x400u32).map(|i| i as u8).collect();
    controller.write_ram(0x1000_0000, &payload).unwrap();
    let back = controller.read_ram(0x1000_0000, 0x2100).unwrap();

    assert_eq!(&back[..0x400], &payload[..]);
    let commands = server.commands();
    let pokes: Vec<_> = commands.iter().filter(|c| c.starts_with("poke")).collect();
    let peeks: Vec<_> = commands.iter().filter(|c| c.starts_with("peek")).collect();
    assert_eq!(pokes.len(), 3);
    assert!(pokes[1].starts_with("poke 0x100001C0 0x"));
    assert_eq!(peeks, ["peek 0x10000000 8192", "peek 0x10002000 256"]);
}

#[test]
fn test_bridge_over_tcp() {
    let server = FakeSysBot::start();
    server.poke(
        slot_address(TargetVersion::SwshRigel2, 0, 0),
        &record(0x0101_0101, 1),
    );
    server.poke(0x2000_0000, &record(0x5555_AAAA, 150));
    let (_collection, controller) = controller_for(&server);
    controller.connect(None).unwrap();
    let bridge = RawMemoryBridge::new(controller);

    bridge.write_ram_text("0x30000000", "00112233").unwrap();

    assert_eq!(
        bridge.read_ram_text("30000000", "4").unwrap(),
        vec![0x00, 0x11, 0x22, 0x33]
    );
    assert!(bridge.load_record_at_text("0x20000000").unwrap().is_some());
    assert!(bridge.load_record_at_text("0x30000000").unwrap().is_none());
}

#[test]
fn test_dropped_socket_disconnects() {
    let server = FakeSysBot::start();
    server.poke(
        slot_address(TargetVersion::SwshRigel2, 0, 0),
        &record(0x0101_0101, 1),
    );
    let (_collection, controller) = controller_for(&server);
    controller.connect(None).unwrap();

    server.drop_all_connections();
    let err = controller.read_box(2).unwrap_err();

    assert!(err.is_io(), "{err:?}");
    assert_eq!(controller.state(), LinkState::Disconnected);
    assert!(matches!(controller.read_box(2), Err(Error::NotConnected)));
}

#[test]
fn test_disconnect_interrupts_stalled_read() {
    let server = FakeSysBot::start();
    server.poke(
        slot_address(TargetVersion::SwshRigel2, 0, 0),
        &record(0x0101_0101, 1),
    );
    let (_collection, controller) = controller_for(&server);
    controller.connect(None).unwrap();

    let reader = {
        let controller = controller.clone();
        thread::spawn(move || {
            let started = Instant::now();
            (controller.read_ram(STALL_OFFSET, 4), started.elapsed())
        })
    };
    server.wait_until_stalled();
    controller.disconnect();

    let (result, elapsed) = reader.join().unwrap();
    assert!(result.unwrap_err().is_io());
    assert!(elapsed < Duration::from_secs(5));
    assert_eq!(controller.state(), LinkState::Disconnected);
}
