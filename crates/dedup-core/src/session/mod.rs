/// An interactive dedup session: one scanner thread feeding one
/// [`EventCoordinator`].
///
/// Scan events arrive on a bounded queue in scanner order; commands arrive
/// on an unbounded queue and are taken first whenever both are waiting, so
/// input never waits behind a scan backlog. Messages are applied one at a
/// time and the coordinator never needs a lock. The caller drives the
/// session either frame by frame with [`Session::process_pending`] or with
/// the blocking [`Session::run`] loop.
pub mod coordinator;
pub mod snapshot;
pub mod targets;

pub use coordinator::{EventCoordinator, Notice, SessionPhase, DOUBLE_CLICK_INTERVAL};
pub use snapshot::{Progress, RowSnapshot, SessionSnapshot};
pub use targets::{hit_test, HitRegion, HitTarget};

use crate::config::DedupConfig;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::navigation::SortColumn;
use crate::scanner::{start_scan, ScanEvent, Scanner};
use crossbeam_channel::{select, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};

/// Maximum inbox messages applied per frame, so a burst of hash events
/// cannot stall rendering.
pub const MAX_MESSAGES_PER_FRAME: usize = 300;

enum Incoming {
    Message(SessionMessage),
    ScanClosed,
    CommandsClosed,
}

/// User intents, produced by the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveSelection(isize),
    EnterFolder,
    LeaveFolder,
    JumpToDuplicateSibling,
    DeleteOtherDuplicates,
    SetSort(SortColumn),
    SelectByCoordinate(HitTarget),
    Resize { width: u16, height: u16 },
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    Scan(ScanEvent),
    Command(Command),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    coordinator: EventCoordinator,
    /// Bounded: a slow session makes the scanner wait.
    scan_events: Receiver<ScanEvent>,
    /// Unbounded: queuing a command never waits on scanner backlog.
    command_rx: Receiver<Command>,
    command_tx: Sender<Command>,
    scan_handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Start scanning `fs` in the background and return immediately.
    pub fn start(fs: Arc<dyn FileSystem>, config: &DedupConfig) -> Result<Self> {
        config.validate()?;
        let (scan_tx, scan_rx) = crossbeam_channel::bounded::<ScanEvent>(config.inbox_capacity);
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let scanner = Scanner::from_config(Arc::clone(&fs), config);
        let handle = start_scan(scanner, scan_tx)?;
        info!("Session started for {}", fs.root().display());

        Ok(Self {
            coordinator: EventCoordinator::new(fs),
            scan_events: scan_rx,
            command_rx,
            command_tx,
            scan_handle: Some(handle),
        })
    }

    /// Sender for the input layer. Sending never blocks.
    pub fn commands(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    /// Queue a command from the session's own thread.
    pub fn send(&self, command: Command) {
        let _ = self.command_tx.send(command);
    }

    pub fn coordinator(&self) -> &EventCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut EventCoordinator {
        &mut self.coordinator
    }

    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.coordinator.snapshot()
    }

    /// Next queued message without blocking. Commands go first.
    fn try_next(&self) -> Option<SessionMessage> {
        if let Ok(command) = self.command_rx.try_recv() {
            return Some(SessionMessage::Command(command));
        }
        self.scan_events.try_recv().ok().map(SessionMessage::Scan)
    }

    /// Apply up to `max` queued messages without blocking.
    pub fn process_pending(&mut self, max: usize) -> Flow {
        for _ in 0..max {
            let Some(message) = self.try_next() else {
                break;
            };
            if self.coordinator.apply(message) == Flow::Quit {
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Block for the next message from either queue. Once the scanner has
    /// hung up only commands are watched.
    fn recv_next(&self, scanning: bool) -> Incoming {
        if !scanning {
            return match self.command_rx.recv() {
                Ok(command) => Incoming::Message(SessionMessage::Command(command)),
                Err(_) => Incoming::CommandsClosed,
            };
        }
        select! {
            recv(self.command_rx) -> command => match command {
                Ok(command) => Incoming::Message(SessionMessage::Command(command)),
                Err(_) => Incoming::CommandsClosed,
            },
            recv(self.scan_events) -> event => match event {
                Ok(event) => Incoming::Message(SessionMessage::Scan(event)),
                Err(_) => Incoming::ScanClosed,
            },
        }
    }

    /// Block until the scan has been fully applied. Commands that arrive in
    /// the meantime are applied too; returns [`Flow::Quit`] if one of them
    /// was `Quit`.
    pub fn wait_until_ready(&mut self) -> Flow {
        while self.coordinator.phase() != SessionPhase::Ready {
            match self.recv_next(true) {
                Incoming::Message(message) => {
                    if self.coordinator.apply(message) == Flow::Quit {
                        return Flow::Quit;
                    }
                }
                Incoming::ScanClosed => {
                    debug!("Scanner exited without completing");
                    break;
                }
                Incoming::CommandsClosed => break,
            }
        }
        self.join_scanner();
        Flow::Continue
    }

    /// Run until `Quit` or until every external command sender is gone,
    /// calling `frame` after each batch of applied messages.
    pub fn run<F>(mut self, mut frame: F) -> EventCoordinator
    where
        F: FnMut(&SessionSnapshot),
    {
        // Only external senders may keep the loop alive from here on.
        let (detached, _) = crossbeam_channel::bounded(0);
        drop(std::mem::replace(&mut self.command_tx, detached));

        let mut scanning = true;
        frame(&self.coordinator.snapshot());
        loop {
            let message = match self.recv_next(scanning) {
                Incoming::Message(message) => message,
                Incoming::ScanClosed => {
                    scanning = false;
                    continue;
                }
                Incoming::CommandsClosed => break,
            };
            if self.coordinator.apply(message) == Flow::Quit
                || self.process_pending(MAX_MESSAGES_PER_FRAME - 1) == Flow::Quit
            {
                break;
            }
            frame(&self.coordinator.snapshot());
        }
        self.join_scanner();
        self.coordinator
    }

    fn scanner_finished(&self) -> bool {
        self.scan_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    fn join_scanner(&mut self) {
        if self.scanner_finished() {
            if let Some(handle) = self.scan_handle.take() {
                let _ = handle.join();
            }
        }
    }
}
