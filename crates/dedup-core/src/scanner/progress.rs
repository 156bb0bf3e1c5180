/// Events sent from the scan thread to the session, in strict order:
/// one `MetadataAvailable`, then one `Hashed` per unknown file in discovery
/// order, then `Complete`.
use crate::model::FileRecord;
use crossbeam_channel::Sender;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Every file found by the walk, with cached fingerprints filled in.
    MetadataAvailable(Vec<FileRecord>),
    /// One file has been fingerprinted. An empty hash means hashing failed.
    Hashed { path: Vec<String>, hash: String },
    /// The walk and all hashing are done and the cache has been saved.
    Complete { duration: Duration, error_count: u64 },
}

/// Destination for scan events.
///
/// Sending never blocks the scanner on a closed receiver: if nobody is
/// listening any more, events are dropped and the scan still runs to the end
/// so the cache gets saved.
pub trait ScanSink: Send {
    fn send(&self, event: ScanEvent);
}

impl ScanSink for Sender<ScanEvent> {
    fn send(&self, event: ScanEvent) {
        let _ = Sender::send(self, event);
    }
}
