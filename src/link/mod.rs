//! Link multiplexer - one open channel per connected peer
//!
//! Peer channels arrive already open (signaling happens elsewhere). Each
//! attached channel gets a reader task that forwards inbound payloads, in
//! arrival order, into the single event queue of the current subscriber.
//! There is no ordering between different peers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::LinkError;
use crate::protocol::PeerId;

/// An open bidirectional message channel to one peer
#[derive(Debug)]
pub struct PeerChannel {
    pub tx: mpsc::Sender<Bytes>,
    pub rx: mpsc::Receiver<Bytes>,
}

impl PeerChannel {
    /// Two connected in-memory endpoints
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

/// Events delivered to the subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    PeerConnected(PeerId),
    Frame { peer: PeerId, bytes: Bytes },
    PeerDisconnected(PeerId),
}

struct PeerLink {
    tx: mpsc::Sender<Bytes>,
    reader: JoinHandle<()>,
    /// Distinguishes re-attachments of the same peer id
    generation: u64,
}

/// Slot holding the current subscriber, tagged with a generation so an old
/// subscription cannot clear a newer one on drop.
#[derive(Default)]
struct ListenerSlot {
    current: Mutex<Option<(u64, mpsc::Sender<LinkEvent>)>>,
    next_generation: AtomicU64,
}

impl ListenerSlot {
    fn install(&self, tx: mpsc::Sender<LinkEvent>) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        *self.current.lock() = Some((generation, tx));
        generation
    }

    fn release(&self, generation: u64) {
        let mut current = self.current.lock();
        if matches!(*current, Some((g, _)) if g == generation) {
            *current = None;
        }
    }

    fn clear(&self) {
        *self.current.lock() = None;
    }

    async fn emit(&self, event: LinkEvent) {
        let tx = self.current.lock().as_ref().map(|(_, tx)| tx.clone());
        match tx {
            Some(tx) => {
                if tx.send(event).await.is_err() {
                    trace!("Subscriber gone, dropping link event");
                }
            }
            None => trace!("No subscriber, dropping link event"),
        }
    }
}

/// Scoped registration for inbound link events. Dropping it unregisters.
pub struct FrameSubscription {
    rx: mpsc::Receiver<LinkEvent>,
    slot: Arc<ListenerSlot>,
    generation: u64,
}

impl FrameSubscription {
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        self.slot.release(self.generation);
    }
}

/// Owns the set of open peer channels
pub struct LinkMux {
    peers: Arc<DashMap<PeerId, PeerLink>>,
    listener: Arc<ListenerSlot>,
    capacity: usize,
    closed: AtomicBool,
    next_generation: AtomicU64,
}

impl LinkMux {
    pub fn new(capacity: usize) -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
            listener: Arc::new(ListenerSlot::default()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Register for inbound events, replacing any earlier subscriber
    pub fn subscribe(&self) -> FrameSubscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let generation = self.listener.install(tx);
        FrameSubscription {
            rx,
            slot: self.listener.clone(),
            generation,
        }
    }

    /// Take ownership of an open channel. Must be called inside a tokio runtime.
    pub fn attach(&self, peer: PeerId, channel: PeerChannel) -> Result<(), LinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }

        let PeerChannel { tx, rx } = channel;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let reader = tokio::spawn(read_loop(
            peer.clone(),
            generation,
            rx,
            self.listener.clone(),
            self.peers.clone(),
        ));

        let link = PeerLink {
            tx,
            reader,
            generation,
        };
        if let Some(previous) = self.peers.insert(peer.clone(), link) {
            warn!(peer = %peer, "Replacing existing channel for peer");
            previous.reader.abort();
        }
        // A reader that already ran to completion could not remove an entry
        // that did not exist yet.
        self.peers
            .remove_if(&peer, |_, l| l.generation == generation && l.reader.is_finished());

        info!(peer = %peer, "Peer channel attached");
        Ok(())
    }

    /// Queue a payload for one peer without waiting
    pub fn send(&self, peer: &PeerId, bytes: Bytes) -> Result<(), LinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }

        let link = self
            .peers
            .get(peer)
            .ok_or_else(|| LinkError::UnknownPeer(peer.clone()))?;

        link.tx.try_send(bytes).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => LinkError::Full(peer.clone()),
            mpsc::error::TrySendError::Closed(_) => LinkError::ChannelClosed(peer.clone()),
        })
    }

    /// Queue a payload for every open peer. Returns how many accepted it.
    pub fn broadcast(&self, bytes: Bytes) -> Result<usize, LinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }

        let mut delivered = 0;
        for entry in self.peers.iter() {
            match entry.value().tx.try_send(bytes.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Snapshots supersede each other; a skipped one is harmless.
                    debug!(peer = %entry.key(), "Outbound queue full, frame skipped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(peer = %entry.key(), "Outbound channel closed");
                }
            }
        }
        Ok(delivered)
    }

    pub fn is_connected(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop all traffic and release every channel. No events are delivered
    /// after this returns.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.listener.clear();
        let peers: Vec<PeerId> = self.peers();
        for peer in peers {
            if let Some((_, link)) = self.peers.remove(&peer) {
                link.reader.abort();
                // Dropping `link.tx` closes the outbound half for the remote side.
            }
        }
        info!("Link multiplexer closed");
    }
}

impl Drop for LinkMux {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop(
    peer: PeerId,
    generation: u64,
    mut rx: mpsc::Receiver<Bytes>,
    listener: Arc<ListenerSlot>,
    peers: Arc<DashMap<PeerId, PeerLink>>,
) {
    listener.emit(LinkEvent::PeerConnected(peer.clone())).await;

    while let Some(bytes) = rx.recv().await {
        listener
            .emit(LinkEvent::Frame {
                peer: peer.clone(),
                bytes,
            })
            .await;
    }

    // Only our own entry; the peer may have been re-attached meanwhile.
    peers.remove_if(&peer, |_, link| link.generation == generation);
    info!(peer = %peer, "Peer channel closed");
    listener.emit(LinkEvent::PeerDisconnected(peer)).await;
}
