//! # Loopback Transport
//!
//! In-process transport used by tests and the simulation binary. Every
//! endpoint has its own event channel; a shared hub tracks which endpoints are
//! linked.
//!
//! Dialing links both ends at once and queues `Incoming` + `Open` on the
//! callee and `Open` on the caller. Closing notifies both ends, and events
//! still queued for a link that has since closed are discarded on poll.

use super::{IceState, PeerTransport, TransportEvent, TransportStats};
use crate::error::TransportError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use saberlink_shared::PeerId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
struct Endpoint {
    events: Sender<TransportEvent>,
    links: BTreeSet<PeerId>,
}

#[derive(Debug, Default)]
struct Hub {
    endpoints: BTreeMap<PeerId, Endpoint>,
    /// Endpoints whose incoming dials never complete.
    held: BTreeSet<PeerId>,
}

impl Hub {
    fn deliver(&self, to: &PeerId, event: TransportEvent) {
        if let Some(endpoint) = self.endpoints.get(to) {
            // Receiver lives as long as the endpoint entry
            let _ = endpoint.events.send(event);
        }
    }

    fn is_linked(&self, a: &PeerId, b: &PeerId) -> bool {
        self.endpoints.get(a).is_some_and(|e| e.links.contains(b))
    }

    fn link(&mut self, a: &PeerId, b: &PeerId) {
        if let Some(e) = self.endpoints.get_mut(a) {
            e.links.insert(b.clone());
        }
        if let Some(e) = self.endpoints.get_mut(b) {
            e.links.insert(a.clone());
        }
    }

    fn unlink(&mut self, a: &PeerId, b: &PeerId) -> bool {
        let removed = self
            .endpoints
            .get_mut(a)
            .is_some_and(|e| e.links.remove(b));
        if let Some(e) = self.endpoints.get_mut(b) {
            e.links.remove(a);
        }
        removed
    }
}

/// Shared in-process network. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct LoopbackNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl LoopbackNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an endpoint with a random UUID v4 identity.
    #[must_use]
    pub fn endpoint(&self) -> LoopbackTransport {
        loop {
            if let Ok(endpoint) = self.endpoint_with_id(Uuid::new_v4().to_string()) {
                return endpoint;
            }
        }
    }

    /// Adds an endpoint with a fixed identity.
    ///
    /// # Errors
    ///
    /// The identity is already in use on this network.
    pub fn endpoint_with_id(&self, id: impl Into<PeerId>) -> Result<LoopbackTransport, TransportError> {
        let id = id.into();
        let mut hub = self.hub.lock();
        if hub.endpoints.contains_key(&id) {
            return Err(TransportError::IdTaken(id));
        }

        let (tx, rx) = unbounded();
        let _ = tx.send(TransportEvent::IdAssigned(id.clone()));
        hub.endpoints.insert(
            id.clone(),
            Endpoint {
                events: tx,
                links: BTreeSet::new(),
            },
        );
        tracing::debug!(peer = %id, "loopback endpoint created");

        Ok(LoopbackTransport {
            id,
            announced: false,
            events: rx,
            hub: Arc::clone(&self.hub),
            stats: TransportStats::default(),
        })
    }

    /// Makes every future dial to `id` hang without ever opening.
    pub fn hold_dials_to(&self, id: &PeerId) {
        self.hub.lock().held.insert(id.clone());
    }

    /// Lets dials to `id` complete again. Dials that were already held stay
    /// hung.
    pub fn release_dials_to(&self, id: &PeerId) {
        self.hub.lock().held.remove(id);
    }

    /// Number of live endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hub.lock().endpoints.len()
    }

    /// True when no endpoint is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two endpoints are linked.
    #[must_use]
    pub fn is_linked(&self, a: &PeerId, b: &PeerId) -> bool {
        self.hub.lock().is_linked(a, b)
    }
}

/// One endpoint of a [`LoopbackNetwork`].
///
/// Dropping it closes every link it holds.
#[derive(Debug)]
pub struct LoopbackTransport {
    id: PeerId,
    /// Set once `IdAssigned` has been polled.
    announced: bool,
    events: Receiver<TransportEvent>,
    hub: Arc<Mutex<Hub>>,
    stats: TransportStats,
}

impl PeerTransport for LoopbackTransport {
    fn local_id(&self) -> Option<&PeerId> {
        self.announced.then_some(&self.id)
    }

    fn connect(&mut self, peer: &PeerId) -> Result<(), TransportError> {
        if *peer == self.id {
            return Err(TransportError::PeerUnavailable(peer.clone()));
        }
        let mut hub = self.hub.lock();
        self.stats.dials += 1;

        if hub.is_linked(&self.id, peer) {
            return Ok(());
        }
        if !hub.endpoints.contains_key(peer) {
            hub.deliver(
                &self.id,
                TransportEvent::Error(peer.clone(), TransportError::PeerUnavailable(peer.clone())),
            );
            return Ok(());
        }
        if hub.held.contains(peer) {
            tracing::trace!(from = %self.id, to = %peer, "dial held");
            return Ok(());
        }

        hub.link(&self.id, peer);
        hub.deliver(peer, TransportEvent::Incoming(self.id.clone()));
        hub.deliver(peer, TransportEvent::Open(self.id.clone()));
        hub.deliver(&self.id, TransportEvent::IceStateChanged(peer.clone(), IceState::Connected));
        hub.deliver(&self.id, TransportEvent::Open(peer.clone()));
        Ok(())
    }

    fn send(&mut self, peer: &PeerId, payload: &[u8]) -> Result<(), TransportError> {
        let hub = self.hub.lock();
        if !hub.is_linked(&self.id, peer) {
            self.stats.send_errors += 1;
            return Err(TransportError::NotConnected(peer.clone()));
        }
        hub.deliver(peer, TransportEvent::Data(self.id.clone(), payload.to_vec()));
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;
        Ok(())
    }

    fn close(&mut self, peer: &PeerId) {
        let mut hub = self.hub.lock();
        if hub.unlink(&self.id, peer) {
            hub.deliver(&self.id, TransportEvent::Close(peer.clone()));
            hub.deliver(peer, TransportEvent::Close(self.id.clone()));
        }
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        loop {
            let event = self.events.try_recv().ok()?;
            match &event {
                TransportEvent::IdAssigned(_) => self.announced = true,
                TransportEvent::Open(peer) | TransportEvent::Data(peer, _)
                    if !self.hub.lock().is_linked(&self.id, peer) =>
                {
                    continue;
                }
                TransportEvent::Data(_, payload) => {
                    self.stats.messages_received += 1;
                    self.stats.bytes_received += payload.len() as u64;
                }
                _ => {}
            }
            return Some(event);
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        let mut hub = self.hub.lock();
        let Some(endpoint) = hub.endpoints.remove(&self.id) else {
            return;
        };
        for peer in &endpoint.links {
            if let Some(other) = hub.endpoints.get_mut(peer) {
                other.links.remove(&self.id);
            }
            hub.deliver(peer, TransportEvent::Close(self.id.clone()));
        }
        hub.held.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(t: &mut LoopbackTransport) -> Vec<TransportEvent> {
        std::iter::from_fn(|| t.poll_event()).collect()
    }

    fn id(s: &str) -> PeerId {
        PeerId::new(s)
    }

    #[test]
    fn test_identity_is_announced_on_first_poll() {
        let net = LoopbackNetwork::new();
        let mut a = net.endpoint();
        assert!(a.local_id().is_none());

        let events = drain(&mut a);
        assert!(matches!(events.as_slice(), [TransportEvent::IdAssigned(_)]));
        assert!(a.local_id().is_some());
        assert_eq!(a.local_id().map(PeerId::as_str).map(str::len), Some(36));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let net = LoopbackNetwork::new();
        let _a = net.endpoint_with_id("a").unwrap();
        assert_eq!(net.endpoint_with_id("a").unwrap_err(), TransportError::IdTaken(id("a")));
    }

    #[test]
    fn test_connect_opens_both_ends() {
        let net = LoopbackNetwork::new();
        let mut a = net.endpoint_with_id("a").unwrap();
        let mut b = net.endpoint_with_id("b").unwrap();
        drain(&mut a);
        drain(&mut b);

        a.connect(&id("b")).unwrap();

        assert_eq!(
            drain(&mut a),
            vec![
                TransportEvent::IceStateChanged(id("b"), IceState::Connected),
                TransportEvent::Open(id("b")),
            ]
        );
        assert_eq!(
            drain(&mut b),
            vec![TransportEvent::Incoming(id("a")), TransportEvent::Open(id("a"))]
        );

        a.send(&id("b"), b"hello").unwrap();
        assert_eq!(drain(&mut b), vec![TransportEvent::Data(id("a"), b"hello".to_vec())]);
        assert_eq!(b.stats().bytes_received, 5);
    }

    #[test]
    fn test_unknown_peer_reports_error_event() {
        let net = LoopbackNetwork::new();
        let mut a = net.endpoint_with_id("a").unwrap();
        drain(&mut a);

        a.connect(&id("ghost")).unwrap();
        assert_eq!(
            drain(&mut a),
            vec![TransportEvent::Error(id("ghost"), TransportError::PeerUnavailable(id("ghost")))]
        );
        assert!(a.send(&id("ghost"), b"x").is_err());
    }

    #[test]
    fn test_close_notifies_both_and_discards_stale_events() {
        let net = LoopbackNetwork::new();
        let mut a = net.endpoint_with_id("a").unwrap();
        let mut b = net.endpoint_with_id("b").unwrap();
        drain(&mut a);
        drain(&mut b);

        a.connect(&id("b")).unwrap();
        // b refuses before ever polling the open
        b.close(&id("a"));

        assert_eq!(drain(&mut b), vec![TransportEvent::Incoming(id("a")), TransportEvent::Close(id("a"))]);
        let events = drain(&mut a);
        assert_eq!(events.last(), Some(&TransportEvent::Close(id("b"))));
        assert!(!events.contains(&TransportEvent::Open(id("b"))));
    }

    #[test]
    fn test_drop_closes_links() {
        let net = LoopbackNetwork::new();
        let mut a = net.endpoint_with_id("a").unwrap();
        let b = net.endpoint_with_id("b").unwrap();
        a.connect(&id("b")).unwrap();
        drain(&mut a);

        drop(b);
        assert_eq!(drain(&mut a), vec![TransportEvent::Close(id("b"))]);
        assert_eq!(net.len(), 1);
    }

    #[test]
    fn test_held_dial_never_opens() {
        let net = LoopbackNetwork::new();
        let mut a = net.endpoint_with_id("a").unwrap();
        let mut b = net.endpoint_with_id("b").unwrap();
        drain(&mut a);
        drain(&mut b);
        net.hold_dials_to(&id("b"));

        a.connect(&id("b")).unwrap();
        assert!(drain(&mut a).is_empty());
        assert!(drain(&mut b).is_empty());
        assert!(!net.is_linked(&id("a"), &id("b")));
    }
}
