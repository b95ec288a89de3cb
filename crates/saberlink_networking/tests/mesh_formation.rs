//! # Mesh Formation Integration Tests
//!
//! Several peers on one loopback network, polled round-robin the way a set
//! of browsers would each run their own frame loop.

use saberlink_networking::{
    LoopbackNetwork, LoopbackTransport, MeshConfig, MeshEvent, MeshProtocol, SessionState,
};
use saberlink_shared::{Mat4, PeerId, PlayerState, Vec3};

type Mesh = MeshProtocol<LoopbackTransport>;

fn id(s: &str) -> PeerId {
    PeerId::new(s)
}

fn spawn(net: &LoopbackNetwork, name: &str) -> Mesh {
    let mut mesh = MeshProtocol::new(
        net.endpoint_with_id(name).expect("unique id"),
        MeshConfig::default(),
    );
    mesh.poll(0.0);
    mesh
}

/// Polls every mesh until a full round produces no events. Returns the
/// events each mesh reported, in order.
fn settle(meshes: &mut [&mut Mesh]) -> Vec<Vec<MeshEvent>> {
    let mut seen = vec![Vec::new(); meshes.len()];
    for _ in 0..32 {
        let mut quiet = true;
        for (mesh, log) in meshes.iter_mut().zip(seen.iter_mut()) {
            let events = mesh.poll(1.0 / 60.0);
            quiet &= events.is_empty();
            log.extend(events);
        }
        if quiet {
            return seen;
        }
    }
    panic!("mesh never went quiet");
}

#[test]
fn test_pair_forms_with_empty_gossip() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");

    assert!(p1.connect(&id("p2")).expect("dial"));
    let events = settle(&mut [&mut p1, &mut p2]);

    assert!(events[0].contains(&MeshEvent::PeerJoined(id("p2"))));
    assert!(events[1].contains(&MeshEvent::PeerJoined(id("p1"))));
    assert_eq!(p1.members(), vec![id("p2")]);
    assert_eq!(p2.members(), vec![id("p1")]);
    assert_eq!(p1.readiness().get(&id("p2")), Some(&false));
    assert_eq!(p1.stats().decode_failures, 0);
    // An empty member list must not make the accepting side dial back.
    assert_eq!(p1.transport_stats().dials, 1);
    assert_eq!(p2.transport_stats().dials, 0);
}

#[test]
fn test_third_peer_is_introduced_by_gossip() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");
    let mut p3 = spawn(&net, "p3");

    p1.connect(&id("p2")).expect("dial");
    settle(&mut [&mut p1, &mut p2, &mut p3]);

    // p3 only knows p1
    p3.connect(&id("p1")).expect("dial");
    settle(&mut [&mut p1, &mut p2, &mut p3]);

    assert_eq!(p1.members(), vec![id("p2"), id("p3")]);
    assert_eq!(p2.members(), vec![id("p1"), id("p3")]);
    assert_eq!(p3.members(), vec![id("p1"), id("p2")]);
    assert!(net.is_linked(&id("p2"), &id("p3")));
    for mesh in [&p1, &p2, &p3] {
        assert_eq!(mesh.state(), SessionState::Connected);
    }
    // One dial per link: p3 reaches p2 through gossip and nobody re-dials
    // a peer it is already linked to.
    assert_eq!(p1.transport_stats().dials, 1);
    assert_eq!(p2.transport_stats().dials, 0);
    assert_eq!(p3.transport_stats().dials, 2);
}

#[test]
fn test_late_joiner_learns_existing_readiness() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");

    p1.set_ready(true);
    p2.connect(&id("p1")).expect("dial");
    settle(&mut [&mut p1, &mut p2]);

    assert_eq!(p2.readiness().get(&id("p1")), Some(&true));
    assert!(!p1.all_ready());

    p2.set_ready(true);
    let events = settle(&mut [&mut p1, &mut p2]);

    assert!(events[0].contains(&MeshEvent::AllReadyChanged(true)));
    assert_eq!(p1.state(), SessionState::AllReady);
    assert_eq!(p2.state(), SessionState::AllReady);
}

#[test]
fn test_new_connections_refused_once_all_ready() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");
    let mut p3 = spawn(&net, "p3");

    p1.connect(&id("p2")).expect("dial");
    settle(&mut [&mut p1, &mut p2, &mut p3]);
    p1.set_ready(true);
    p2.set_ready(true);
    settle(&mut [&mut p1, &mut p2, &mut p3]);
    assert!(p1.begin_playing());

    p3.connect(&id("p1")).expect("dial");
    let events = settle(&mut [&mut p1, &mut p2, &mut p3]);

    assert!(events[0].contains(&MeshEvent::ConnectionRefused(id("p3"))));
    assert_eq!(p1.members(), vec![id("p2")]);
    assert_eq!(p1.state(), SessionState::Playing);
    assert!(p3.members().is_empty());
    assert!(!net.is_linked(&id("p2"), &id("p3")));
}

#[test]
fn test_player_snapshots_reach_every_member() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");
    let mut p3 = spawn(&net, "p3");
    p1.connect(&id("p2")).expect("dial");
    p3.connect(&id("p2")).expect("dial");
    settle(&mut [&mut p1, &mut p2, &mut p3]);

    let left = Mat4::from_translation(Vec3::new(-0.2, 1.0, -1.0));
    let right = Mat4::from_translation(Vec3::new(0.2, 1.0, -1.0));
    let snapshot = PlayerState::new(42, [Some(left), Some(right)]);
    assert_eq!(p1.broadcast_player(&snapshot), 2);
    settle(&mut [&mut p1, &mut p2, &mut p3]);

    assert_eq!(p2.players().get(&id("p1")), Some(&snapshot));
    assert_eq!(p3.players().get(&id("p1")), Some(&snapshot));
    assert!(p1.players().is_empty());
}

#[test]
fn test_departure_clears_membership_and_player() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");
    let mut p3 = spawn(&net, "p3");
    p1.connect(&id("p2")).expect("dial");
    p3.connect(&id("p1")).expect("dial");
    settle(&mut [&mut p1, &mut p2, &mut p3]);
    p3.broadcast_player(&PlayerState::default());
    settle(&mut [&mut p1, &mut p2, &mut p3]);
    assert!(p1.players().contains(&id("p3")));

    drop(p3);
    let events = settle(&mut [&mut p1, &mut p2]);

    assert!(events[0].contains(&MeshEvent::PeerLeft(id("p3"))));
    assert_eq!(p1.members(), vec![id("p2")]);
    assert_eq!(p2.members(), vec![id("p1")]);
    assert!(!p1.players().contains(&id("p3")));
    assert!(!p2.players().contains(&id("p3")));
}

#[test]
fn test_unreachable_peer_fails_without_joining() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");

    p1.connect(&id("ghost")).expect("dial starts");
    let events = settle(&mut [&mut p1]);

    assert!(events[0]
        .iter()
        .any(|e| matches!(e, MeshEvent::ConnectionFailed { peer, .. } if *peer == id("ghost"))));
    assert!(p1.members().is_empty());
    assert!(!p1.is_pending(&id("ghost")));
}

#[test]
fn test_disconnect_resets_both_sides() {
    let net = LoopbackNetwork::new();
    let mut p1 = spawn(&net, "p1");
    let mut p2 = spawn(&net, "p2");
    p1.connect(&id("p2")).expect("dial");
    settle(&mut [&mut p1, &mut p2]);
    p1.set_ready(true);
    settle(&mut [&mut p1, &mut p2]);

    p1.disconnect();
    let events = settle(&mut [&mut p1, &mut p2]);

    assert_eq!(p1.state(), SessionState::Disconnected);
    assert!(!p1.local_ready());
    assert!(p1.readiness().is_empty());
    assert!(events[1].contains(&MeshEvent::PeerLeft(id("p1"))));
    assert!(p2.members().is_empty());

    // the session can be rejoined
    p1.connect(&id("p2")).expect("dial");
    settle(&mut [&mut p1, &mut p2]);
    assert_eq!(p1.members(), vec![id("p2")]);
    assert_eq!(p2.readiness().get(&id("p1")), Some(&false));
}
