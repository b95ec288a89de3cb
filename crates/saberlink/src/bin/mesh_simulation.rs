//! # Mesh Simulation
//!
//! Three headless players on one loopback network:
//! - p1 dials p2, p3 dials p1 and learns about p2 through gossip
//! - everyone readies up, the beatmap plays
//! - the stationary pointer sabers cut every note in the bundled beatmap
//!
//! ```text
//! cargo run --bin mesh_simulation -- [config.toml]
//! RUST_LOG=saberlink=debug cargo run --bin mesh_simulation
//! ```

use saberlink::{Beatmap, Game, HeadlessRenderer, NoXr, SaberlinkConfig, Session, SilentTrack};
use saberlink_networking::{LoopbackNetwork, LoopbackTransport, MeshEvent, MeshProtocol};
use saberlink_shared::PeerId;
use std::error::Error;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BEATMAP: &str = include_str!("../../assets/beatmap.json");
const PLAYERS: [&str; 3] = ["p1", "p2", "p3"];
const FRAME_DELTA: f32 = 1.0 / 60.0;
const FRAMES: u64 = 60 * 30;
const LATE_JOIN_FRAME: u64 = 30;
const READY_FRAME: u64 = 60;

fn session(
    net: &LoopbackNetwork,
    name: &str,
    config: &SaberlinkConfig,
    beatmap: &Beatmap,
) -> Result<Session<LoopbackTransport>, Box<dyn Error>> {
    let mesh = MeshProtocol::new(net.endpoint_with_id(name)?, config.mesh.clone());
    let game = Game::new(
        config.game.clone(),
        beatmap.clone(),
        Box::new(HeadlessRenderer::new()),
        Box::new(NoXr),
        Box::new(SilentTrack::loading(10)),
    )?;
    Ok(Session::new(mesh, game)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("saberlink=info".parse()?))
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              SABERLINK - LOOPBACK MESH SIMULATION                ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => SaberlinkConfig::load(path)?,
        None => SaberlinkConfig::default(),
    };
    let beatmap = Beatmap::from_json(BEATMAP)?;
    info!(bpm = beatmap.bpm, notes = beatmap.notes.len(), "beatmap parsed");

    let net = LoopbackNetwork::new();
    let mut sessions = PLAYERS
        .iter()
        .map(|name| session(&net, name, &config, &beatmap))
        .collect::<Result<Vec<_>, _>>()?;

    sessions[0].connect(&PeerId::new("p2"))?;

    let started = Instant::now();
    for frame in 1..=FRAMES {
        if frame == LATE_JOIN_FRAME {
            sessions[2].connect(&PeerId::new("p1"))?;
        }
        if frame == READY_FRAME {
            for session in &mut sessions {
                session.set_ready(true);
            }
        }
        for session in &mut sessions {
            for event in session.frame(FRAME_DELTA) {
                if let MeshEvent::StateChanged { from, to } = event {
                    info!(peer = ?session.peer_id(), %from, %to, frame, "session state");
                }
            }
        }
    }
    let elapsed = started.elapsed();

    println!();
    println!("┌─ RESULTS ────────────────────────────────────────────────────────┐");
    println!("│ Frames:             {FRAMES}");
    println!("│ Real time:          {:.2} s", elapsed.as_secs_f64());
    println!("│ Simulated time:     {:.2} s", FRAMES as f32 * FRAME_DELTA);
    for session in &sessions {
        let name = session.peer_id().map_or("?", PeerId::as_str);
        let stats = session.mesh().stats();
        let frames = session.game().frame_stats();
        println!(
            "│ {name}: state={} score={}/{} proxies={} sent={} received={} avg_frame={:.3} ms",
            session.state(),
            session.score(),
            beatmap.notes.len(),
            session.game().rig().map_or(0, |rig| rig.proxy_count()),
            stats.messages_sent,
            stats.messages_received,
            frames.avg_frame_ms(),
        );
    }
    println!("└──────────────────────────────────────────────────────────────────┘");

    for session in &mut sessions {
        session.dispose();
    }
    Ok(())
}
