//! # Rig System
//!
//! Owns the camera, the local player's rigs and one proxy rig per remote
//! player.
//!
//! Outside XR the pointer rig hangs under the camera, so the sabers follow
//! pointer-look. While presenting, the XR rig replaces it and the camera
//! moves under the XR rig, whose controllers carry the sabers. The inactive
//! rig is kept detached and reused on the next switch.

use crate::entities::{build_pointer_rig, build_xr_rig, ControllerComponent, RigHandle, XrRigHandle};
use crate::render::Camera;
use saberlink_core::{
    CoreResult, Entity, EntityId, EntityRegistry, FrameContext, SceneGraph, System,
};
use saberlink_networking::PlayerCache;
use saberlink_shared::constants::{HAND_HEIGHT, PROXY_ROW_Z, PROXY_SPACING, RIG_HEIGHT};
use saberlink_shared::{PeerId, Transform, Vec3};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Fan-out position of the proxy in `slot`: alternating left and right of
/// the runway, moving outwards every second slot.
#[must_use]
pub fn proxy_offset(slot: usize) -> Vec3 {
    let side = if slot % 2 == 1 { 1.0 } else { -1.0 };
    let rank = (slot / 2 + 1) as f32;
    Vec3::new(PROXY_SPACING * side * rank, 0.0, PROXY_ROW_Z)
}

#[derive(Clone, Copy, Debug)]
struct Proxy {
    slot: usize,
    rig: RigHandle,
}

/// Camera, local rigs and remote proxies.
#[derive(Debug)]
pub struct RigSystem {
    registry: EntityRegistry,
    camera: Camera,
    pointer: RigHandle,
    xr: XrRigHandle,
    /// Whichever local rig is not in the scene.
    stash: Option<Entity>,
    presenting: bool,
    proxies: BTreeMap<PeerId, Proxy>,
}

impl RigSystem {
    /// Spawns the camera and both local rigs. The pointer rig starts active.
    ///
    /// # Errors
    ///
    /// Propagates scene attach failures.
    pub fn new(scene: &mut SceneGraph, aspect: f32) -> CoreResult<Self> {
        let camera = Camera::spawn(scene, aspect);

        let (pointer_rig, pointer) = build_pointer_rig(scene, "pointer-rig")?;
        let (xr_rig, xr) = build_xr_rig(scene)?;
        let mut registry = EntityRegistry::new();
        registry.add_entity(scene, pointer_rig, Some(camera.node()))?;

        info!(pointer = %pointer.root, xr = %xr.root, "rigs initialized");
        Ok(Self {
            registry,
            camera,
            pointer,
            xr,
            stash: Some(xr_rig),
            presenting: false,
            proxies: BTreeMap::new(),
        })
    }

    /// Camera.
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera, for viewport changes.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Whether the XR rig is active.
    #[must_use]
    pub const fn is_presenting(&self) -> bool {
        self.presenting
    }

    /// Active local rig.
    #[must_use]
    pub const fn active_rig(&self) -> RigHandle {
        if self.presenting {
            self.xr.as_rig()
        } else {
            self.pointer
        }
    }

    /// Active local sabers, left then right.
    #[must_use]
    pub const fn sabers(&self) -> [EntityId; 2] {
        self.active_rig().sabers
    }

    /// Proxy rig of a remote player.
    #[must_use]
    pub fn proxy(&self, peer: &PeerId) -> Option<RigHandle> {
        self.proxies.get(peer).map(|p| p.rig)
    }

    /// Number of proxy rigs.
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    /// Rotates the camera by pointer movement. Ignored while presenting.
    pub fn pointer_look(&mut self, scene: &mut SceneGraph, dx: f32, dy: f32) {
        if !self.presenting {
            self.camera.look(scene, dx, dy);
        }
    }

    /// Feeds tracked controller poses to the XR rig, by device index.
    pub fn set_controller_poses(&mut self, poses: [Option<Transform>; 2]) {
        let rig = if self.presenting {
            self.registry.get_mut(self.xr.root)
        } else {
            self.stash.as_mut()
        };
        let Some(rig) = rig else {
            return;
        };
        for (id, pose) in self.xr.controllers.into_iter().zip(poses) {
            if let Some(controller) = rig.child_mut(id).and_then(|c| c.get_mut::<ControllerComponent>()) {
                controller.set_pose(pose);
            }
        }
    }

    fn switch_rig(&mut self, scene: &mut SceneGraph, presenting: bool) -> CoreResult<()> {
        let (outgoing, incoming) = if presenting {
            (self.pointer.root, self.xr.root)
        } else {
            (self.xr.root, self.pointer.root)
        };
        let Some(next) = self.stash.take() else {
            return Ok(());
        };

        if presenting {
            self.camera.set_height(scene, RIG_HEIGHT - HAND_HEIGHT);
            self.registry.add_entity(scene, next, None)?;
            scene.attach(incoming.node(), self.camera.node())?;
        } else {
            self.camera.set_height(scene, RIG_HEIGHT);
            let root = scene.root();
            scene.attach(root, self.camera.node())?;
            self.registry.add_entity(scene, next, Some(self.camera.node()))?;
        }
        self.stash = self.registry.remove_entity(scene, outgoing);
        Ok(())
    }

    /// Creates, moves and removes proxy rigs to match the remote player
    /// cache. Saber poses are copied verbatim from the broadcast matrices.
    /// New proxies take free slots in the order their players joined.
    pub fn reconcile(&mut self, scene: &mut SceneGraph, players: &PlayerCache) {
        let gone: Vec<PeerId> = self
            .proxies
            .keys()
            .filter(|peer| !players.contains(peer))
            .cloned()
            .collect();
        for peer in gone {
            let Some(proxy) = self.proxies.remove(&peer) else {
                continue;
            };
            if let Some(mut rig) = self.registry.remove_entity(scene, proxy.rig.root) {
                rig.dispose(scene);
            }
            info!(%peer, slot = proxy.slot, "proxy rig removed");
        }

        for (peer, state) in players.iter() {
            if !self.proxies.contains_key(peer) {
                match self.spawn_proxy(scene) {
                    Ok(proxy) => {
                        info!(%peer, slot = proxy.slot, "proxy rig created");
                        self.proxies.insert(peer.clone(), proxy);
                    }
                    Err(err) => {
                        warn!(%peer, %err, "proxy rig not created");
                        continue;
                    }
                }
            }
            let Some(proxy) = self.proxies.get(peer) else {
                continue;
            };
            for (saber, matrix) in proxy.rig.sabers.into_iter().zip(state.sabers_matrix) {
                let (Some(matrix), Some(transform)) = (matrix, scene.transform_mut(saber.node())) else {
                    continue;
                };
                transform.position = matrix.position();
                transform.rotation = matrix.rotation();
            }
        }
    }

    fn spawn_proxy(&mut self, scene: &mut SceneGraph) -> CoreResult<Proxy> {
        let slot = (0..)
            .find(|slot| self.proxies.values().all(|p| p.slot != *slot))
            .unwrap_or(self.proxies.len());
        let (mut rig, handle) = build_pointer_rig(scene, "proxy-rig")?;
        rig.set_position(proxy_offset(slot));
        // Settle the builder's transforms so broadcast poses are not overwritten.
        rig.update(scene, 0.0);
        self.registry.add_entity(scene, rig, None)?;
        Ok(Proxy { slot, rig: handle })
    }
}

impl System for RigSystem {
    fn name(&self) -> &'static str {
        "rig"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.registry.update(ctx.scene, ctx.delta);
    }

    fn on_xr_present(&mut self, scene: &mut SceneGraph, presenting: bool) {
        if presenting == self.presenting {
            return;
        }
        match self.switch_rig(scene, presenting) {
            Ok(()) => {
                self.presenting = presenting;
                debug!(presenting, "active rig switched");
            }
            Err(err) => warn!(%err, presenting, "rig switch failed"),
        }
    }

    fn dispose(&mut self, scene: &mut SceneGraph) {
        self.registry.dispose(scene);
        if let Some(mut rig) = self.stash.take() {
            rig.dispose(scene);
        }
        self.proxies.clear();
        if scene.contains(self.camera.node()) {
            if let Err(err) = scene.despawn(self.camera.node()) {
                debug!(%err, "camera not despawned");
            }
        }
    }
}
