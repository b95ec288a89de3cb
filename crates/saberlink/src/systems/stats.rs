//! # Stats System
//!
//! Diagnostics. Records what the renderer reported for the last frame, shows
//! it on a floating panel while presenting in XR, and logs a summary every
//! few hundred frames.

use crate::entities::{spawn_stats_panel, StatsDisplay};
use crate::render::RenderInfo;
use saberlink_core::{Entity, EntityId, EntityRegistry, FrameContext, SceneGraph, System};
use tracing::{debug, warn};

/// Renderer diagnostics.
#[derive(Debug)]
pub struct StatsSystem {
    registry: EntityRegistry,
    panel: EntityId,
    /// Panel while not presenting.
    stash: Option<Entity>,
    info: RenderInfo,
    log_interval: u64,
}

impl StatsSystem {
    /// Builds the panel, detached.
    ///
    /// # Arguments
    ///
    /// * `log_interval` - Frames between summaries; zero disables them
    pub fn new(scene: &mut SceneGraph, log_interval: u64) -> Self {
        let panel = spawn_stats_panel(scene);
        Self {
            registry: EntityRegistry::new(),
            panel: panel.id(),
            stash: Some(panel),
            info: RenderInfo::default(),
            log_interval,
        }
    }

    /// Records the renderer's counters.
    pub fn record(&mut self, info: RenderInfo) {
        self.info = info;
    }

    /// Last recorded counters.
    #[must_use]
    pub const fn info(&self) -> RenderInfo {
        self.info
    }

    /// Whether the panel is in the scene.
    #[must_use]
    pub fn panel_shown(&self) -> bool {
        self.registry.contains(self.panel)
    }

    /// Lines on the panel.
    #[must_use]
    pub fn panel_lines(&self) -> Vec<String> {
        self.registry
            .get(self.panel)
            .or(self.stash.as_ref())
            .and_then(|panel| panel.get::<StatsDisplay>())
            .map(|display| display.lines().to_vec())
            .unwrap_or_default()
    }
}

impl System for StatsSystem {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if let Some(display) = self
            .registry
            .get_mut(self.panel)
            .and_then(|panel| panel.get_mut::<StatsDisplay>())
        {
            display.set_info(self.info);
        }
        self.registry.update(ctx.scene, ctx.delta);

        if self.log_interval > 0 && ctx.frame % self.log_interval == 0 {
            let stats = ctx.scene.stats();
            debug!(
                frame = ctx.frame,
                rendered = self.info.frame,
                geometries = self.info.geometries,
                materials = self.info.materials,
                calls = self.info.calls,
                nodes = stats.nodes,
                released = stats.released_geometries,
                "render stats"
            );
        }
    }

    fn on_xr_present(&mut self, scene: &mut SceneGraph, presenting: bool) {
        if presenting {
            let Some(panel) = self.stash.take() else {
                return;
            };
            if let Err(err) = self.registry.add_entity(scene, panel, None) {
                warn!(%err, "stats panel not shown");
            }
        } else if let Some(panel) = self.registry.remove_entity(scene, self.panel) {
            self.stash = Some(panel);
        }
    }

    fn dispose(&mut self, scene: &mut SceneGraph) {
        self.registry.dispose(scene);
        if let Some(mut panel) = self.stash.take() {
            panel.dispose(scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_only_while_presenting() {
        let mut scene = SceneGraph::new();
        let mut stats = StatsSystem::new(&mut scene, 0);
        assert!(!stats.panel_shown());

        stats.on_xr_present(&mut scene, true);
        assert!(stats.panel_shown());
        stats.record(RenderInfo {
            frame: 9,
            geometries: 2,
            materials: 2,
            calls: 1,
        });
        let mut ctx = FrameContext {
            scene: &mut scene,
            delta: 0.016,
            frame: 9,
        };
        stats.update(&mut ctx);
        assert_eq!(stats.panel_lines().first().map(String::as_str), Some("frame: 9"));

        stats.on_xr_present(&mut scene, false);
        assert!(!stats.panel_shown());
        assert_eq!(stats.panel_lines().len(), 4);
    }

    #[test]
    fn test_dispose_releases_hidden_panel() {
        let mut scene = SceneGraph::new();
        let mut stats = StatsSystem::new(&mut scene, 0);
        assert_eq!(scene.stats().geometries, 1);
        stats.dispose(&mut scene);
        assert_eq!(scene.stats().geometries, 0);
    }
}
