//! # XR Device
//!
//! Immersive session control as the frame loop sees it. Session negotiation
//! completes asynchronously: [`XrDevice::request_session`] only starts it and
//! [`XrDevice::is_presenting`] reports when rendering has switched over.

use saberlink_shared::Transform;
use thiserror::Error;

/// XR session errors. Never fatal: the game stays in non-XR mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrError {
    /// The device cannot run this mode.
    #[error("{0:?} sessions are not supported")]
    Unsupported(XrMode),

    /// The user or the runtime declined the session.
    #[error("session request declined")]
    Declined,
}

/// Immersive session mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XrMode {
    /// Passthrough augmented reality.
    ImmersiveAr,
    /// Fully virtual.
    ImmersiveVr,
}

/// An XR runtime.
pub trait XrDevice {
    /// Whether `mode` can be requested.
    fn supports(&self, mode: XrMode) -> bool;

    /// Starts negotiating a session.
    ///
    /// # Errors
    ///
    /// The mode is unsupported or the request was declined.
    fn request_session(&mut self, mode: XrMode) -> Result<(), XrError>;

    /// Ends the active session, if any.
    fn end_session(&mut self);

    /// Whether a session exists (presenting or still negotiating).
    fn has_session(&self) -> bool;

    /// Whether frames are being presented to the headset.
    fn is_presenting(&self) -> bool;

    /// Pose of a tracked controller relative to the rig. Index 0 holds the
    /// right saber, index 1 the left one.
    fn controller_pose(&self, index: usize) -> Option<Transform>;
}

/// The mode to request: AR when available, otherwise VR.
#[must_use]
pub fn preferred_mode(device: &dyn XrDevice) -> Option<XrMode> {
    [XrMode::ImmersiveAr, XrMode::ImmersiveVr]
        .into_iter()
        .find(|&mode| device.supports(mode))
}

/// No XR runtime at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoXr;

impl XrDevice for NoXr {
    fn supports(&self, _mode: XrMode) -> bool {
        false
    }

    fn request_session(&mut self, mode: XrMode) -> Result<(), XrError> {
        Err(XrError::Unsupported(mode))
    }

    fn end_session(&mut self) {}

    fn has_session(&self) -> bool {
        false
    }

    fn is_presenting(&self) -> bool {
        false
    }

    fn controller_pose(&self, _index: usize) -> Option<Transform> {
        None
    }
}

/// Scriptable runtime: a granted session starts presenting immediately and
/// controller poses are set by hand.
#[derive(Clone, Debug, Default)]
pub struct SimulatedXr {
    ar: bool,
    vr: bool,
    decline: bool,
    session: Option<XrMode>,
    poses: [Option<Transform>; 2],
}

impl SimulatedXr {
    /// Runtime supporting the given modes.
    #[must_use]
    pub fn new(ar: bool, vr: bool) -> Self {
        Self {
            ar,
            vr,
            ..Self::default()
        }
    }

    /// Makes every request fail with [`XrError::Declined`].
    #[must_use]
    pub fn declining(mut self) -> Self {
        self.decline = true;
        self
    }

    /// Mode of the active session.
    #[must_use]
    pub const fn session(&self) -> Option<XrMode> {
        self.session
    }

    /// Sets a controller pose.
    pub fn set_controller_pose(&mut self, index: usize, pose: Option<Transform>) {
        if let Some(slot) = self.poses.get_mut(index) {
            *slot = pose;
        }
    }
}

impl XrDevice for SimulatedXr {
    fn supports(&self, mode: XrMode) -> bool {
        match mode {
            XrMode::ImmersiveAr => self.ar,
            XrMode::ImmersiveVr => self.vr,
        }
    }

    fn request_session(&mut self, mode: XrMode) -> Result<(), XrError> {
        if !self.supports(mode) {
            return Err(XrError::Unsupported(mode));
        }
        if self.decline {
            return Err(XrError::Declined);
        }
        self.session = Some(mode);
        Ok(())
    }

    fn end_session(&mut self) {
        self.session = None;
    }

    fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn is_presenting(&self) -> bool {
        self.session.is_some()
    }

    fn controller_pose(&self, index: usize) -> Option<Transform> {
        self.poses.get(index).copied().flatten()
    }
}
