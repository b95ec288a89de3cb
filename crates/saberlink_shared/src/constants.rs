//! # Game Constants
//!
//! Values every peer must agree on. Remote saber poses are rendered relative
//! to these heights, so changing them desynchronises mixed-version sessions.

// =============================================================================
// RIG
// =============================================================================

/// Camera height of a standing player (meters)
pub const RIG_HEIGHT: f32 = 1.6;

/// Height of the hands relative to the floor (meters)
pub const HAND_HEIGHT: f32 = 0.8;

/// Saber blade extents (width, height, length)
pub const SABER_SIZE: [f32; 3] = [0.02, 0.02, 2.0];

/// Lateral offset of each saber from the rig center in non-XR mode
pub const NON_XR_SABER_SPREAD: f32 = 0.2;

/// Vertical offset of the non-XR rig below the camera
pub const NON_XR_RIG_DROP: f32 = -0.2;

/// Spacing between remote player proxies in the fan-out row
pub const PROXY_SPACING: f32 = 3.0;

/// Distance of the remote player row in front of the local player
pub const PROXY_ROW_Z: f32 = -10.0;

/// Pointer pixels per radian of camera rotation
pub const POINTER_LOOK_SENSITIVITY: f32 = 500.0;

// =============================================================================
// RUNWAY
// =============================================================================

/// Default floor size (width, length)
pub const FLOOR_SIZE: [f32; 2] = [2.0, 20.0];

/// Extra distance a note keeps flying past the floor before it is recycled
pub const FLY_PAST_DISTANCE: f32 = 5.0;

/// Seconds a note needs to cover the full flight distance
pub const MAX_FLY_TIME: f32 = 3.0;

/// Default note pool capacity
pub const NOTE_POOL_SIZE: usize = 20;

/// Height of the bottom note row above the floor
pub const NOTE_BASE_HEIGHT: f32 = 0.5;

/// Number of note lanes across the floor
pub const NOTE_LANES: u32 = 4;

/// Rows of the note grid above the floor
pub const NOTE_LAYERS: u32 = 3;

// =============================================================================
// COLORS
// =============================================================================

/// Left saber and red notes
pub const COLOR_RED: u32 = 0x00ff_0000;

/// Right saber and blue notes
pub const COLOR_BLUE: u32 = 0x0000_00ff;

/// Fallback color (bombs, unknown note types, the floor)
pub const COLOR_BLACK: u32 = 0x0000_0000;

// =============================================================================
// NETWORK
// =============================================================================

/// Seconds a dial may stay unanswered before it is abandoned
pub const CONNECT_TIMEOUT_SECS: f32 = 15.0;
