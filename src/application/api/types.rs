use super::wire;
use crate::domains::math::{Aabb, Transform, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a spawned or queried actor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorInfo {
    pub id: String,
    pub name: String,
    pub class_path: String,
}

/// Snapshot of one actor in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class_path: String,
    #[serde(with = "wire::vector")]
    pub location: Vector3,
    #[serde(with = "wire::vector")]
    pub unit_forward_vector: Vector3,
    #[serde(with = "wire::vector")]
    pub unit_right_vector: Vector3,
    #[serde(with = "wire::aabb")]
    pub bounding_box: Aabb,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub current_speed: f64,
}

/// How an actor faces while it moves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Orientation {
    #[default]
    KeepCurrent,
    FaceMovement,
    /// Face along this forward vector.
    Given(Vector3),
}

impl Orientation {
    pub fn mode(&self) -> u8 {
        match self {
            Orientation::KeepCurrent => 0,
            Orientation::FaceMovement => 1,
            Orientation::Given(_) => 2,
        }
    }

    pub(crate) fn forward(&self) -> Option<wire::WireVector> {
        match self {
            Orientation::Given(forward) => Some(forward.into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Hand {
    #[default]
    Right,
    Left,
}

impl From<Hand> for u8 {
    fn from(hand: Hand) -> u8 {
        match hand {
            Hand::Right => 0,
            Hand::Left => 1,
        }
    }
}

impl TryFrom<u8> for Hand {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Hand::Right),
            1 => Ok(Hand::Left),
            other => Err(format!("unknown hand {}", other)),
        }
    }
}

/// Parameters of the straight-line mover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOptions {
    pub orientation: Orientation,
    pub speed_uu_per_sec: f64,
    pub tolerance_uu: f64,
    pub timeout: std::time::Duration,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::KeepCurrent,
            speed_uu_per_sec: 300.0,
            tolerance_uu: 5.0,
            timeout: super::scene::MOVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitResult {
    pub hit_actor: String,
}

/// Where a move ended and what stopped it, if anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveOutcome {
    #[serde(with = "wire::vector")]
    pub current_location: Vector3,
    #[serde(default)]
    pub hit_result: Option<HitResult>,
}

impl MoveOutcome {
    pub fn blocked(&self) -> bool {
        self.hit_result.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathQuery {
    pub allow_partial: bool,
    pub require_navigable_end_location: bool,
    /// Values at or below zero disable the limit.
    pub cost_limit: Option<f64>,
}

impl Default for PathQuery {
    fn default() -> Self {
        Self {
            allow_partial: true,
            require_navigable_end_location: false,
            cost_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationPath {
    #[serde(with = "wire::vector_list", default)]
    pub points: Vec<Vector3>,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub path_cost: f64,
    #[serde(default)]
    pub path_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigateOptions {
    pub accept_radius: f64,
    pub allow_partial: bool,
    pub speed_uu_per_sec: Option<f64>,
    pub timeout: std::time::Duration,
}

impl NavigateOptions {
    pub fn within(accept_radius: f64) -> Self {
        Self {
            accept_radius,
            allow_partial: true,
            speed_uu_per_sec: None,
            timeout: super::scene::MOVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(with = "wire::vector")]
    pub final_location: Vector3,
    #[serde(default)]
    pub is_partial: bool,
}

/// Reply of the manipulation calls; the default is a failure with no message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaInfo {
    pub id: String,
    #[serde(default)]
    pub asset_path: String,
    #[serde(with = "wire::transform")]
    pub anchor: Transform,
    #[serde(default)]
    pub is_loaded: bool,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub num_actors: u32,
}

/// Capture camera settings. Enum-like fields keep the server's numeric codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f64,
    pub qps: f64,
    pub enable_depth: bool,
    pub color_source: i32,
    pub color_format: i32,
    pub enable_post_process: bool,
    pub enable_temporal_aa: bool,
    pub depth_near: f64,
    pub depth_far: f64,
    pub depth_mode: i32,
    pub rgb_codec: i32,
    pub depth_codec: i32,
    pub jpeg_quality: u32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_degrees: 90.0,
            qps: 30.0,
            enable_depth: false,
            color_source: 0,
            color_format: 0,
            enable_post_process: true,
            enable_temporal_aa: false,
            depth_near: 10.0,
            depth_far: 10_000.0,
            depth_mode: 0,
            rgb_codec: 0,
            depth_codec: 0,
            jpeg_quality: 90,
        }
    }
}

/// Everything needed to place a new capture camera.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSpec {
    #[serde(rename = "world_transform", with = "wire::transform")]
    pub transform: Transform,
    pub params: CameraParams,
    #[serde(rename = "capture_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach_parent: Option<String>,
    pub attach_socket: String,
    pub keep_world: bool,
}

impl CameraSpec {
    pub fn at(transform: Transform) -> Self {
        Self {
            transform,
            params: CameraParams::default(),
            name: None,
            attach_parent: None,
            attach_socket: String::new(),
            keep_world: true,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_params(mut self, params: CameraParams) -> Self {
        self.params = params;
        self
    }

    pub fn attached_to(mut self, parent: &str, socket: &str) -> Self {
        self.attach_parent = Some(parent.to_string());
        self.attach_socket = socket.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureStatus {
    pub capturing: bool,
    pub queue_count: u32,
    pub compressed_queue_count: u32,
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f64,
    pub depth_mode: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub camera: ActorInfo,
    #[serde(default)]
    pub params: CameraParams,
    #[serde(default)]
    pub status: CaptureStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotOptions {
    pub include_color: bool,
    pub include_depth: bool,
    /// How long the server may wait for a frame.
    pub timeout_seconds: f64,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            include_color: true,
            include_depth: true,
            timeout_seconds: 0.5,
        }
    }
}

/// One captured frame. Pixel buffers are present only when requested and
/// produced; they are carried as raw bytes.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFrame {
    pub camera_id: String,
    #[serde(default)]
    pub frame_id: u64,
    #[serde(default)]
    pub game_time: f64,
    #[serde(default)]
    pub gpu_ready: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(with = "wire::transform")]
    pub world_pose: Transform,
    #[serde(default)]
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub has_color: bool,
    #[serde(default)]
    pub has_depth: bool,
    #[serde(default)]
    pub depth_near: f64,
    #[serde(default)]
    pub depth_far: f64,
    #[serde(default)]
    pub depth_mode: i32,
    #[serde(default)]
    pub rgba8: Option<Vec<u8>>,
    #[serde(default)]
    pub depth_r32: Option<Vec<u8>>,
}

impl fmt::Debug for CaptureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureFrame")
            .field("camera_id", &self.camera_id)
            .field("frame_id", &self.frame_id)
            .field("size", &(self.width, self.height))
            .field("rgba8", &self.rgba8.as_ref().map(Vec::len))
            .field("depth_r32", &self.depth_r32.as_ref().map(Vec::len))
            .finish()
    }
}
