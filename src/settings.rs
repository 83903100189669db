use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::host::{LayerMask, ALL_LAYERS};

/// How painting treats cells that already hold an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Destroy what is there and place the new instance.
    #[default]
    Replace,
    /// Leave occupied cells alone.
    Stack,
}

impl ConflictPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "stack" => Some(Self::Stack),
            _ => None,
        }
    }
}

/// User-tunable painter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PainterSettings {
    pub spacing: f32,
    pub brush_radius: f32,
    pub align_to_normal: bool,
    pub randomize_yaw: bool,
    pub random_yaw_max_degrees: f32,
    pub placement_mask: LayerMask,
    pub avoid_overlap: bool,
    pub max_push_iterations: u32,
    pub max_push_distance: f32,
    pub auto_colliders: bool,
    pub convex_colliders: bool,
    pub snap_to_existing: bool,
    pub conflict_policy: ConflictPolicy,
    pub enabled: bool,
}

impl Default for PainterSettings {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            brush_radius: 1.0,
            align_to_normal: true,
            randomize_yaw: false,
            random_yaw_max_degrees: 360.0,
            placement_mask: ALL_LAYERS,
            avoid_overlap: true,
            max_push_iterations: 8,
            max_push_distance: 3.0,
            auto_colliders: true,
            convex_colliders: true,
            snap_to_existing: true,
            conflict_policy: ConflictPolicy::Replace,
            enabled: true,
        }
    }
}

impl PainterSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("invalid settings JSON")?;
        Ok(settings.clamped())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("unable to read settings {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Copy with every numeric option forced into its editor range.
    pub fn clamped(&self) -> Self {
        Self {
            spacing: self.spacing.clamp(0.1, 10.0),
            brush_radius: self.brush_radius.clamp(0.1, 10.0),
            random_yaw_max_degrees: self.random_yaw_max_degrees.clamp(0.0, 360.0),
            max_push_iterations: self.max_push_iterations.min(32),
            max_push_distance: self.max_push_distance.clamp(0.0, 10.0),
            ..self.clone()
        }
    }

    /// Minimum travel between two pencil placements in one stroke.
    pub fn stroke_step(&self) -> f32 {
        self.spacing.max(0.05)
    }
}
