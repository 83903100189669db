use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::host::ObjectId;
use crate::palette::{PaletteId, TemplateId};

/// Metadata attached to every object the painter creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintMarker {
    /// Footprint used for spacing and overlap math.
    pub size: Vec3,
    pub template: TemplateId,
    pub palette_index: usize,
    /// Point the user aimed at. Surface snapping and relaxation move the
    /// transform away from it, so the two are kept apart.
    pub world_center: Vec3,
    pub palette: PaletteId,
}

/// A live marker as returned by a scene query.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    pub id: ObjectId,
    pub marker: PaintMarker,
    /// Current transform position of the owning object.
    pub position: Vec3,
}

impl MarkerRecord {
    /// Intended center, or the transform position for markers that never
    /// recorded one.
    pub fn reference_center(&self) -> Vec3 {
        if self.marker.world_center != Vec3::ZERO {
            self.marker.world_center
        } else {
            self.position
        }
    }

    pub fn belongs_to(&self, palette: &PaletteId) -> bool {
        &self.marker.palette == palette
    }
}

/// Marker whose transform is closest to `point`, with no distance cap.
pub fn nearest_marker(markers: &[MarkerRecord], point: Vec3) -> Option<&MarkerRecord> {
    markers.iter().min_by(|a, b| {
        a.position
            .distance_squared(point)
            .total_cmp(&b.position.distance_squared(point))
    })
}
