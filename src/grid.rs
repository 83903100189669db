//! Inference of the regular grid hand-placed instances already follow.
//!
//! Area fills line up with existing layouts by sampling the lateral
//! separation of every pair of same-palette markers and taking the mode of
//! each axis as the grid step.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::marker::MarkerRecord;
use crate::palette::PaletteId;
use crate::plane::{LateralRect, PaintPlane};

/// Width of the bins used to find the dominant spacing.
pub const SPACING_TOLERANCE: f32 = 0.1;
/// Separations at or below this are treated as the same cell.
pub const MIN_SAMPLE: f32 = 0.01;
/// Separations at or above this are too far apart to describe a grid.
pub const MAX_SAMPLE: f32 = 10.0;

/// Which markers feed the inference relative to the fill rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionScope {
    Inside,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPattern {
    /// Step along the plane's lateral x and z axes.
    pub step: Vec2,
    pub origin: Vec3,
}

impl GridPattern {
    /// Rounds the lateral offset of `point` from the origin to whole steps.
    pub fn snap(&self, point: Vec3, plane: &PaintPlane) -> Vec3 {
        let cells = round_to_step(plane.lateral(point - self.origin), self.step);
        plane.pin_height(plane.offset(self.origin, cells))
    }
}

fn round_to_step(offset: Vec2, step: Vec2) -> Vec2 {
    (offset / step).round() * step
}

/// Representative value of the most populated bin of width `tolerance`.
///
/// Bins are keyed by `round(sample / tolerance)`. Ties go to the bin created
/// first and the result is the first sample that landed in the winning bin.
/// Returns zero for an empty slice.
pub fn most_common_spacing(samples: &[f32], tolerance: f32) -> f32 {
    let Some(&first) = samples.first() else {
        return 0.0;
    };
    let mut order: Vec<i64> = Vec::new();
    let mut bins: HashMap<i64, Vec<f32>> = HashMap::new();
    for &sample in samples {
        let key = (sample / tolerance).round() as i64;
        bins.entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(sample);
    }

    let mut best = first;
    let mut best_count = 0;
    for key in order {
        let Some(bin) = bins.get(&key) else {
            continue;
        };
        if bin.len() > best_count {
            best_count = bin.len();
            best = bin[0];
        }
    }
    best
}

/// Infers the grid followed by same-palette markers inside or outside `rect`.
///
/// At least two markers must be in scope. Each of them is paired with every
/// other qualifying marker, in scope or not. The origin is the scanned center
/// that is minimal along both lateral axes.
pub fn infer_grid_pattern(
    markers: &[MarkerRecord],
    palette: &PaletteId,
    rect: &LateralRect,
    plane: &PaintPlane,
    scope: RegionScope,
) -> Option<GridPattern> {
    let centers: Vec<Vec3> = markers
        .iter()
        .filter(|record| record.belongs_to(palette))
        .map(MarkerRecord::reference_center)
        .collect();
    let scanned: Vec<usize> = (0..centers.len())
        .filter(|&i| rect.contains(plane, centers[i]) == (scope == RegionScope::Inside))
        .collect();
    if scanned.len() < 2 {
        return None;
    }

    let mut x_samples = Vec::new();
    let mut z_samples = Vec::new();
    let mut origin = centers[scanned[0]];

    for &i in &scanned {
        let center = centers[i];
        let towards = plane.lateral(center - origin);
        if towards.x < 0.0 {
            origin += plane.axis_x * towards.x;
        }
        if towards.y < 0.0 {
            origin += plane.axis_z * towards.y;
        }

        for (j, &other) in centers.iter().enumerate() {
            if i == j {
                continue;
            }
            let separation = plane.lateral(other - center).abs();
            if separation.x > MIN_SAMPLE && separation.x < MAX_SAMPLE {
                x_samples.push(separation.x);
            }
            if separation.y > MIN_SAMPLE && separation.y < MAX_SAMPLE {
                z_samples.push(separation.y);
            }
        }
    }

    if x_samples.is_empty() || z_samples.is_empty() {
        return None;
    }
    let step = Vec2::new(
        most_common_spacing(&x_samples, SPACING_TOLERANCE),
        most_common_spacing(&z_samples, SPACING_TOLERANCE),
    );
    if step.x <= MIN_SAMPLE || step.y <= MIN_SAMPLE {
        return None;
    }
    log::debug!("inferred {scope:?} grid step=({}, {}) origin={origin}", step.x, step.y);
    Some(GridPattern { step, origin })
}

/// Snaps `point` onto `pattern` using the nearest same-palette marker as the
/// reference cell instead of the pattern origin. The height of `point` is
/// kept as is.
pub fn adjust_to_pattern(
    markers: &[MarkerRecord],
    palette: &PaletteId,
    point: Vec3,
    pattern: &GridPattern,
    plane: &PaintPlane,
) -> Option<Vec3> {
    if pattern.step.x <= MIN_SAMPLE || pattern.step.y <= MIN_SAMPLE {
        return None;
    }
    let reference = markers
        .iter()
        .filter(|record| record.belongs_to(palette))
        .map(MarkerRecord::reference_center)
        .min_by(|a, b| a.distance(point).total_cmp(&b.distance(point)))?;
    let cells = round_to_step(plane.lateral(point - reference), pattern.step);
    let mut adjusted = plane.offset(reference, cells);
    adjusted.y = point.y;
    Some(adjusted)
}
