//! Pointer-driven painting tool.
//!
//! [`LevelPainter`] turns pointer events into placements. Every consumed
//! event becomes a single undo group, so one undo step reverts a whole stroke
//! segment or a whole area fill.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PaintError;
use crate::grid::{infer_grid_pattern, GridPattern, RegionScope};
use crate::host::{ObjectId, PaintHost};
use crate::input::{PointerEvent, PointerPhase};
use crate::marker::nearest_marker;
use crate::palette::{Palette, PaletteId, PaletteSet, TemplateId};
use crate::placement::{
    has_conflict, place_at, place_unchecked, PlacementContext, REPLACE_UNDO_LABEL,
};
use crate::plane::{LateralRect, PaintPlane, WORLD_UP};
use crate::query::{raycast_scene, SurfaceHit};
use crate::settings::{ConflictPolicy, PainterSettings};
use crate::snap::snap_to_nearest;

pub const ERASE_UNDO_LABEL: &str = "Paint Erase";
pub const FILL_UNDO_NAME: &str = "Paint Fill";
pub const FILL_REPLACE_UNDO_NAME: &str = "Paint Fill Replace";

/// Slack added before flooring the number of fill cells.
const CELL_COUNT_SLACK: f32 = 1e-4;
/// Captured centers closer than this along lateral x share a column.
const COLUMN_TOLERANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintTool {
    #[default]
    Pencil,
    Fill,
    Erase,
    Pick,
}

impl PaintTool {
    pub fn from_name(name: &str) -> Option<Self> {
        let tool = match name.to_ascii_lowercase().as_str() {
            "pencil" | "paint" => Self::Pencil,
            "fill" | "area" => Self::Fill,
            "erase" | "eraser" => Self::Erase,
            "pick" | "eyedropper" => Self::Pick,
            _ => return None,
        };
        Some(tool)
    }
}

/// What the painter did with an event.
#[derive(Debug)]
pub enum EventResponse {
    /// Not for the painter: disabled, navigation modifier, other button, or
    /// nothing to do in this phase.
    Ignored,
    Consumed,
    /// The event was meant for the painter but could not be applied.
    Skipped(PaintError),
}

impl EventResponse {
    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// State of one area-fill drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillSession {
    pub start: Vec3,
    pub current: Vec3,
    pub normal: Vec3,
    pub fixed_height: f32,
    pub plane_origin: Vec3,
}

impl FillSession {
    fn begin(point: Vec3, normal: Vec3) -> Self {
        Self {
            start: point,
            current: point,
            normal,
            fixed_height: point.y,
            plane_origin: point,
        }
    }

    pub fn plane(&self) -> PaintPlane {
        PaintPlane::new(self.normal, Some(self.fixed_height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushPreview {
    pub center: Vec3,
    pub normal: Vec3,
    pub radius: f32,
}

/// Outcome of one area fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillReport {
    pub placed: usize,
    /// Instances removed before a replace fill.
    pub replaced: usize,
    /// Cells skipped because Stack found them occupied.
    pub blocked: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
struct Selection {
    palette: PaletteId,
    template: TemplateId,
    index: usize,
    footprint: Vec3,
}

impl Selection {
    fn context<'a>(
        &'a self,
        plane: &'a PaintPlane,
        settings: &'a PainterSettings,
    ) -> PlacementContext<'a> {
        PlacementContext {
            palette: &self.palette,
            template: &self.template,
            palette_index: self.index,
            footprint: self.footprint,
            plane,
            settings,
        }
    }
}

pub struct LevelPainter<H, R = StdRng> {
    host: H,
    rng: R,
    settings: PainterSettings,
    palettes: PaletteSet,
    selected: Option<usize>,
    tool: PaintTool,
    plane: PaintPlane,
    fill: Option<FillSession>,
    stroke: Option<Vec3>,
    hover: Option<SurfaceHit>,
    last_fill: Option<FillReport>,
}

impl<H: PaintHost> LevelPainter<H, StdRng> {
    pub fn new(host: H, settings: PainterSettings) -> Self {
        Self::with_rng(host, settings, StdRng::from_entropy())
    }

    pub fn seeded(host: H, settings: PainterSettings, seed: u64) -> Self {
        Self::with_rng(host, settings, StdRng::seed_from_u64(seed))
    }
}

impl<H: PaintHost, R: Rng> LevelPainter<H, R> {
    pub fn with_rng(host: H, settings: PainterSettings, rng: R) -> Self {
        Self {
            host,
            rng,
            settings: settings.clamped(),
            palettes: PaletteSet::new(),
            selected: None,
            tool: PaintTool::default(),
            plane: PaintPlane::default(),
            fill: None,
            stroke: None,
            hover: None,
            last_fill: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &PainterSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: PainterSettings) {
        self.settings = settings.clamped();
    }

    pub fn tool(&self) -> PaintTool {
        self.tool
    }

    /// Switches tools and drops any half-finished stroke or drag.
    pub fn set_tool(&mut self, tool: PaintTool) {
        if self.tool != tool {
            log::debug!("switching tool {:?} -> {:?}", self.tool, tool);
        }
        self.tool = tool;
        self.fill = None;
        self.stroke = None;
    }

    pub fn plane(&self) -> &PaintPlane {
        &self.plane
    }

    pub fn fill_session(&self) -> Option<&FillSession> {
        self.fill.as_ref()
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn last_fill(&self) -> Option<FillReport> {
        self.last_fill
    }

    pub fn palettes(&self) -> &PaletteSet {
        &self.palettes
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palettes.active()
    }

    pub fn palette_mut(&mut self) -> Option<&mut Palette> {
        self.palettes.active_mut()
    }

    /// Adds a palette and activates it when none is active yet.
    pub fn add_palette(&mut self, palette: Palette) -> usize {
        let index = self.palettes.add(palette);
        if self.palettes.active_index().is_none() {
            self.activate_palette(index);
        }
        index
    }

    /// Activates a palette and selects its first slot.
    pub fn activate_palette(&mut self, index: usize) -> bool {
        let Some(palette) = self.palettes.activate(index) else {
            return false;
        };
        self.selected = (!palette.is_empty()).then_some(0);
        true
    }

    pub fn select(&mut self, index: usize) -> bool {
        let valid = self
            .palettes
            .active()
            .is_some_and(|palette| index < palette.len());
        if valid {
            self.selected = Some(index);
        }
        valid
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_template(&self) -> Option<&TemplateId> {
        self.palettes.active()?.template(self.selected?)
    }

    /// Overlay text for states in which painting is unavailable.
    pub fn status_message(&self) -> Option<&'static str> {
        if !self.settings.enabled {
            Some("Painting disabled")
        } else if self.selected_template().is_none() {
            Some("Select a template in the palette to paint")
        } else {
            None
        }
    }

    /// Drag rectangle of the active fill on its plane.
    pub fn fill_preview(&self) -> Option<[Vec3; 4]> {
        let session = self.fill.as_ref()?;
        let plane = session.plane();
        Some(LateralRect::from_corners(&plane, session.start, session.current).corners(&plane))
    }

    pub fn brush_preview(&self) -> Option<BrushPreview> {
        let hover = self.hover.as_ref()?;
        Some(BrushPreview {
            center: hover.point,
            normal: self.plane.normal,
            radius: self.settings.brush_radius,
        })
    }

    fn selection(&mut self) -> Option<Selection> {
        let index = self.selected?;
        let palette = self.palettes.active_mut()?;
        let template = palette.template(index)?.clone();
        let footprint = palette.resolve_size(index, &self.host);
        Some(Selection {
            palette: palette.id().clone(),
            template,
            index,
            footprint,
        })
    }

    fn update_plane(&mut self, hit: &SurfaceHit) {
        let normal = if hit.normal.length_squared() > 0.001 {
            hit.normal
        } else {
            WORLD_UP
        };
        let height = self
            .fill
            .map_or(hit.point.y, |session| session.fixed_height);
        self.plane = PaintPlane::new(normal, Some(height));
    }

    /// Entry point for every pointer event over the scene view.
    pub fn handle_event(&mut self, event: &PointerEvent) -> EventResponse {
        if !self.settings.enabled || event.modifiers.alt || !event.button.is_primary() {
            return EventResponse::Ignored;
        }

        if event.phase == PointerPhase::Move {
            self.hover = raycast_scene(&self.host, &event.ray, self.settings.placement_mask);
            if let Some(hit) = self.hover {
                self.update_plane(&hit);
            }
            return EventResponse::Ignored;
        }

        let Some(selection) = self.selection() else {
            log::warn!("no template selected, ignoring pointer {:?}", event.phase);
            return EventResponse::Skipped(PaintError::NoSelection);
        };
        let Some(hit) = raycast_scene(&self.host, &event.ray, self.settings.placement_mask) else {
            log::debug!("pointer {:?} hit no surface", event.phase);
            return EventResponse::Skipped(PaintError::NoSurface);
        };
        self.hover = Some(hit);
        self.update_plane(&hit);

        let group = self.host.current_group();
        let response = match self.tool {
            PaintTool::Pencil => self.handle_pencil(event.phase, &hit, &selection),
            PaintTool::Fill => self.handle_fill(event.phase, &hit, &selection),
            PaintTool::Erase => self.handle_erase(event.phase, &hit),
            PaintTool::Pick => self.handle_pick(event.phase, &hit),
        };
        self.host.collapse_since(group);
        response
    }

    fn snapped(&self, point: Vec3) -> Vec3 {
        if !self.settings.snap_to_existing {
            return point;
        }
        snap_to_nearest(&self.host, point, &self.plane, self.settings.spacing).unwrap_or(point)
    }

    fn place(&mut self, selection: &Selection, point: Vec3, normal: Vec3) -> EventResponse {
        let ctx = selection.context(&self.plane, &self.settings);
        match place_at(&mut self.host, &ctx, &mut self.rng, point, normal) {
            Ok(_) => EventResponse::Consumed,
            Err(err) => {
                log::warn!("placement at {point} skipped: {err}");
                EventResponse::Skipped(err)
            }
        }
    }

    fn handle_pencil(
        &mut self,
        phase: PointerPhase,
        hit: &SurfaceHit,
        selection: &Selection,
    ) -> EventResponse {
        match phase {
            PointerPhase::Down => {
                let point = self.snapped(hit.point);
                let response = self.place(selection, point, hit.normal);
                if response.is_consumed() {
                    self.stroke = Some(point);
                }
                response
            }
            PointerPhase::Drag => {
                let point = self.snapped(hit.point);
                let step = self.settings.stroke_step();
                if self.stroke.is_some_and(|last| last.distance(point) < step) {
                    return EventResponse::Ignored;
                }
                let response = self.place(selection, point, hit.normal);
                self.stroke = Some(point);
                response
            }
            PointerPhase::Up => {
                self.stroke = None;
                EventResponse::Ignored
            }
            PointerPhase::Move => EventResponse::Ignored,
        }
    }

    fn handle_fill(
        &mut self,
        phase: PointerPhase,
        hit: &SurfaceHit,
        selection: &Selection,
    ) -> EventResponse {
        match phase {
            PointerPhase::Down if self.fill.is_none() => {
                self.fill = Some(FillSession::begin(hit.point, self.plane.normal));
                EventResponse::Consumed
            }
            PointerPhase::Drag => match self.fill.as_mut() {
                Some(session) => {
                    session.current = hit.point;
                    EventResponse::Consumed
                }
                None => EventResponse::Ignored,
            },
            PointerPhase::Up => match self.fill.take() {
                Some(session) => {
                    let report = self.perform_fill(selection, &session);
                    self.last_fill = Some(report);
                    EventResponse::Consumed
                }
                None => EventResponse::Ignored,
            },
            _ => EventResponse::Ignored,
        }
    }

    fn handle_erase(&mut self, phase: PointerPhase, hit: &SurfaceHit) -> EventResponse {
        if !matches!(phase, PointerPhase::Down | PointerPhase::Drag) {
            return EventResponse::Ignored;
        }
        let markers = self.host.markers();
        if let Some(nearest) = nearest_marker(&markers, hit.point) {
            log::debug!("erasing {} nearest to {}", nearest.id, hit.point);
            self.host.destroy_undoable(nearest.id, ERASE_UNDO_LABEL);
        }
        EventResponse::Consumed
    }

    fn handle_pick(&mut self, phase: PointerPhase, hit: &SurfaceHit) -> EventResponse {
        if phase != PointerPhase::Down {
            return EventResponse::Ignored;
        }
        let markers = self.host.markers();
        let picked = nearest_marker(&markers, hit.point).and_then(|nearest| {
            self.palettes
                .active()?
                .index_of(&nearest.marker.template)
        });
        if let Some(index) = picked {
            log::debug!("picked palette slot {index}");
            self.selected = Some(index);
        }
        EventResponse::Consumed
    }

    /// Snaps the drag corners and returns them with the inferred pattern.
    fn snap_fill_corners(
        &self,
        selection: &Selection,
        session: &FillSession,
        plane: &PaintPlane,
    ) -> (Vec3, Vec3, Option<GridPattern>) {
        let (start, end) = (session.start, session.current);
        if !self.settings.snap_to_existing {
            return (start, end, None);
        }
        let markers = self.host.markers();
        let drag = LateralRect::from_corners(plane, start, end);
        if let Some(pattern) =
            infer_grid_pattern(&markers, &selection.palette, &drag, plane, RegionScope::Inside)
        {
            return (pattern.snap(start, plane), pattern.snap(end, plane), Some(pattern));
        }
        let spacing = self.settings.spacing;
        let snap = |point| snap_to_nearest(&self.host, point, plane, spacing).unwrap_or(point);
        (snap(start), snap(end), None)
    }

    fn perform_fill(&mut self, selection: &Selection, session: &FillSession) -> FillReport {
        let plane = session.plane();
        let policy = self.settings.conflict_policy;
        self.host.set_group_name(match policy {
            ConflictPolicy::Replace => FILL_REPLACE_UNDO_NAME,
            ConflictPolicy::Stack => FILL_UNDO_NAME,
        });

        let (start, end, pattern) = self.snap_fill_corners(selection, session, &plane);
        let rect = LateralRect::from_corners(&plane, start, end);
        let ctx = selection.context(&plane, &self.settings);
        let report = match policy {
            ConflictPolicy::Replace => fill_replace(&mut self.host, &ctx, &mut self.rng, &rect),
            ConflictPolicy::Stack => {
                fill_stack(&mut self.host, &ctx, &mut self.rng, &rect, session, pattern)
            }
        };
        log::info!(
            "{policy:?} fill of {:.2}x{:.2}: placed {}, replaced {}, blocked {}, failed {}",
            rect.width,
            rect.height,
            report.placed,
            report.replaced,
            report.blocked,
            report.failed
        );
        report
    }
}

fn cell_count(extent: f32, step: f32) -> usize {
    (extent / step + CELL_COUNT_SLACK).floor().max(0.0) as usize
}

/// Re-creates every same-palette instance inside `rect` at its exact center.
fn fill_replace<H: PaintHost, R: Rng>(
    host: &mut H,
    ctx: &PlacementContext<'_>,
    rng: &mut R,
    rect: &LateralRect,
) -> FillReport {
    let plane = ctx.plane;
    let mut captured: Vec<(ObjectId, Vec3)> = host
        .markers()
        .iter()
        .filter(|record| record.belongs_to(ctx.palette))
        .map(|record| (record.id, record.reference_center()))
        .filter(|(_, center)| rect.contains(plane, *center))
        .collect();
    captured.sort_by(|(_, a), (_, b)| {
        let a = plane.lateral(*a);
        let b = plane.lateral(*b);
        let column = |v: Vec2| (v.x / COLUMN_TOLERANCE).round() as i64;
        column(a)
            .cmp(&column(b))
            .then_with(|| a.y.total_cmp(&b.y))
    });

    let mut report = FillReport::default();
    for (id, _) in &captured {
        if host.destroy_undoable(*id, REPLACE_UNDO_LABEL) {
            report.replaced += 1;
        }
    }
    for (_, center) in captured {
        let point = plane.pin_height(center);
        match place_unchecked(host, ctx, rng, point, plane.normal, false) {
            Ok(_) => report.placed += 1,
            Err(err) => {
                log::warn!("replace fill skipped {point}: {err}");
                report.failed += 1;
            }
        }
    }
    report
}

/// Fills `rect` with a dense grid of cells, skipping occupied ones.
fn fill_stack<H: PaintHost, R: Rng>(
    host: &mut H,
    ctx: &PlacementContext<'_>,
    rng: &mut R,
    rect: &LateralRect,
    session: &FillSession,
    pattern: Option<GridPattern>,
) -> FillReport {
    let plane = ctx.plane;
    let spacing = ctx.settings.spacing;
    let step = pattern.map(|pattern| pattern.step).unwrap_or_else(|| {
        Vec2::new(
            spacing.max(ctx.footprint.x.abs()).max(0.1),
            spacing.max(ctx.footprint.z.abs()).max(0.1),
        )
    });
    let columns = cell_count(rect.width, step.x);
    let rows = cell_count(rect.height, step.y);
    log::debug!("stack fill of {columns}x{rows} cells, step ({}, {})", step.x, step.y);

    let mut report = FillReport::default();
    for ix in 0..columns {
        for iz in 0..rows {
            let offset = Vec2::new((ix as f32 + 0.5) * step.x, (iz as f32 + 0.5) * step.y);
            let target = plane.offset(rect.base, offset);
            let (point, normal) = if plane.is_horizontal() {
                (Vec3::new(target.x, session.fixed_height, target.z), WORLD_UP)
            } else {
                (plane.closest_point(target, session.plane_origin), plane.normal)
            };
            if has_conflict(host, ctx, point) {
                report.blocked += 1;
                continue;
            }
            match place_unchecked(host, ctx, rng, point, normal, true) {
                Ok(_) => report.placed += 1,
                Err(err) => {
                    log::warn!("stack fill skipped cell {point}: {err}");
                    report.failed += 1;
                }
            }
        }
    }
    report
}
