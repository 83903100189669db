use glam::{Quat, Vec3};
use level_painter::{
    Bounds, ConflictPolicy, DataModel, EventResponse, LevelPainter, Modifiers, MouseButton,
    PaintError, PaintTool, PainterSettings, Palette, PaletteId, PaletteItem, PointerEvent,
    PointerPhase, Ray, SceneObjects, TemplateDef, TemplateId,
};
use rand::rngs::StdRng;

fn world() -> DataModel {
    let model = DataModel::new();
    model.add_surface(
        "Ground",
        Vec3::new(0.0, -0.5, 0.0),
        Quat::IDENTITY,
        Vec3::new(40.0, 1.0, 40.0),
        0,
    );
    for name in ["crate", "barrel"] {
        model.add_template(TemplateDef::boxed(
            TemplateId::new(name),
            Bounds::new(Vec3::new(0.0, 0.5, 0.0), Vec3::ONE),
        ));
    }
    model
}

fn props() -> Palette {
    Palette::with_items(
        PaletteId::new("props"),
        vec![
            PaletteItem::new(TemplateId::new("crate"), Vec3::ONE),
            PaletteItem::new(TemplateId::new("barrel"), Vec3::ONE),
        ],
    )
}

fn painter_with(model: &DataModel, settings: PainterSettings) -> LevelPainter<DataModel, StdRng> {
    let mut painter = LevelPainter::seeded(model.clone(), settings, 7);
    painter.add_palette(props());
    painter
}

fn painter(model: &DataModel, policy: ConflictPolicy) -> LevelPainter<DataModel, StdRng> {
    painter_with(
        model,
        PainterSettings {
            conflict_policy: policy,
            ..PainterSettings::default()
        },
    )
}

fn at(phase: PointerPhase, x: f32, z: f32) -> PointerEvent {
    PointerEvent::looking_down(phase, Vec3::new(x, 0.0, z), 10.0)
}

fn click(painter: &mut LevelPainter<DataModel, StdRng>, x: f32, z: f32) -> EventResponse {
    let response = painter.handle_event(&at(PointerPhase::Down, x, z));
    painter.handle_event(&at(PointerPhase::Up, x, z));
    response
}

fn drag_fill(painter: &mut LevelPainter<DataModel, StdRng>, from: (f32, f32), to: (f32, f32)) {
    painter.set_tool(PaintTool::Fill);
    assert!(painter
        .handle_event(&at(PointerPhase::Down, from.0, from.1))
        .is_consumed());
    assert!(painter
        .handle_event(&at(PointerPhase::Drag, to.0, to.1))
        .is_consumed());
    assert!(painter
        .handle_event(&at(PointerPhase::Up, to.0, to.1))
        .is_consumed());
}

fn marker_centers(model: &DataModel) -> Vec<Vec3> {
    model
        .markers()
        .into_iter()
        .map(|record| record.marker.world_center)
        .collect()
}

fn contains_near(points: &[Vec3], expected: Vec3) -> bool {
    points.iter().any(|p| p.distance(expected) < 1e-4)
}

#[test]
fn stack_fill_covers_rectangle_with_half_step_cells() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    drag_fill(&mut painter, (0.0, 0.0), (-2.0, -3.0));

    let report = painter.last_fill().unwrap();
    assert_eq!(report.placed, 6);
    assert_eq!(report.blocked, 0);

    let centers = marker_centers(&model);
    assert_eq!(centers.len(), 6);
    for x in [-0.5, -1.5] {
        for z in [-0.5, -1.5, -2.5] {
            assert!(contains_near(&centers, Vec3::new(x, 0.0, z)), "no cell at ({x}, {z})");
        }
    }

    let positions: Vec<Vec3> = model.markers().iter().map(|r| r.position).collect();
    for (i, a) in positions.iter().enumerate() {
        for b in &positions[i + 1..] {
            let gap = (*a - *b).abs();
            assert!(gap.x >= 1.0 - 1e-3 || gap.z >= 1.0 - 1e-3, "{a} overlaps {b}");
        }
    }
}

#[test]
fn fill_is_a_single_undo_step() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    drag_fill(&mut painter, (0.0, 0.0), (-2.0, -3.0));

    assert_eq!(model.undo_depth(), 1);
    assert_eq!(model.undo_name().as_deref(), Some("Paint Fill"));
    assert!(model.undo());
    assert_eq!(model.marker_count(), 0);
    assert!(model.redo());
    assert_eq!(model.marker_count(), 6);
}

#[test]
fn stack_fill_skips_occupied_cells() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    click(&mut painter, -0.5, -0.5);
    assert_eq!(model.marker_count(), 1);

    drag_fill(&mut painter, (0.0, 0.0), (-2.0, -3.0));
    let report = painter.last_fill().unwrap();
    assert!(report.blocked >= 1);
    assert_eq!(model.marker_count(), 1 + report.placed);
}

#[test]
fn stack_refuses_to_place_on_an_occupied_cell() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    assert!(click(&mut painter, 0.0, 0.0).is_consumed());
    assert!(click(&mut painter, 0.3, 0.2).is_consumed());
    assert_eq!(model.marker_count(), 1);
}

#[test]
fn replace_swaps_the_instance_under_the_cursor() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    click(&mut painter, 2.0, 2.0);
    let first = model.markers()[0].id;

    click(&mut painter, 2.2, 2.1);
    let markers = model.markers();
    assert_eq!(markers.len(), 1);
    assert_ne!(markers[0].id, first);
    assert!(markers[0].position.distance(Vec3::new(2.0, 0.0, 2.0)) < 0.5);
}

#[test]
fn replace_fill_keeps_irregular_layouts() {
    let model = world();
    let mut painter = painter_with(
        &model,
        PainterSettings {
            snap_to_existing: false,
            ..PainterSettings::default()
        },
    );
    let layout = [
        Vec3::new(0.3, 0.0, 0.2),
        Vec3::new(1.7, 0.0, 0.4),
        Vec3::new(0.9, 0.0, 2.1),
    ];
    for point in layout {
        click(&mut painter, point.x, point.z);
    }
    let originals: Vec<_> = model.markers().iter().map(|r| r.id).collect();
    assert_eq!(originals.len(), 3);

    drag_fill(&mut painter, (-1.0, -1.0), (3.0, 3.0));
    let report = painter.last_fill().unwrap();
    assert_eq!(report.replaced, 3);
    assert_eq!(report.placed, 3);

    let markers = model.markers();
    assert_eq!(markers.len(), 3);
    for record in &markers {
        assert!(!originals.contains(&record.id));
    }
    let centers = marker_centers(&model);
    for point in layout {
        assert!(contains_near(&centers, point), "lost instance at {point}");
    }

    assert_eq!(model.undo_name().as_deref(), Some("Paint Fill Replace"));
    assert!(model.undo());
    let restored: Vec<_> = model.markers().iter().map(|r| r.id).collect();
    assert_eq!(restored, originals);
}

#[test]
fn erase_removes_the_nearest_marker_at_any_distance() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    click(&mut painter, 5.0, 5.0);
    click(&mut painter, 8.0, 8.0);
    let far = model.markers()[0].id;

    painter.set_tool(PaintTool::Erase);
    assert!(click(&mut painter, -15.0, -15.0).is_consumed());
    let remaining = model.markers();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0].id, far);
}

#[test]
fn pick_selects_the_palette_slot_of_the_nearest_marker() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    assert!(painter.select(1));
    click(&mut painter, 4.0, 0.0);
    assert!(painter.select(0));

    painter.set_tool(PaintTool::Pick);
    assert!(click(&mut painter, 3.6, 0.2).is_consumed());
    assert_eq!(painter.selected_index(), Some(1));
    assert_eq!(painter.selected_template().map(|t| t.as_str()), Some("barrel"));
    assert_eq!(model.marker_count(), 1);
}

#[test]
fn navigation_input_is_left_to_the_editor() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    let orbit = at(PointerPhase::Down, 0.0, 0.0).with_modifiers(Modifiers::from_names("alt"));
    assert!(matches!(painter.handle_event(&orbit), EventResponse::Ignored));
    let pan = at(PointerPhase::Down, 0.0, 0.0).with_button(MouseButton::MIDDLE);
    assert!(matches!(painter.handle_event(&pan), EventResponse::Ignored));
    assert_eq!(model.marker_count(), 0);
}

#[test]
fn disabled_painter_ignores_everything() {
    let model = world();
    let mut painter = painter_with(
        &model,
        PainterSettings {
            enabled: false,
            ..PainterSettings::default()
        },
    );
    assert!(matches!(click(&mut painter, 0.0, 0.0), EventResponse::Ignored));
    assert_eq!(painter.status_message(), Some("Painting disabled"));
    assert_eq!(model.marker_count(), 0);
}

#[test]
fn painting_without_a_selection_is_skipped() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    painter.deselect();
    assert!(painter.status_message().is_some());
    let response = click(&mut painter, 0.0, 0.0);
    assert!(matches!(response, EventResponse::Skipped(PaintError::NoSelection)));
    assert_eq!(model.marker_count(), 0);
}

#[test]
fn rays_that_miss_everything_are_skipped() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    let skyward = PointerEvent::new(
        PointerPhase::Down,
        Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::Y),
    );
    assert!(matches!(
        painter.handle_event(&skyward),
        EventResponse::Skipped(PaintError::NoSurface)
    ));
    assert!(!painter.is_stroking());
}

#[test]
fn pencil_strokes_respect_spacing() {
    let model = world();
    let mut painter = painter_with(
        &model,
        PainterSettings {
            snap_to_existing: false,
            ..PainterSettings::default()
        },
    );
    assert!(painter
        .handle_event(&at(PointerPhase::Down, 0.0, 0.0))
        .is_consumed());
    assert!(painter.is_stroking());
    assert!(matches!(
        painter.handle_event(&at(PointerPhase::Drag, 0.4, 0.0)),
        EventResponse::Ignored
    ));
    assert!(painter
        .handle_event(&at(PointerPhase::Drag, 1.1, 0.0))
        .is_consumed());
    assert!(matches!(
        painter.handle_event(&at(PointerPhase::Drag, 1.5, 0.0)),
        EventResponse::Ignored
    ));
    assert!(painter
        .handle_event(&at(PointerPhase::Drag, 2.2, 0.0))
        .is_consumed());
    painter.handle_event(&at(PointerPhase::Up, 2.2, 0.0));

    assert!(!painter.is_stroking());
    assert_eq!(model.marker_count(), 3);
    assert_eq!(model.undo_depth(), 3);
}

#[test]
fn missing_templates_are_reported_and_skipped() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Replace);
    if let Some(palette) = painter.palette_mut() {
        palette.push(TemplateId::new("ghost"), Vec3::ZERO);
    }
    assert!(painter.select(2));
    let response = click(&mut painter, 0.0, 0.0);
    assert!(matches!(
        response,
        EventResponse::Skipped(PaintError::Instantiation { .. })
    ));
    assert_eq!(model.marker_count(), 0);
}

#[test]
fn seeded_yaw_is_reproducible() {
    let settings = PainterSettings {
        randomize_yaw: true,
        ..PainterSettings::default()
    };
    let rotations: Vec<Quat> = (0..2)
        .map(|_| {
            let model = world();
            let mut painter = painter_with(&model, settings.clone());
            click(&mut painter, 1.0, 1.0);
            model.transform(model.markers()[0].id).unwrap().rotation
        })
        .collect();
    assert!(rotations[0].abs_diff_eq(rotations[1], 1e-6));
    assert!(!rotations[0].abs_diff_eq(Quat::IDENTITY, 1e-3));
}

#[test]
fn previews_follow_the_pointer() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    assert!(painter.brush_preview().is_none());
    painter.handle_event(&at(PointerPhase::Move, 1.0, 2.0));
    let brush = painter.brush_preview().unwrap();
    assert!(brush.center.distance(Vec3::new(1.0, 0.0, 2.0)) < 1e-4);
    assert_eq!(brush.radius, 1.0);

    painter.set_tool(PaintTool::Fill);
    painter.handle_event(&at(PointerPhase::Down, 0.0, 0.0));
    painter.handle_event(&at(PointerPhase::Drag, 2.0, 1.0));
    let corners = painter.fill_preview().unwrap();
    assert!(contains_near(&corners, Vec3::ZERO));
    assert!(contains_near(&corners, Vec3::new(2.0, 0.0, 1.0)));

    painter.set_tool(PaintTool::Pencil);
    assert!(painter.fill_preview().is_none());
}

#[test]
fn stack_fill_follows_the_grid_of_markers_in_the_region() {
    let model = world();
    let mut painter = painter_with(
        &model,
        PainterSettings {
            conflict_policy: ConflictPolicy::Stack,
            snap_to_existing: false,
            ..PainterSettings::default()
        },
    );
    for (x, z) in [(0.3, 0.3), (2.3, 0.3), (0.3, 2.3), (2.3, 2.3)] {
        assert!(click(&mut painter, x, z).is_consumed());
    }
    painter.set_settings(PainterSettings {
        conflict_policy: ConflictPolicy::Stack,
        ..PainterSettings::default()
    });

    // Corners snap to the 2-unit grid anchored at (2.3, 2.3), giving a 6x4
    // rectangle filled with 2-unit cells instead of footprint-sized ones.
    drag_fill(&mut painter, (-0.2, -0.1), (6.1, 4.4));
    let report = painter.last_fill().unwrap();
    assert_eq!(report.placed, 6);
    assert_eq!(report.blocked, 0);
    assert_eq!(model.marker_count(), 10);

    let centers = marker_centers(&model);
    for x in [1.3, 3.3, 5.3] {
        for z in [1.3, 3.3] {
            assert!(contains_near(&centers, Vec3::new(x, 0.0, z)), "no cell at ({x}, {z})");
        }
    }
}

#[test]
fn stack_fill_snaps_to_the_nearest_marker_without_a_pattern() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    assert!(click(&mut painter, 0.5, 0.5).is_consumed());

    // One marker is not a grid, so each corner snaps to 2-unit steps around
    // it: the rectangle becomes (0.5, 0.5)..(-3.5, -3.5).
    drag_fill(&mut painter, (0.2, 0.1), (-3.2, -3.9));
    let report = painter.last_fill().unwrap();
    assert_eq!(report.placed + report.blocked, 16);
    assert_eq!(report.failed, 0);

    let centers = marker_centers(&model);
    for cell in [
        Vec3::new(-3.0, 0.0, -3.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(-1.0, 0.0, 0.0),
    ] {
        assert!(contains_near(&centers, cell), "no cell at {cell}");
    }
}

fn on_wall(phase: PointerPhase, x: f32, y: f32) -> PointerEvent {
    PointerEvent::new(phase, Ray::new(Vec3::new(x, y, 0.0), Vec3::NEG_Z))
}

#[test]
fn stack_fill_on_a_wall_uses_the_wall_plane() {
    let model = world();
    model.add_surface(
        "Wall",
        Vec3::new(0.0, 5.0, -10.0),
        Quat::IDENTITY,
        Vec3::new(40.0, 10.0, 1.0),
        0,
    );
    let mut painter = painter(&model, ConflictPolicy::Stack);
    painter.set_tool(PaintTool::Fill);
    assert!(painter.handle_event(&on_wall(PointerPhase::Down, 0.0, 1.0)).is_consumed());
    assert!(painter.handle_event(&on_wall(PointerPhase::Drag, -2.0, 4.0)).is_consumed());
    assert!((painter.plane().normal - Vec3::Z).length() < 1e-4);
    assert!(!painter.plane().is_horizontal());
    assert!(painter.handle_event(&on_wall(PointerPhase::Up, -2.0, 4.0)).is_consumed());

    let report = painter.last_fill().unwrap();
    assert_eq!(report.placed, 6);
    let centers = marker_centers(&model);
    for x in [-0.5, -1.5] {
        for y in [1.5, 2.5, 3.5] {
            assert!(contains_near(&centers, Vec3::new(x, y, -9.5)), "no cell at ({x}, {y})");
        }
    }
    for record in model.markers() {
        let up = model.transform(record.id).unwrap().rotation * Vec3::Y;
        assert!((up - Vec3::Z).length() < 1e-4);
    }
}

#[test]
fn fill_that_places_nothing_does_not_rename_the_next_step() {
    let model = world();
    let mut painter = painter(&model, ConflictPolicy::Stack);
    // Too small for a single cell.
    drag_fill(&mut painter, (0.0, 0.0), (0.4, 0.4));
    assert_eq!(painter.last_fill().unwrap().placed, 0);
    assert_eq!(model.undo_depth(), 0);

    painter.set_tool(PaintTool::Pencil);
    assert!(click(&mut painter, 3.0, 3.0).is_consumed());
    assert_eq!(model.undo_name().as_deref(), Some("Paint Place"));
}
