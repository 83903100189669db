use rand::Rng;

use crate::data_model::DataModel;
use crate::host::PaintHost;
use crate::painter::{EventResponse, LevelPainter};
use crate::palette::{Palette, PaletteId, PaletteItem};
use crate::scene::{ScriptStep, SessionDescription};

/// Tally of a replayed script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionReport {
    /// Pointer events fed to the painter.
    pub events: usize,
    pub consumed: usize,
    pub ignored: usize,
    pub skipped: usize,
}

/// Builds the in-memory scene described by a session: its templates and
/// static surfaces.
pub fn build_model(session: &SessionDescription) -> DataModel {
    let model = DataModel::new();
    for template in &session.templates {
        model.add_template(template.clone());
    }
    for surface in &session.surfaces {
        model.add_surface_def(surface);
    }
    model
}

/// The session's palette, or one slot per template when it has none.
pub fn session_palette(session: &SessionDescription) -> Palette {
    session.palette.clone().unwrap_or_else(|| {
        let items = session
            .templates
            .iter()
            .map(|template| PaletteItem::new(template.id.clone(), glam::Vec3::ZERO))
            .collect();
        Palette::with_items(PaletteId::new("session"), items)
    })
}

/// Feeds every script step to the painter in order.
pub fn replay_session<H, R>(painter: &mut LevelPainter<H, R>, script: &[ScriptStep]) -> SessionReport
where
    H: PaintHost,
    R: Rng,
{
    let mut report = SessionReport::default();
    for step in script {
        match step {
            ScriptStep::Tool(tool) => painter.set_tool(*tool),
            ScriptStep::Select(index) => {
                if !painter.select(*index) {
                    log::warn!("palette slot {index} does not exist");
                }
            }
            ScriptStep::Pointer(event) => {
                report.events += 1;
                match painter.handle_event(event) {
                    EventResponse::Consumed => report.consumed += 1,
                    EventResponse::Ignored => report.ignored += 1,
                    EventResponse::Skipped(_) => report.skipped += 1,
                }
            }
        }
    }
    log::info!(
        "replayed {} pointer event(s): {} consumed, {} ignored, {} skipped",
        report.events,
        report.consumed,
        report.ignored,
        report.skipped
    );
    report
}

pub fn print_final_state(model: &DataModel) {
    let placed: Vec<_> = model
        .all_objects()
        .into_iter()
        .filter(|(_, object)| object.active && object.marker.is_some())
        .collect();
    println!("Final markers ({}):", placed.len());
    for (_, object) in placed {
        let position = object.transform.position;
        println!(
            " - {} pos=({:.2}, {:.2}, {:.2})",
            object.name, position.x, position.y, position.z
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::painter::PaintTool;
    use crate::settings::PainterSettings;

    const SESSION: &str = r#"
    <session>
        <template><name>crate</name></template>
        <surface>
            <name>Ground</name>
            <position>0 -0.5 0</position>
            <size>20 1 20</size>
        </surface>
        <script>
            <tool>pencil</tool>
            <pointer phase="down" x="0" z="0"/>
            <pointer phase="up" x="0" z="0"/>
            <select>7</select>
            <pointer phase="down" x="3" z="0" button="right"/>
        </script>
    </session>
    "#;

    #[test]
    fn replay_counts_every_pointer_event() {
        let session = SessionDescription::from_xml(SESSION).unwrap();
        let model = build_model(&session);
        assert_eq!(model.template_count(), 1);
        assert_eq!(model.object_count(), 1);

        let mut painter = LevelPainter::seeded(model.clone(), PainterSettings::default(), 1);
        painter.add_palette(session_palette(&session));
        let report = replay_session(&mut painter, &session.script);

        assert_eq!(report.events, 3);
        assert_eq!(report.consumed, 1);
        assert_eq!(report.ignored, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(painter.tool(), PaintTool::Pencil);
        assert_eq!(model.marker_count(), 1);
    }

    #[test]
    fn sessions_without_palette_list_every_template() {
        let session = SessionDescription::from_xml(SESSION).unwrap();
        let palette = session_palette(&session);
        assert_eq!(palette.id().as_str(), "session");
        assert_eq!(palette.len(), 1);
        assert_eq!(palette.template(0).map(|t| t.as_str()), Some("crate"));
    }
}
