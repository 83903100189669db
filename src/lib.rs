//! Grid-aware object placement for level editors.
//!
//! The crate turns pointer input over a 3D scene into placements of
//! palette templates: single clicks, spaced strokes and rectangular area
//! fills that line up with the grid existing instances already follow.
//! Everything the engine needs from the editor is expressed through the
//! traits in [`host`], and [`DataModel`] implements them in memory so the
//! engine can be driven headless from tests and the command line tool.

pub mod app;
pub mod data_model;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod host;
pub mod input;
pub mod marker;
pub mod obj;
pub mod painter;
pub mod palette;
pub mod placement;
pub mod plane;
pub mod query;
pub mod relax;
pub mod scene;
pub mod settings;
pub mod snap;

pub use data_model::DataModel;
pub use error::{HostError, PaintError};
pub use geometry::{Bounds, Ray, Transform};
pub use host::{ObjectId, PaintHost, SceneObjects, SceneQuery, UndoLog};
pub use input::{Modifiers, MouseButton, PointerEvent, PointerPhase};
pub use marker::{MarkerRecord, PaintMarker};
pub use obj::{load_obj_from_str, ObjMesh};
pub use painter::{EventResponse, FillReport, LevelPainter, PaintTool};
pub use palette::{Palette, PaletteId, PaletteItem, PaletteSet, TemplateId};
pub use plane::PaintPlane;
pub use scene::{SceneObject, ScriptStep, SessionDescription, TemplateDef};
pub use settings::{ConflictPolicy, PainterSettings};
