use anyhow::{anyhow, Context, Result};
use glam::{EulerRot, Quat, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, BoxCollider, Ray, Transform};
use crate::input::{Modifiers, MouseButton, PointerEvent, PointerPhase};
use crate::marker::PaintMarker;
use crate::obj::load_obj_from_str;
use crate::painter::PaintTool;
use crate::palette::{Palette, PaletteId, PaletteItem, TemplateId};

/// Height above the ground from which `x`/`z` pointer steps look down.
const DEFAULT_EYE_HEIGHT: f32 = 10.0;

/// Object template that the painter can instantiate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDef {
    pub id: TemplateId,
    #[serde(default)]
    pub rotation: Quat,
    /// Render parts in template space.
    #[serde(default)]
    pub parts: Vec<Bounds>,
    #[serde(default)]
    pub colliders: Vec<BoxCollider>,
    #[serde(default)]
    pub layer: u32,
}

impl TemplateDef {
    /// Template without any geometry.
    pub fn new(id: TemplateId) -> Self {
        Self {
            id,
            rotation: Quat::IDENTITY,
            parts: Vec::new(),
            colliders: Vec::new(),
            layer: 0,
        }
    }

    /// Template with a single box-shaped render part and no collider.
    pub fn boxed(id: TemplateId, part: Bounds) -> Self {
        Self {
            parts: vec![part],
            ..Self::new(id)
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Adds a collider matching each render part.
    pub fn with_part_colliders(mut self) -> Self {
        self.colliders = self
            .parts
            .iter()
            .map(|part| BoxCollider::from_bounds(part, false))
            .collect();
        self
    }

    pub fn local_bounds(&self) -> Option<Bounds> {
        Bounds::union(self.parts.iter())
    }
}

/// Live object in the in-memory scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub parts: Vec<Bounds>,
    #[serde(default)]
    pub colliders: Vec<BoxCollider>,
    #[serde(default)]
    pub layer: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<PaintMarker>,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            template: None,
            transform: Transform::default(),
            parts: Vec::new(),
            colliders: Vec::new(),
            layer: 0,
            active: default_active(),
            marker: None,
        }
    }
}

fn default_active() -> bool {
    true
}

impl SceneObject {
    /// Fresh instance of `template` at the origin with its authored rotation.
    pub fn from_template(name: String, template: &TemplateDef) -> Self {
        Self {
            name,
            template: Some(template.id.clone()),
            transform: Transform::new(Vec3::ZERO, template.rotation),
            parts: template.parts.clone(),
            colliders: template.colliders.clone(),
            layer: template.layer,
            ..Self::default()
        }
    }

    /// Union of the render parts after applying the object transform.
    pub fn world_bounds(&self) -> Option<Bounds> {
        let matrix = self.transform.matrix();
        let parts: Vec<Bounds> = self
            .parts
            .iter()
            .map(|part| part.transformed(&matrix))
            .collect();
        Bounds::union(parts.iter())
    }
}

/// Static collidable geometry such as floors and walls.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDef {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub size: Vec3,
    pub layer: u32,
}

/// One step of a recorded editing session.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Tool(PaintTool),
    Select(usize),
    Pointer(PointerEvent),
}

/// Scene, palette and input recording replayed by the command line tool.
#[derive(Debug, Clone, Default)]
pub struct SessionDescription {
    pub templates: Vec<TemplateDef>,
    pub surfaces: Vec<SurfaceDef>,
    pub palette: Option<Palette>,
    pub script: Vec<ScriptStep>,
}

impl SessionDescription {
    /// Parses a session XML document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid session XML")?;
        let root = document.root_element();
        let mut session = Self::default();

        for node in root.children().filter(Node::is_element) {
            match node.tag_name().name() {
                "template" => session.templates.push(parse_template(&node)?),
                "surface" => session.surfaces.push(parse_surface(&node)?),
                "palette" => session.palette = Some(parse_palette(&node)?),
                "script" => {
                    for step in node.children().filter(Node::is_element) {
                        session.script.push(parse_step(&step)?);
                    }
                }
                other => log::warn!("ignoring unknown session element <{other}>"),
            }
        }

        Ok(session)
    }

    pub fn pointer_count(&self) -> usize {
        self.script
            .iter()
            .filter(|step| matches!(step, ScriptStep::Pointer(_)))
            .count()
    }
}

fn parse_template(node: &Node<'_, '_>) -> Result<TemplateDef> {
    let name = required_text(node, "name")?;
    let part = match optional_text(node, "mesh") {
        Some(mesh) => {
            let mesh = load_obj_from_str(&mesh)
                .with_context(|| format!("invalid mesh for template {name}"))?;
            mesh.bounds()
        }
        None => {
            let size = parse_vec3(optional_text(node, "size"), Vec3::ONE)?;
            let center = parse_vec3(optional_text(node, "center"), Vec3::Y * (size.y * 0.5))?;
            Some(Bounds::new(center, size))
        }
    };

    let mut template = TemplateDef::new(TemplateId::new(name));
    template.parts.extend(part);
    template.rotation = parse_rotation(optional_text(node, "rotation"))?;
    template.layer = parse_u32(optional_text(node, "layer"), 0)?;
    if parse_bool(optional_text(node, "collider"), false)? {
        template = template.with_part_colliders();
    }
    Ok(template)
}

fn parse_surface(node: &Node<'_, '_>) -> Result<SurfaceDef> {
    Ok(SurfaceDef {
        name: required_text(node, "name")?,
        position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
        rotation: parse_rotation(optional_text(node, "rotation"))?,
        size: parse_vec3(optional_text(node, "size"), Vec3::ONE)?,
        layer: parse_u32(optional_text(node, "layer"), 0)?,
    })
}

fn parse_palette(node: &Node<'_, '_>) -> Result<Palette> {
    let name = node
        .attribute("name")
        .ok_or_else(|| anyhow!("<palette> needs a name attribute"))?;
    let mut items = Vec::new();
    for item in node.children().filter(|n| n.has_tag_name("item")) {
        let size = parse_vec3(item.attribute("size").map(str::to_string), Vec3::ZERO)?;
        items.push(match item.attribute("template") {
            Some(template) => PaletteItem::new(TemplateId::new(template), size),
            None => PaletteItem::empty(),
        });
    }
    Ok(Palette::with_items(PaletteId::new(name), items))
}

fn parse_step(node: &Node<'_, '_>) -> Result<ScriptStep> {
    let text = || node.text().map(str::trim).unwrap_or_default();
    match node.tag_name().name() {
        "tool" => PaintTool::from_name(text())
            .map(ScriptStep::Tool)
            .ok_or_else(|| anyhow!("unknown tool `{}`", text())),
        "select" => text()
            .parse::<usize>()
            .map(ScriptStep::Select)
            .map_err(|err| anyhow!("invalid palette slot `{}`: {err}", text())),
        "pointer" => parse_pointer(node).map(ScriptStep::Pointer),
        other => Err(anyhow!("unknown script step <{other}>")),
    }
}

/// A pointer step either gives an explicit `origin`/`direction` ray or `x`
/// and `z` to look straight down on from `height`.
fn parse_pointer(node: &Node<'_, '_>) -> Result<PointerEvent> {
    let phase_name = node
        .attribute("phase")
        .ok_or_else(|| anyhow!("<pointer> needs a phase attribute"))?;
    let phase = PointerPhase::from_name(phase_name)
        .ok_or_else(|| anyhow!("unknown pointer phase `{phase_name}`"))?;

    let attribute = |name: &str| node.attribute(name).map(str::to_string);
    let mut event = match attribute("origin") {
        Some(origin) => {
            let origin = parse_vec3(Some(origin), Vec3::ZERO)?;
            let direction = parse_vec3(attribute("direction"), Vec3::NEG_Y)?;
            PointerEvent::new(phase, Ray::new(origin, direction))
        }
        None => {
            let x = parse_f32(attribute("x"), 0.0)?;
            let z = parse_f32(attribute("z"), 0.0)?;
            let height = parse_f32(attribute("height"), DEFAULT_EYE_HEIGHT)?;
            PointerEvent::looking_down(phase, Vec3::new(x, 0.0, z), height)
        }
    };

    if let Some(button) = node.attribute("button") {
        let button = MouseButton::from_name(button)
            .ok_or_else(|| anyhow!("unknown mouse button `{button}`"))?;
        event = event.with_button(button);
    }
    if let Some(modifiers) = node.attribute("modifiers") {
        event = event.with_modifiers(Modifiers::from_names(modifiers));
    }
    Ok(event)
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .map(|component| component.parse::<f32>());
    let mut next = || -> Result<f32> {
        numbers
            .next()
            .ok_or_else(|| anyhow!("vector `{value}` is missing components"))?
            .map_err(|err| anyhow!("invalid vector `{value}`: {err}"))
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// Euler angles in degrees, applied yaw first.
fn parse_rotation(value: Option<String>) -> Result<Quat> {
    let degrees = parse_vec3(value, Vec3::ZERO)?;
    Ok(Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    ))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some("false") | Some("0") | Some("no") => Ok(false),
        Some(other) => Err(anyhow!("failed to parse boolean `{other}`")),
        None => Ok(default),
    }
}
