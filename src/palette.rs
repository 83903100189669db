//! Palettes of placeable templates and their footprints.
//!
//! A palette is an ordered list of slots. Each slot names a template and the
//! footprint used for spacing math. A zero footprint means "not measured yet";
//! [`Palette::resolve_size`] estimates it from the template's render bounds the
//! first time it is needed and caches the result in the slot.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::host::SceneObjects;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaletteId(String);

impl PaletteId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaletteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One palette slot. Slots may be empty while the user is editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteItem {
    pub template: Option<TemplateId>,
    #[serde(default)]
    pub size: Vec3,
}

impl PaletteItem {
    pub fn new(template: TemplateId, size: Vec3) -> Self {
        Self {
            template: Some(template),
            size,
        }
    }

    pub fn empty() -> Self {
        Self {
            template: None,
            size: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    id: PaletteId,
    items: Vec<PaletteItem>,
}

/// On-disk shape. `templates` is the older flat list and is still written so
/// tools that predate sized slots keep working.
#[derive(Debug, Serialize, Deserialize)]
struct PaletteFile {
    name: String,
    #[serde(default)]
    items: Vec<PaletteItem>,
    #[serde(default)]
    templates: Vec<Option<TemplateId>>,
}

impl Palette {
    pub fn new(id: PaletteId) -> Self {
        Self {
            id,
            items: Vec::new(),
        }
    }

    pub fn with_items(id: PaletteId, items: Vec<PaletteItem>) -> Self {
        Self { id, items }
    }

    pub fn id(&self) -> &PaletteId {
        &self.id
    }

    pub fn items(&self) -> &[PaletteItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn template(&self, index: usize) -> Option<&TemplateId> {
        self.items.get(index)?.template.as_ref()
    }

    pub fn index_of(&self, template: &TemplateId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.template.as_ref() == Some(template))
    }

    pub fn push(&mut self, template: TemplateId, size: Vec3) -> usize {
        self.items.push(PaletteItem::new(template, size));
        self.items.len() - 1
    }

    pub fn push_empty(&mut self) -> usize {
        self.items.push(PaletteItem::empty());
        self.items.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<PaletteItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn set_template(&mut self, index: usize, template: Option<TemplateId>) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        if item.template != template {
            item.template = template;
            item.size = Vec3::ZERO;
        }
        true
    }

    pub fn set_size(&mut self, index: usize, size: Vec3) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.size = size;
        true
    }

    /// Drops empty slots and returns how many were removed.
    pub fn remove_empty(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.template.is_some());
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Footprint of a slot, estimating and caching it when unset.
    ///
    /// Empty or out-of-range slots resolve to zero. Templates without render
    /// geometry resolve to a unit cube.
    pub fn resolve_size<H: SceneObjects + ?Sized>(&mut self, index: usize, host: &H) -> Vec3 {
        let Some(item) = self.items.get_mut(index) else {
            return Vec3::ZERO;
        };
        let Some(template) = item.template.as_ref() else {
            return Vec3::ZERO;
        };
        if item.size == Vec3::ZERO {
            item.size = host
                .template_local_bounds(template)
                .map(|bounds| bounds.size())
                .unwrap_or(Vec3::ONE);
            log::debug!("estimated footprint of `{template}` as {}", item.size);
        }
        item.size
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: PaletteFile = serde_json::from_str(json).context("invalid palette JSON")?;
        let items = if file.items.is_empty() {
            file.templates
                .into_iter()
                .map(|template| PaletteItem {
                    template,
                    size: Vec3::ZERO,
                })
                .collect()
        } else {
            file.items
        };
        Ok(Self {
            id: PaletteId::new(file.name),
            items,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let file = PaletteFile {
            name: self.id.as_str().to_string(),
            items: self.items.clone(),
            templates: self.items.iter().map(|item| item.template.clone()).collect(),
        };
        serde_json::to_string_pretty(&file).context("failed to encode palette")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("unable to read palette {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("unable to load palette {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("unable to write palette {}", path.display()))
    }
}

/// Quick-switch list of palettes with one optionally active entry.
#[derive(Debug, Clone, Default)]
pub struct PaletteSet {
    palettes: Vec<Palette>,
    active: Option<usize>,
}

impl PaletteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    pub fn add(&mut self, palette: Palette) -> usize {
        self.palettes.push(palette);
        self.palettes.len() - 1
    }

    pub fn names(&self) -> Vec<&str> {
        self.palettes.iter().map(|p| p.id().as_str()).collect()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Palette> {
        self.palettes.get(self.active?)
    }

    pub fn active_mut(&mut self) -> Option<&mut Palette> {
        self.palettes.get_mut(self.active?)
    }

    pub fn activate(&mut self, index: usize) -> Option<&Palette> {
        if index >= self.palettes.len() {
            return None;
        }
        self.active = Some(index);
        self.palettes.get(index)
    }

    /// Removes the active palette and moves the selection to the previous one.
    pub fn remove_active(&mut self) -> Option<Palette> {
        let index = self.active?;
        let removed = self.palettes.remove(index);
        self.active = index
            .checked_sub(1)
            .filter(|previous| *previous < self.palettes.len());
        Some(removed)
    }
}
