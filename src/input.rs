use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::Ray;

/// Phase of a pointer interaction over the scene view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Drag,
    Up,
    /// Hover without a pressed button.
    Move,
}

impl PointerPhase {
    pub fn from_name(name: &str) -> Option<Self> {
        let phase = match name.to_ascii_lowercase().as_str() {
            "down" | "press" => Self::Down,
            "drag" => Self::Drag,
            "up" | "release" => Self::Up,
            "move" | "hover" => Self::Move,
            _ => return None,
        };
        Some(phase)
    }
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn is_primary(self) -> bool {
        self == Self::LEFT
    }

    /// Accepts `left`/`right`/`middle` and the one-based `mouseN` form.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" => return Some(Self::LEFT),
            "right" => return Some(Self::RIGHT),
            "middle" => return Some(Self::MIDDLE),
            _ => {}
        }
        if name.len() < 5 || !name.is_char_boundary(5) {
            return None;
        }
        if !name[..5].eq_ignore_ascii_case("mouse") {
            return None;
        }
        let suffix = &name[5..];
        if suffix.is_empty() {
            return Some(Self::LEFT);
        }
        let index = suffix.parse::<u8>().ok()?;
        Some(Self::new(index.saturating_sub(1)))
    }
}

impl Default for MouseButton {
    fn default() -> Self {
        Self::LEFT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        alt: false,
        shift: false,
        ctrl: false,
    };

    /// Parses a `+`, `,` or space separated list such as `alt+shift`.
    pub fn from_names(names: &str) -> Self {
        let mut modifiers = Self::NONE;
        for name in names
            .split(|c: char| c == '+' || c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
        {
            match name.to_ascii_lowercase().as_str() {
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                other => log::warn!("ignoring unknown modifier `{other}`"),
            }
        }
        modifiers
    }
}

/// Pointer input already converted to a world-space ray by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub button: MouseButton,
    pub ray: Ray,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, ray: Ray) -> Self {
        Self {
            phase,
            button: MouseButton::LEFT,
            ray,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn down(ray: Ray) -> Self {
        Self::new(PointerPhase::Down, ray)
    }

    pub fn drag(ray: Ray) -> Self {
        Self::new(PointerPhase::Drag, ray)
    }

    pub fn up(ray: Ray) -> Self {
        Self::new(PointerPhase::Up, ray)
    }

    pub fn moved(ray: Ray) -> Self {
        Self::new(PointerPhase::Move, ray)
    }

    /// Straight-down ray from `height` above the given ground point.
    pub fn looking_down(phase: PointerPhase, ground: Vec3, height: f32) -> Self {
        Self::new(
            phase,
            Ray::new(ground + Vec3::Y * height, Vec3::NEG_Y),
        )
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}
