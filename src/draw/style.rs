use std::collections::BTreeMap;
use std::fmt;

use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};

/// Drawing-state attributes the remote surface understands.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum StyleKey {
    FillStyle,
    StrokeStyle,
    LineWidth,
    Font,
    TextAlign,
    TextBaseline,
}

impl StyleKey {
    /// Every recognized key, in emission order.
    pub const ALL: [StyleKey; 6] = [
        StyleKey::FillStyle,
        StyleKey::StrokeStyle,
        StyleKey::LineWidth,
        StyleKey::Font,
        StyleKey::TextAlign,
        StyleKey::TextBaseline,
    ];

    /// Property name on the surface's drawing context.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FillStyle => "fillStyle",
            Self::StrokeStyle => "strokeStyle",
            Self::LineWidth => "lineWidth",
            Self::Font => "font",
            Self::TextAlign => "textAlign",
            Self::TextBaseline => "textBaseline",
        }
    }

    /// Parse a context property name; unknown names are a [`LiveCanvasError::MalformedStyleKey`].
    pub fn from_name(name: &str) -> LiveCanvasResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| LiveCanvasError::style_key(name))
    }

    /// Parse a name that may carry the `Obj` suffix.
    ///
    /// `fillStyleObj` addresses `fillStyle` with an object reference (gradient, pattern)
    /// instead of a literal; the returned flag reports that.
    pub fn parse(name: &str) -> LiveCanvasResult<(Self, bool)> {
        match name.strip_suffix("Obj") {
            Some(base) => Self::from_name(base)
                .map(|k| (k, true))
                .map_err(|_| LiveCanvasError::style_key(name)),
            None => Self::from_name(name).map(|k| (k, false)),
        }
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value assigned to a [`StyleKey`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// Numeric literal, emitted bare.
    Number(f64),
    /// String literal, emitted quoted.
    Text(String),
    /// Name of an object living on the surface (gradient), emitted bare.
    Ref(ObjectRef),
}

/// Name of a surface-side object such as a gradient.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "ref")]
    pub name: String,
}

impl StyleValue {
    /// Reference to the surface object `name`.
    pub fn object(name: impl Into<String>) -> Self {
        Self::Ref(ObjectRef { name: name.into() })
    }

    /// The literal text, when this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Script fragment for this value.
    pub fn encode(&self) -> String {
        match self {
            Self::Number(n) => format_number(*n),
            Self::Text(s) => quote(s),
            Self::Ref(r) => r.name.clone(),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Rgba> for StyleValue {
    fn from(c: Rgba) -> Self {
        Self::Text(c.to_string())
    }
}

/// Ordered style assignments.
pub type StyleMap = BTreeMap<StyleKey, StyleValue>;

/// Straight-alpha color in CSS `rgba(r, g, b, a)` form.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Decode `rgba(r, g, b, a)`. Anything else, including named colors, decodes to
    /// transparent black.
    pub fn decode(s: &str) -> Self {
        let Some(inner) = s
            .trim()
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Self::TRANSPARENT;
        };
        let parts: Result<Vec<f64>, _> = inner.split(',').map(|p| p.trim().parse()).collect();
        match parts.as_deref() {
            Ok([r, g, b, a]) => Self::new(*r, *g, *b, *a),
            _ => Self::TRANSPARENT,
        }
    }

    /// Multiply each channel, alpha included, by the matching factor.
    pub fn attenuate(self, factors: [f64; 4]) -> Self {
        Self {
            r: self.r * factors[0],
            g: self.g * factors[1],
            b: self.b * factors[2],
            a: self.a * factors[3],
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() {
        format!("{n}")
    } else {
        // the surface has no literal for these
        "0".to_string()
    }
}

pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
#[path = "../../tests/unit/draw/style.rs"]
mod tests;
