use std::f64::consts::TAU;

use crate::draw::batch::Primitive;
use crate::draw::style::{Rgba, StyleKey, StyleMap, StyleValue};
use crate::foundation::core::Coords;
use crate::foundation::error::LiveCanvasResult;
use crate::motion::flight::FlightPlan;

/// Geometry of a render object, relative to its computed position.
///
/// Sizes are multiplied by the node's scale when drawn and hit-tested.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Ellipse {
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    },
    Circle {
        radius: f64,
    },
    RoundRect {
        width: f64,
        height: f64,
        radii: [f64; 4],
    },
    Rect {
        width: f64,
        height: f64,
    },
    Image {
        image_name: Option<String>,
        width: f64,
        height: f64,
        filter: String,
    },
    /// Text carries no hit geometry; pair it with an invisible clickable rect.
    Text {
        text: String,
    },
    /// Segment from the position to `position + (dx, dy)`.
    Line {
        dx: f64,
        dy: f64,
    },
}

impl Shape {
    pub fn ellipse(radius_x: f64, radius_y: f64) -> Self {
        Self::Ellipse {
            radius_x,
            radius_y,
            rotation: 0.0,
            start_angle: 0.0,
            end_angle: TAU,
            counterclockwise: false,
        }
    }

    /// Primitive drawn for this shape at `pos`, `None` when there is nothing to draw.
    pub fn primitive(&self, pos: &Coords, scale: f64) -> Option<Primitive> {
        let (x, y) = (pos.x(), pos.y());
        let prim = match self {
            Self::Ellipse {
                radius_x,
                radius_y,
                rotation,
                start_angle,
                end_angle,
                counterclockwise,
            } => Primitive::Ellipse {
                x,
                y,
                radius_x: radius_x * scale,
                radius_y: radius_y * scale,
                rotation: *rotation,
                start_angle: *start_angle,
                end_angle: *end_angle,
                counterclockwise: *counterclockwise,
            },
            Self::Circle { radius } => Primitive::Ellipse {
                x,
                y,
                radius_x: radius * scale,
                radius_y: radius * scale,
                rotation: 0.0,
                start_angle: 0.0,
                end_angle: TAU,
                counterclockwise: false,
            },
            Self::RoundRect {
                width,
                height,
                radii,
            } => Primitive::RoundRect {
                x,
                y,
                width: width * scale,
                height: height * scale,
                radii: *radii,
            },
            Self::Rect { width, height } => Primitive::RoundRect {
                x,
                y,
                width: width * scale,
                height: height * scale,
                radii: [0.0; 4],
            },
            Self::Image {
                image_name,
                width,
                height,
                filter,
            } => Primitive::Image {
                image_name: image_name.clone()?,
                x,
                y,
                w: width * scale,
                h: height * scale,
                filter: filter.clone(),
            },
            Self::Text { text } => Primitive::Text {
                x,
                y,
                text: text.clone(),
            },
            Self::Line { dx, dy } => Primitive::Line {
                x1: x,
                y1: y,
                x2: x + dx * scale,
                y2: y + dy * scale,
            },
        };
        Some(prim)
    }

    /// Whether `(px, py)` lies inside the shape drawn at `pos`.
    ///
    /// `None` means the shape has no hit geometry of its own.
    pub fn contains(&self, pos: &Coords, scale: f64, px: f64, py: f64) -> Option<bool> {
        let (dx, dy) = (px - pos.x(), py - pos.y());
        match self {
            Self::Ellipse {
                radius_x, radius_y, ..
            } => Some(in_ellipse(dx, dy, radius_x * scale, radius_y * scale)),
            Self::Circle { radius } => Some(in_ellipse(dx, dy, radius * scale, radius * scale)),
            Self::RoundRect { width, height, .. }
            | Self::Rect { width, height }
            | Self::Image { width, height, .. } => {
                Some(dx >= 0.0 && dx < width * scale && dy >= 0.0 && dy < height * scale)
            }
            Self::Text { .. } | Self::Line { .. } => None,
        }
    }
}

/// Static plan for a node built from a bare position, started immediately.
fn placed(x: f64, y: f64) -> FlightPlan {
    let mut plan = FlightPlan::fixed(x, y);
    plan.start_forward(None);
    plan
}

fn in_ellipse(dx: f64, dy: f64, rx: f64, ry: f64) -> bool {
    let nx = dx / rx;
    let ny = dy / ry;
    nx * nx + ny * ny <= 1.0
}

/// Soft halo drawn as widening, faded strokes under the hard outline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlowSpec {
    pub enabled: bool,
    /// Per-channel multipliers (r, g, b, a) applied to the stroke color.
    pub attenuation: [f64; 4],
    /// Widest halo stroke; one stroke is emitted per unit width below it.
    pub width: u32,
}

impl Default for GlowSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            attenuation: [0.33, 0.33, 0.33, 0.03],
            width: 40,
        }
    }
}

impl GlowSpec {
    /// Halo stroke color for a given stroke style.
    pub fn color_for(&self, stroke: Option<&StyleValue>) -> Rgba {
        let base = stroke
            .and_then(StyleValue::as_text)
            .map(Rgba::decode)
            .unwrap_or(Rgba::TRANSPARENT);
        base.attenuate(self.attenuation)
    }
}

/// Typed property set of a render object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeProps {
    /// Drawing-state defaults applied while this node and its children draw.
    pub style: StyleMap,
    pub visible: bool,
    pub scale: f64,
    pub clickable: bool,
    pub glow: GlowSpec,
    /// Renderer layer that owns this node.
    pub layer: Option<String>,
    /// Dataset row the node represents.
    pub row_id: Option<String>,
}

impl Default for NodeProps {
    fn default() -> Self {
        let mut style = StyleMap::new();
        style.insert(StyleKey::FillStyle, StyleValue::from("white"));
        style.insert(StyleKey::StrokeStyle, StyleValue::from("black"));
        Self {
            style,
            visible: true,
            scale: 1.0,
            clickable: true,
            glow: GlowSpec::default(),
            layer: None,
            row_id: None,
        }
    }
}

/// A drawable scene node: name, properties, geometry and its own flight plan.
///
/// Topology (parent, children) lives in the [`Scene`](crate::Scene) that owns the object.
#[derive(Clone, Debug)]
pub struct RenderObject {
    pub name: String,
    pub props: NodeProps,
    pub shape: Shape,
    pub flight: FlightPlan,
}

impl RenderObject {
    pub fn new(name: impl Into<String>, shape: Shape, flight: FlightPlan) -> Self {
        Self {
            name: name.into(),
            props: NodeProps::default(),
            shape,
            flight,
        }
    }

    pub fn circle(name: impl Into<String>, x: f64, y: f64, radius: f64) -> Self {
        Self::new(name, Shape::Circle { radius }, placed(x, y))
    }

    pub fn ellipse(name: impl Into<String>, x: f64, y: f64, rx: f64, ry: f64) -> Self {
        Self::new(name, Shape::ellipse(rx, ry), placed(x, y))
    }

    pub fn rect(name: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(name, Shape::Rect { width, height }, placed(x, y))
    }

    pub fn round_rect(
        name: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radii: [f64; 4],
    ) -> Self {
        Self::new(
            name,
            Shape::RoundRect {
                width,
                height,
                radii,
            },
            placed(x, y),
        )
    }

    pub fn image(
        name: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_name: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Shape::Image {
                image_name: Some(image_name.into()),
                width,
                height,
                filter: String::new(),
            },
            placed(x, y),
        )
    }

    pub fn text(name: impl Into<String>, x: f64, y: f64, text: impl Into<String>) -> Self {
        Self::new(
            name,
            Shape::Text { text: text.into() },
            placed(x, y),
        )
    }

    pub fn line(name: impl Into<String>, x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self::new(name, Shape::Line { dx, dy }, placed(x, y))
    }

    pub fn with_flight(mut self, flight: FlightPlan) -> Self {
        self.flight = flight;
        self
    }

    pub fn with_style(mut self, key: StyleKey, value: impl Into<StyleValue>) -> Self {
        self.props.style.insert(key, value.into());
        self
    }

    /// Replace the fill with transparent black, for hit-only or outline-only nodes.
    pub fn without_fill(self) -> Self {
        self.with_style(StyleKey::FillStyle, Rgba::TRANSPARENT)
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.props.visible = visible;
        self
    }

    pub fn with_clickable(mut self, clickable: bool) -> Self {
        self.props.clickable = clickable;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.props.scale = scale;
        self
    }

    pub fn with_glow(mut self, glow: GlowSpec) -> Self {
        self.props.glow = glow;
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.props.layer = Some(layer.into());
        self
    }

    pub fn with_row(mut self, row_id: impl Into<String>) -> Self {
        self.props.row_id = Some(row_id.into());
        self
    }

    /// Set a style attribute by context property name, rejecting unknown names.
    pub fn set_style(&mut self, name: &str, value: impl Into<StyleValue>) -> LiveCanvasResult<()> {
        let (key, by_ref) = StyleKey::parse(name)?;
        let value = match (by_ref, value.into()) {
            (true, StyleValue::Text(obj)) => StyleValue::object(obj),
            (_, v) => v,
        };
        self.props.style.insert(key, value);
        Ok(())
    }

    /// Update the radius of a circle; other shapes are left unchanged.
    pub fn set_radius(&mut self, r: f64) {
        if let Shape::Circle { radius } = &mut self.shape {
            *radius = r;
        }
    }

    /// Update the string of a text node; other shapes are left unchanged.
    pub fn set_text(&mut self, s: impl Into<String>) {
        if let Shape::Text { text } = &mut self.shape {
            *text = s.into();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/node.rs"]
mod tests;
