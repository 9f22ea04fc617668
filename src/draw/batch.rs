use crate::draw::style::{StyleKey, StyleMap, StyleValue, format_number, quote};
use crate::draw::transport::SurfaceTransport;
use crate::foundation::error::LiveCanvasResult;

/// Shape-drawing call understood by the remote surface.
///
/// Each variant is emitted as `draw_<name>(<ctx>, ...)` with its arguments in the documented
/// order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "fn", rename_all = "snake_case")]
pub enum Primitive {
    /// `x, y, radiusX, radiusY, rotation, startAngle, endAngle, counterclockwise`
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    },
    /// `image_name, x, y, w, h, filter_str`
    Image {
        image_name: String,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        filter: String,
    },
    /// `x1, y1, x2, y2`
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// `x, y, width, height, radii`
    RoundRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radii: [f64; 4],
    },
    /// `x, y, text_str`
    Text { x: f64, y: f64, text: String },
}

impl Primitive {
    /// Surface function suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ellipse { .. } => "ellipse",
            Self::Image { .. } => "image",
            Self::Line { .. } => "line",
            Self::RoundRect { .. } => "roundRect",
            Self::Text { .. } => "text",
        }
    }

    fn args(&self) -> Vec<String> {
        let n = |v: &f64| format_number(*v);
        match self {
            Self::Ellipse {
                x,
                y,
                radius_x,
                radius_y,
                rotation,
                start_angle,
                end_angle,
                counterclockwise,
            } => vec![
                n(x),
                n(y),
                n(radius_x),
                n(radius_y),
                n(rotation),
                n(start_angle),
                n(end_angle),
                counterclockwise.to_string(),
            ],
            Self::Image {
                image_name,
                x,
                y,
                w,
                h,
                filter,
            } => vec![image_name.clone(), n(x), n(y), n(w), n(h), quote(filter)],
            Self::Line { x1, y1, x2, y2 } => vec![n(x1), n(y1), n(x2), n(y2)],
            Self::RoundRect {
                x,
                y,
                width,
                height,
                radii,
            } => {
                let radii = radii.iter().map(n).collect::<Vec<_>>().join(",");
                vec![n(x), n(y), n(width), n(height), format!("[{radii}]")]
            }
            Self::Text { x, y, text } => vec![n(x), n(y), quote(text)],
        }
    }
}

/// One accumulated operation.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Save,
    Restore,
    Clear,
    SetStyle {
        key: StyleKey,
        value: StyleValue,
    },
    Draw(Primitive),
    CreateImage {
        name: String,
        src: String,
    },
    RadialGradient {
        name: String,
        from: [f64; 3],
        to: [f64; 3],
        stops: Vec<(f64, String)>,
    },
}

impl DrawOp {
    fn encode_into(&self, ctx: &str, out: &mut Vec<String>) {
        match self {
            Self::Save => out.push(format!("{ctx}.save();")),
            Self::Restore => out.push(format!("{ctx}.restore();")),
            Self::Clear => out.push(format!("clear({ctx});")),
            Self::SetStyle { key, value } => {
                out.push(format!("{ctx}.{key} = {};", value.encode()));
            }
            Self::Draw(prim) => {
                let mut args = vec![ctx.to_string()];
                args.extend(prim.args());
                out.push(format!("draw_{}({});", prim.name(), args.join(",")));
            }
            Self::CreateImage { name, src } => {
                out.push(format!("{name} = new Image(100, 100);"));
                out.push(format!("{name}.src = {};", quote(src)));
            }
            Self::RadialGradient {
                name,
                from,
                to,
                stops,
            } => {
                let coords = from
                    .iter()
                    .chain(to.iter())
                    .map(|v| format_number(*v))
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push(format!("{name} = {ctx}.createRadialGradient({coords});"));
                for (offset, color) in stops {
                    out.push(format!(
                        "{name}.addColorStop({}, {});",
                        format_number(*offset),
                        quote(color)
                    ));
                }
            }
        }
    }
}

/// Ordered drawing operations for one frame, flipped atomically to the display surface.
///
/// Operations target the *working* surface; the final flip copies it onto the *display*
/// surface, so viewers never observe a partially drawn frame.
#[derive(Clone, Debug)]
pub struct CommandBatch {
    working: String,
    display: String,
    ops: Vec<DrawOp>,
    style: StyleMap,
    saved: Vec<StyleMap>,
}

impl CommandBatch {
    pub fn new(working: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            working: working.into(),
            display: display.into(),
            ops: Vec::new(),
            style: StyleMap::new(),
            saved: Vec::new(),
        }
    }

    pub fn working(&self) -> &str {
        &self.working
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Push the drawing state.
    pub fn save(&mut self) {
        self.saved.push(self.style.clone());
        self.ops.push(DrawOp::Save);
    }

    /// Pop the drawing state. An unbalanced restore leaves the tracked style as is.
    pub fn restore(&mut self) {
        if let Some(prev) = self.saved.pop() {
            self.style = prev;
        }
        self.ops.push(DrawOp::Restore);
    }

    /// Assign a validated style attribute.
    pub fn apply_style(&mut self, key: StyleKey, value: StyleValue) {
        self.style.insert(key, value.clone());
        self.ops.push(DrawOp::SetStyle { key, value });
    }

    /// Assign a style attribute by context property name.
    ///
    /// Names ending in `Obj` assign an object reference. Unknown names are rejected with
    /// [`LiveCanvasError::MalformedStyleKey`](crate::LiveCanvasError::MalformedStyleKey) and
    /// nothing is emitted.
    pub fn set_style(&mut self, name: &str, value: impl Into<StyleValue>) -> LiveCanvasResult<()> {
        let (key, by_ref) = StyleKey::parse(name)?;
        let value = match (by_ref, value.into()) {
            (true, StyleValue::Text(obj)) => StyleValue::object(obj),
            (_, v) => v,
        };
        self.apply_style(key, value);
        Ok(())
    }

    /// Style value currently in effect for `key`.
    pub fn style(&self, key: StyleKey) -> Option<&StyleValue> {
        self.style.get(&key)
    }

    /// Emit `prim` inside its own save/restore scope with `overrides` applied first.
    pub fn draw(&mut self, prim: Primitive, overrides: &StyleMap) {
        self.save();
        for (key, value) in overrides {
            self.apply_style(*key, value.clone());
        }
        self.ops.push(DrawOp::Draw(prim));
        self.restore();
    }

    /// Clear the working surface.
    pub fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    /// Declare a surface-side image `name` loaded from `src`.
    pub fn create_image(&mut self, name: impl Into<String>, src: impl Into<String>) {
        self.ops.push(DrawOp::CreateImage {
            name: name.into(),
            src: src.into(),
        });
    }

    /// Declare a radial gradient usable through [`StyleValue::object`].
    pub fn radial_gradient(
        &mut self,
        name: impl Into<String>,
        from: [f64; 3],
        to: [f64; 3],
        stops: Vec<(f64, String)>,
    ) {
        self.ops.push(DrawOp::RadialGradient {
            name: name.into(),
            from,
            to,
            stops,
        });
    }

    /// Drop every accumulated operation and tracked style.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
        self.style.clear();
        self.saved.clear();
    }

    /// Script for the accumulated operations, terminated by the buffer flip.
    pub fn encode(&self) -> String {
        let mut lines = Vec::with_capacity(self.ops.len() + 1);
        for op in &self.ops {
            op.encode_into(&self.working, &mut lines);
        }
        lines.push(format!("flip({}.canvas, {});", self.working, self.display));
        lines.join("\n")
    }

    /// Send the frame as one payload; with `clear`, start the next frame empty.
    pub fn render(&mut self, transport: &mut dyn SurfaceTransport, clear: bool) -> LiveCanvasResult<()> {
        let payload = self.encode();
        tracing::trace!(ops = self.ops.len(), bytes = payload.len(), "flip");
        transport.submit(&payload)?;
        if clear {
            self.clear_ops();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/batch.rs"]
mod tests;
