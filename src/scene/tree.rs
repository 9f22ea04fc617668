use std::collections::BTreeSet;
use std::fmt;

use crate::draw::batch::CommandBatch;
use crate::draw::style::{StyleKey, StyleMap, StyleValue};
use crate::foundation::core::{Coords, Seconds};
use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};
use crate::motion::bounce::PlacementFrame;
use crate::scene::node::RenderObject;

/// Handle to a node in a [`Scene`].
///
/// Handles carry a generation, so a handle to a removed node never aliases the node that
/// later reuses its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Entry {
    object: RenderObject,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Per-session scene: an arena of render objects rooted at a single node.
///
/// The arena owns every node; topology is stored as parent handles and ordered child
/// lists. Nodes only enter the tree by value through [`Scene::add_child`], so no node can
/// become its own ancestor or gain a second parent.
#[derive(Debug)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
    hidden_layers: BTreeSet<String>,
}

impl Scene {
    pub fn new(root: RenderObject) -> Self {
        let mut scene = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            live: 0,
            hidden_layers: BTreeSet::new(),
        };
        scene.root = scene.alloc(root, None);
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_ok()
    }

    pub fn get(&self, id: NodeId) -> LiveCanvasResult<&RenderObject> {
        self.entry(id).map(|e| &e.object)
    }

    pub fn get_mut(&mut self, id: NodeId) -> LiveCanvasResult<&mut RenderObject> {
        self.entry_mut(id).map(|e| &mut e.object)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).ok().and_then(|e| e.parent)
    }

    /// Children of `id` in insertion order; empty for unknown handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.get(*c).is_ok_and(|o| o.name == name))
    }

    /// Insert `object` under `parent`, keyed by its name.
    ///
    /// A sibling with the same name is replaced together with its subtree; the new node takes
    /// over its position in the drawing order.
    pub fn add_child(&mut self, parent: NodeId, object: RenderObject) -> LiveCanvasResult<NodeId> {
        self.entry(parent)?;
        let replaced = self.child_named(parent, &object.name);
        let id = self.alloc(object, Some(parent));
        let entry = self.entry_mut(parent)?;
        match replaced.and_then(|old| entry.children.iter().position(|c| *c == old)) {
            Some(pos) => entry.children[pos] = id,
            None => entry.children.push(id),
        }
        if let Some(old) = replaced {
            tracing::trace!(node = %old, "replaced sibling with same name");
            self.release(old);
        }
        Ok(id)
    }

    /// Detach and drop the child named `name` and its subtree.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> LiveCanvasResult<bool> {
        let Some(id) = self.child_named(parent, name) else {
            return Ok(false);
        };
        self.entry_mut(parent)?.children.retain(|c| *c != id);
        self.release(id);
        Ok(true)
    }

    /// Detach and drop every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) -> LiveCanvasResult<()> {
        let children = std::mem::take(&mut self.entry_mut(parent)?.children);
        for c in children {
            self.release(c);
        }
        Ok(())
    }

    /// Set the scale of `id` and every descendant to `factor`.
    pub fn set_scale(&mut self, id: NodeId, factor: f64) -> LiveCanvasResult<()> {
        self.entry(id)?;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let entry = self.entry_mut(n)?;
            entry.object.props.scale = factor;
            stack.extend(entry.children.iter().copied());
        }
        Ok(())
    }

    /// Record whether `layer` is hidden as a whole, returning `true` when that changed.
    pub(crate) fn set_layer_hidden(&mut self, layer: &str, hidden: bool) -> bool {
        if hidden {
            self.hidden_layers.insert(layer.to_string())
        } else {
            self.hidden_layers.remove(layer)
        }
    }

    /// Handles of `id` and all of its descendants, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Surface position of `id` at `t` without running decision handlers.
    ///
    /// A root places its local position as-is; every other node contributes its scaled local
    /// position on top of its parent's surface position.
    pub fn resolve_position(&self, id: NodeId, t: Seconds) -> LiveCanvasResult<Coords> {
        let mut chain = vec![id];
        let mut cursor = self.entry(id)?.parent;
        while let Some(p) = cursor {
            chain.push(p);
            cursor = self.entry(p)?.parent;
        }

        let mut pos: Option<Coords> = None;
        for n in chain.into_iter().rev() {
            let obj = &self.entry(n)?.object;
            let local = obj.flight.local_position(t);
            pos = Some(match pos {
                Some(parent) => local.scaled(obj.props.scale).offset_by(&parent),
                None => local,
            });
        }
        pos.ok_or_else(|| LiveCanvasError::UnknownNode(id.to_string()))
    }

    /// Surface position of `id` at `t`, after letting its decision handlers adjust the plan.
    pub fn position_at(&mut self, id: NodeId, t: Seconds) -> LiveCanvasResult<Coords> {
        let entry = self.entry(id)?;
        if !entry.object.flight.handlers().is_empty() {
            let name = entry.object.name.clone();
            let scale = entry.object.props.scale;
            let parent_offset = match entry.parent {
                Some(p) => Some(self.resolve_position(p, t)?),
                None => None,
            };
            let frame = PlacementFrame {
                node: &name,
                scale,
                parent_offset,
            };
            self.entry_mut(id)?.object.flight.decide(&frame, t);
        }
        self.resolve_position(id, t)
    }

    /// Emit the whole visible scene into `batch`.
    #[tracing::instrument(level = "trace", skip(self, batch))]
    pub fn render(&mut self, batch: &mut CommandBatch, t: Seconds) -> LiveCanvasResult<()> {
        self.render_node(self.root, batch, t)
    }

    /// Emit `id` and its subtree into `batch`.
    ///
    /// The node's style scopes its children, which draw in insertion order before the node
    /// itself. Invisible nodes emit nothing, descendants included.
    pub fn render_node(
        &mut self,
        id: NodeId,
        batch: &mut CommandBatch,
        t: Seconds,
    ) -> LiveCanvasResult<()> {
        let entry = self.entry(id)?;
        if !entry.object.props.visible {
            return Ok(());
        }
        let style = entry.object.props.style.clone();
        let children = entry.children.clone();

        batch.save();
        for (key, value) in style {
            batch.apply_style(key, value);
        }
        for child in children {
            self.render_node(child, batch, t)?;
        }

        let pos = self.position_at(id, t)?;
        let obj = &self.entry(id)?.object;
        if let Some(prim) = obj.shape.primitive(&pos, obj.props.scale) {
            let glow = obj.props.glow;
            if glow.enabled {
                let color = glow.color_for(obj.props.style.get(&StyleKey::StrokeStyle));
                for width in 1..glow.width {
                    let mut overrides = StyleMap::new();
                    overrides.insert(StyleKey::LineWidth, StyleValue::Number(f64::from(width)));
                    overrides.insert(StyleKey::StrokeStyle, StyleValue::from(color));
                    batch.draw(prim.clone(), &overrides);
                }
            }
            batch.draw(prim, &StyleMap::new());
        }
        batch.restore();
        Ok(())
    }

    /// Hit-test path for the surface point `(x, y)` at `t`, outermost first.
    ///
    /// A node is on the path when it is clickable and its own geometry contains the point;
    /// children are searched topmost first and only the first matching child branch is
    /// followed. Shapes without hit geometry, and nodes whose own geometry misses, still let
    /// their children match. Invisible nodes hide their whole subtree.
    pub fn point_in_object(&self, x: f64, y: f64, t: Seconds) -> Vec<NodeId> {
        let mut path = Vec::new();
        self.hit_into(self.root, x, y, t, &mut path);
        path
    }

    fn hit_into(&self, id: NodeId, x: f64, y: f64, t: Seconds, path: &mut Vec<NodeId>) -> bool {
        let Ok(entry) = self.entry(id) else {
            return false;
        };
        let obj = &entry.object;
        if !obj.props.visible {
            return false;
        }
        let own = obj.props.clickable
            && self.resolve_position(id, t).is_ok_and(|pos| {
                obj.shape.contains(&pos, obj.props.scale, x, y) == Some(true)
            });

        let mark = path.len();
        if own {
            path.push(id);
        }
        for child in entry.children.iter().rev() {
            if self.hit_into(*child, x, y, t, path) {
                return true;
            }
        }
        path.truncate(mark + usize::from(own));
        own
    }

    /// Layer names and row of a hit-test path, for tooltip and property queries.
    pub fn selection(&self, path: &[NodeId]) -> HitSelection {
        let mut sel = HitSelection::default();
        for obj in path.iter().filter_map(|id| self.get(*id).ok()) {
            if let Some(layer) = &obj.props.layer {
                sel.layer_names.insert(layer.clone());
            }
            if let Some(row) = &obj.props.row_id {
                sel.row_id = Some(row.clone());
            }
        }
        sel
    }

    fn alloc(&mut self, object: RenderObject, parent: Option<NodeId>) -> NodeId {
        let entry = Entry {
            object,
            parent,
            children: Vec::new(),
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.entry = Some(entry);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Free `id` and its subtree. The caller detaches it from its parent.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(slot) = self.slots.get_mut(n.index as usize) else {
                continue;
            };
            if slot.generation != n.generation {
                continue;
            }
            if let Some(entry) = slot.entry.take() {
                self.live -= 1;
                self.free.push(n.index);
                stack.extend(entry.children);
            }
        }
    }

    fn entry(&self, id: NodeId) -> LiveCanvasResult<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
            .ok_or_else(|| LiveCanvasError::UnknownNode(id.to_string()))
    }

    fn entry_mut(&mut self, id: NodeId) -> LiveCanvasResult<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
            .ok_or_else(|| LiveCanvasError::UnknownNode(id.to_string()))
    }
}

/// What a hit-test path selects: every layer it touches and the innermost row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HitSelection {
    pub layer_names: BTreeSet<String>,
    pub row_id: Option<String>,
}

impl HitSelection {
    pub fn is_empty(&self) -> bool {
        self.layer_names.is_empty() && self.row_id.is_none()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/tree.rs"]
mod tests;
