use std::collections::BTreeMap;

use crate::data::dataset::Dataset;
use crate::scene::tree::{NodeId, Scene};

/// Value of a renderer option.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One user-selectable option a renderer declares.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RendererOption {
    /// Identifier shared across renderers; the first declaration wins.
    pub id: String,
    /// Human-readable label.
    pub text: String,
    pub default: OptionValue,
}

impl RendererOption {
    pub fn flag(id: impl Into<String>, text: impl Into<String>, default: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            default: OptionValue::Bool(default),
        }
    }
}

/// Current option selections of one viewer.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OptionValues(BTreeMap<String, OptionValue>);

impl OptionValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&OptionValue> {
        self.0.get(id)
    }

    pub fn set(&mut self, id: impl Into<String>, value: OptionValue) {
        self.0.insert(id.into(), value);
    }

    /// Boolean option, `false` when unset or not a flag.
    pub fn flag(&self, id: &str) -> bool {
        matches!(self.0.get(id), Some(OptionValue::Bool(true)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, OptionValue)> for OptionValues {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A named visual consumer of one or more data sources.
///
/// The controller keeps each renderer's merged view and hands it back on every call;
/// renderers only derive visual state from it. Errors are isolated per renderer.
pub trait LayerRenderer: Send {
    /// Unique renderer name, also used as the layer name of the nodes it owns.
    fn name(&self) -> &str;

    /// Subscribed source names, in merge order.
    fn subscriptions(&self) -> &[String];

    /// Options this renderer understands.
    fn options(&self) -> Vec<RendererOption> {
        Vec::new()
    }

    /// Build the renderer's nodes under `parent` when a viewer becomes ready.
    fn layer_init(
        &mut self,
        _scene: &mut Scene,
        _parent: NodeId,
        _view: &Dataset,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Recompute derived state after the merged view changed.
    fn on_data_changed(&mut self, _view: &Dataset) -> anyhow::Result<()> {
        Ok(())
    }

    /// Push the latest visual properties onto the nodes under `parent`.
    fn render(
        &mut self,
        scene: &mut Scene,
        parent: NodeId,
        view: &Dataset,
        options: &OptionValues,
    ) -> anyhow::Result<()>;

    /// Tooltip or property text for a selected row.
    fn tooltip(&self, _view: &Dataset, _row_id: Option<&str>) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/data/renderer.rs"]
mod tests;
