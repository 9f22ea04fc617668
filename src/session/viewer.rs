use crate::control::controller::Controller;
use crate::data::renderer::OptionValues;
use crate::draw::batch::CommandBatch;
use crate::draw::style::{Rgba, StyleKey};
use crate::draw::transport::{Panel, SurfaceTransport};
use crate::foundation::core::Seconds;
use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};
use crate::scene::node::{RenderObject, Shape};
use crate::scene::tree::{HitSelection, NodeId, Scene};

/// Name under which the optional background image is declared on the surface.
pub const BACKGROUND_IMAGE: &str = "img_background";

/// Per-viewer surface settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Surface every frame is drawn into.
    pub working_surface: String,
    /// Surface the finished frame is flipped onto.
    pub display_surface: String,
    /// Fill used to clear the working surface before each frame.
    pub clear_style: String,
    /// Seconds the pointer must rest before a tooltip shows.
    pub tooltip_hover_delay: Seconds,
    /// Image drawn behind all layers, when set.
    pub background_image: Option<String>,
    /// CSS filter applied to the background image.
    pub background_filter: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            working_surface: "ctx_drawing".to_string(),
            display_surface: "ctx_display".to_string(),
            clear_style: "white".to_string(),
            tooltip_hover_delay: 0.5,
            background_image: None,
            background_filter: "opacity(0.2)".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> LiveCanvasResult<()> {
        if self.working_surface.trim().is_empty() || self.display_surface.trim().is_empty() {
            return Err(LiveCanvasError::config("surface names must be non-empty"));
        }
        if !self.tooltip_hover_delay.is_finite() || self.tooltip_hover_delay < 0.0 {
            return Err(LiveCanvasError::config(
                "tooltip_hover_delay must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

struct Stage {
    scene: Scene,
    layers: NodeId,
}

/// One connected drawing surface and the scene drawn onto it.
pub struct Viewer {
    name: String,
    config: ViewerConfig,
    transport: Box<dyn SurfaceTransport>,
    stage: Option<Stage>,
    options: OptionValues,
    selection: Option<HitSelection>,
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("name", &self.name)
            .field("ready", &self.stage.is_some())
            .field("options", &self.options)
            .field("selection", &self.selection)
            .finish()
    }
}

impl Viewer {
    pub fn new(
        name: impl Into<String>,
        config: ViewerConfig,
        transport: Box<dyn SurfaceTransport>,
    ) -> LiveCanvasResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            transport,
            stage: None,
            options: OptionValues::new(),
            selection: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ready(&self) -> bool {
        self.stage.is_some()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.stage.as_ref().map(|s| &s.scene)
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.stage.as_mut().map(|s| &mut s.scene)
    }

    /// Parent node of every renderer's nodes.
    pub fn layers(&self) -> Option<NodeId> {
        self.stage.as_ref().map(|s| s.layers)
    }

    pub fn options(&self) -> &OptionValues {
        &self.options
    }

    pub fn set_options(&mut self, values: OptionValues) {
        self.options = values;
    }

    /// Selection shown in the property panel.
    pub fn selection(&self) -> Option<&HitSelection> {
        self.selection.as_ref()
    }

    /// Build the scene once the surface is available.
    ///
    /// The root is a transparent, non-clickable rect covering the surface; renderers build
    /// under the `layers` node, which is the background image when one is configured.
    pub fn on_ready(&mut self, controller: &mut Controller) -> LiveCanvasResult<()> {
        let size = self.transport.surface_size()?;
        let root = RenderObject::rect("root", 0.0, 0.0, size.width, size.height)
            .without_fill()
            .with_style(StyleKey::StrokeStyle, Rgba::TRANSPARENT)
            .with_clickable(false);
        let mut scene = Scene::new(root);

        let mut layers = RenderObject::rect("layers", 0.0, 0.0, size.width, size.height)
            .without_fill()
            .with_style(StyleKey::StrokeStyle, Rgba::TRANSPARENT)
            .with_clickable(false);
        if let Some(src) = &self.config.background_image {
            let mut batch = self.batch();
            batch.create_image(BACKGROUND_IMAGE, src.clone());
            batch.render(self.transport.as_mut(), true)?;
            layers.shape = Shape::Image {
                image_name: Some(BACKGROUND_IMAGE.to_string()),
                width: size.width,
                height: size.height,
                filter: self.config.background_filter.clone(),
            };
        }
        let layers = scene.add_child(scene.root(), layers)?;

        let failures = controller.init_layers(&mut scene, layers);
        self.options = controller.default_option_values();
        self.stage = Some(Stage { scene, layers });
        tracing::info!(
            viewer = %self.name,
            width = size.width,
            height = size.height,
            failed_layers = failures.len(),
            "viewer ready"
        );
        Ok(())
    }

    /// Push layer properties, draw the scene into a fresh batch and flip it.
    ///
    /// Does nothing before [`Viewer::on_ready`].
    #[tracing::instrument(level = "trace", skip(self, controller), fields(viewer = %self.name))]
    pub fn refresh(&mut self, controller: &mut Controller, t: Seconds) -> LiveCanvasResult<()> {
        let mut batch = self.batch();
        let Some(stage) = self.stage.as_mut() else {
            return Ok(());
        };
        controller.render_layers(&mut stage.scene, stage.layers, &self.options);

        batch.set_style("fillStyle", self.config.clear_style.as_str())?;
        batch.clear();
        stage.scene.render(&mut batch, t)?;
        batch.render(self.transport.as_mut(), true)
    }

    /// Show or hide the hover tooltip, returning the text shown.
    pub fn check_hover(&mut self, controller: &Controller, t: Seconds) -> LiveCanvasResult<Option<String>> {
        let Some(stage) = self.stage.as_ref() else {
            return Ok(None);
        };
        let Some(pointer) = self.transport.pointer()? else {
            return Ok(None);
        };
        let at = pointer.page;
        if pointer.elapsed_ms < self.config.tooltip_hover_delay * 1000.0 {
            self.transport.present(Panel::Tooltip { at }, None)?;
            return Ok(None);
        }

        let path = stage
            .scene
            .point_in_object(pointer.world.x, pointer.world.y, t);
        let text = controller.tooltip_for(&stage.scene.selection(&path));
        if text.is_empty() {
            self.transport.present(Panel::Tooltip { at }, None)?;
            return Ok(None);
        }
        self.transport.present(Panel::Tooltip { at }, Some(&text))?;
        Ok(Some(text))
    }

    /// Primary-button release: select what lies under the pointer and show its properties.
    pub fn on_pointer_up(
        &mut self,
        controller: &Controller,
        button: u16,
        t: Seconds,
    ) -> LiveCanvasResult<()> {
        if button != 0 {
            return Ok(());
        }
        let Some(stage) = self.stage.as_ref() else {
            return Ok(());
        };
        let Some(pointer) = self.transport.pointer()? else {
            return Ok(());
        };
        let path = stage
            .scene
            .point_in_object(pointer.world.x, pointer.world.y, t);
        let selection = stage.scene.selection(&path);
        tracing::debug!(viewer = %self.name, ?selection, "selection changed");
        self.selection = Some(selection);
        self.refresh_properties(controller)
    }

    /// Re-query the property panel for the stored selection.
    pub fn refresh_properties(&mut self, controller: &Controller) -> LiveCanvasResult<()> {
        let Some(selection) = &self.selection else {
            return Ok(());
        };
        let text = controller.tooltip_for(selection);
        self.transport.present(Panel::Properties, Some(&text))
    }

    /// Show one freshness line per data source.
    pub fn refresh_status(&mut self, controller: &Controller, now: Seconds) -> LiveCanvasResult<()> {
        let lines = controller
            .source_status(now)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        self.transport.present(Panel::SourceStatus, Some(&lines))
    }

    fn batch(&self) -> CommandBatch {
        CommandBatch::new(
            self.config.working_surface.clone(),
            self.config.display_surface.clone(),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/viewer.rs"]
mod tests;
