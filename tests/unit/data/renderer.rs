use super::*;

struct Bare;

impl LayerRenderer for Bare {
    fn name(&self) -> &str {
        "bare"
    }

    fn subscriptions(&self) -> &[String] {
        &[]
    }

    fn render(
        &mut self,
        _scene: &mut Scene,
        _parent: NodeId,
        _view: &Dataset,
        _options: &OptionValues,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn option_values_parse_untagged_json() {
    let values: OptionValues =
        serde_json::from_str(r#"{"labels": true, "opacity": 0.5, "mode": "heat"}"#).unwrap();
    assert!(values.flag("labels"));
    assert!(!values.flag("opacity"));
    assert!(!values.flag("missing"));
    assert_eq!(values.get("opacity"), Some(&OptionValue::Number(0.5)));
    assert_eq!(values.get("mode"), Some(&OptionValue::Text("heat".to_string())));
    assert_eq!(values.len(), 3);
}

#[test]
fn flag_option_defaults() {
    let opt = RendererOption::flag("labels", "Show labels", false);
    assert_eq!(opt.default, OptionValue::Bool(false));
    let values: OptionValues = [(opt.id.clone(), opt.default.clone())].into_iter().collect();
    assert!(!values.flag("labels"));
}

#[test]
fn default_hooks_are_no_ops() {
    let mut r = Bare;
    let mut scene = Scene::new(crate::scene::node::RenderObject::rect("root", 0.0, 0.0, 1.0, 1.0));
    let root = scene.root();
    assert!(r.options().is_empty());
    r.layer_init(&mut scene, root, &Dataset::new()).unwrap();
    r.on_data_changed(&Dataset::new()).unwrap();
    assert_eq!(r.tooltip(&Dataset::new(), Some("x")).unwrap(), "");
    assert_eq!(scene.len(), 1);
}
