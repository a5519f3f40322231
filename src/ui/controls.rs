//! Plugin control surface
//!
//! The control is a toggle button plus a query input inside a container.
//! Controls are plain state; the host UI reads them to draw and reports
//! interactions back as `ControlEvent`s. Construction goes through a
//! `ControlFactory` so embedders can swap labels, classes or ids.

use serde::{Deserialize, Serialize};

pub const BUTTON_CLASS: &str = "mapboxgl-ctrl-icon";
pub const PLUGIN_ICON_CLASS: &str = "mapboxgl-ctrl-overpass";
pub const MAP_ICON_CLASS: &str = "mapboxgl-ctrl-map";
pub const CONTAINER_CLASS: &str = "mapboxgl-ctrl mapboxgl-ctrl-group";

/// CSS-like display state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Display {
    Inline,
    Block,
    None,
}

/// Which icon the toggle button shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonIcon {
    /// Plugin is off: clicking opens it
    Plugin,
    /// Plugin is on: clicking goes back to the plain map
    Map,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonControl {
    pub aria_label: String,
    pub icon: ButtonIcon,
}

impl ButtonControl {
    pub fn new(aria_label: impl Into<String>) -> Self {
        Self {
            aria_label: aria_label.into(),
            icon: ButtonIcon::Plugin,
        }
    }

    pub fn class_name(&self) -> String {
        let icon = match self.icon {
            ButtonIcon::Plugin => PLUGIN_ICON_CLASS,
            ButtonIcon::Map => MAP_ICON_CLASS,
        };
        format!("{} {}", BUTTON_CLASS, icon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInputControl {
    pub id: String,
    pub placeholder: String,
    pub value: String,
    pub display: Display,
}

impl TextInputControl {
    pub fn new(id: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            placeholder: placeholder.into(),
            value: String::new(),
            display: Display::None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.display != Display::None
    }
}

/// Button and input grouped in one container, the element returned by `on_add`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginControl {
    pub class_name: String,
    pub display: Display,
    pub button: ButtonControl,
    pub input: TextInputControl,
}

impl PluginControl {
    pub fn set_plugin_icon(&mut self) {
        self.button.icon = ButtonIcon::Plugin;
    }

    pub fn set_map_icon(&mut self) {
        self.button.icon = ButtonIcon::Map;
    }

    pub fn show_input(&mut self, visible: bool) {
        self.input.display = if visible { Display::Inline } else { Display::None };
    }

    pub fn is_visible(&self) -> bool {
        self.display != Display::None
    }
}

/// Builds the control's UI elements
pub trait ControlFactory: Send + Sync {
    fn button(&self) -> ButtonControl;

    fn text_input(&self) -> TextInputControl;

    fn container(&self, button: ButtonControl, input: TextInputControl, show: bool) -> PluginControl {
        PluginControl {
            class_name: CONTAINER_CLASS.to_string(),
            display: if show { Display::Block } else { Display::None },
            button,
            input,
        }
    }

    fn plugin_control(&self, show: bool) -> PluginControl {
        self.container(self.button(), self.text_input(), show)
    }
}

/// Stock button labelled "Inspect" and an `overpass` input with a QL placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultControlFactory;

impl ControlFactory for DefaultControlFactory {
    fn button(&self) -> ButtonControl {
        ButtonControl::new("Inspect")
    }

    fn text_input(&self) -> TextInputControl {
        TextInputControl::new("overpass", "Overpass QL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_control() {
        let control = DefaultControlFactory.plugin_control(true);
        assert_eq!(control.class_name, CONTAINER_CLASS);
        assert!(control.is_visible());
        assert_eq!(control.button.aria_label, "Inspect");
        assert_eq!(
            control.button.class_name(),
            "mapboxgl-ctrl-icon mapboxgl-ctrl-overpass"
        );
        assert_eq!(control.input.id, "overpass");
        assert_eq!(control.input.placeholder, "Overpass QL");
        assert!(!control.input.is_visible());
    }

    #[test]
    fn test_hidden_container() {
        let control = DefaultControlFactory.plugin_control(false);
        assert_eq!(control.display, Display::None);
    }

    #[test]
    fn test_icon_and_input_state() {
        let mut control = DefaultControlFactory.plugin_control(true);
        control.set_map_icon();
        control.show_input(true);
        assert_eq!(
            control.button.class_name(),
            "mapboxgl-ctrl-icon mapboxgl-ctrl-map"
        );
        assert_eq!(control.input.display, Display::Inline);

        control.set_plugin_icon();
        control.show_input(false);
        assert_eq!(control.button.icon, ButtonIcon::Plugin);
        assert!(!control.input.is_visible());
    }

    struct Labelled;

    impl ControlFactory for Labelled {
        fn button(&self) -> ButtonControl {
            ButtonControl::new("Query OSM")
        }

        fn text_input(&self) -> TextInputControl {
            TextInputControl::new("osm-query", "node({{bbox}});out;")
        }
    }

    #[test]
    fn test_custom_factory() {
        let control = Labelled.plugin_control(true);
        assert_eq!(control.button.aria_label, "Query OSM");
        assert_eq!(control.input.id, "osm-query");
    }
}
