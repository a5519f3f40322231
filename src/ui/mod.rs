pub mod controls;

pub use controls::{
    ButtonControl, ButtonIcon, ControlFactory, DefaultControlFactory, Display, PluginControl,
    TextInputControl,
};
