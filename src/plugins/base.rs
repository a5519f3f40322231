use crate::{
    core::map::SharedHost,
    input::events::{ControlEvent, MapEvent, MapEventKind},
    ui::controls::PluginControl,
    Result,
};

/// Contract between the host map and a control added to it
pub trait ControlTrait: Send {
    fn name(&self) -> &str;

    /// Events the control wants delivered while attached
    fn subscriptions(&self) -> &[MapEventKind] {
        &[]
    }

    /// Attaches the control and returns the element the host should mount
    fn on_add(&mut self, map: SharedHost) -> Result<PluginControl>;

    /// Detaches the control from its host
    fn on_remove(&mut self) -> Result<()>;

    /// Handles an event the control subscribed to
    fn handle_event(&mut self, _event: &MapEvent) -> Result<()> {
        Ok(())
    }

    /// Handles interaction with the control's own UI
    fn handle_control_event(&mut self, _event: &ControlEvent) -> Result<()> {
        Ok(())
    }
}
