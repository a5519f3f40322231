//! Overpass query layer plugin
//!
//! Lifecycle: `on_add` subscribes to `Load` and `MoveEnd`. The first render
//! injects a GeoJSON source and the overlay layers into the host style.
//! While enabled, every viewport change (or an Enter in the query input)
//! substitutes the bounds into the query template and fetches features,
//! which replace the source contents when they arrive. Only the newest fetch
//! may write; older results are dropped.

use crate::{
    core::{
        config::OverpassOptions,
        map::{geojson_source, lock_host, MapHost, SharedHost},
    },
    data::geojson::FeatureCollection,
    input::events::{ControlEvent, MapEvent, MapEventKind},
    plugins::{
        base::ControlTrait,
        fetch::{FetchOutcome, FetchStatus, FetchTicket, FetchTracker, ResultApplier},
    },
    query::{
        client::{OverpassClient, QueryClient},
        template::{substitute_bbox, token_count},
    },
    runtime::{self, AsyncHandle},
    style::layers::{add_style_layers, build_style_layers, resolve_insertion, resolve_style_layers},
    ui::controls::{ControlFactory, DefaultControlFactory, PluginControl},
    Error, Result,
};
use std::sync::Arc;

const SUBSCRIPTIONS: [MapEventKind; 2] = [MapEventKind::Load, MapEventKind::MoveEnd];

/// Toggleable map layer fed by Overpass queries over the current viewport
pub struct OverpassPlugin {
    options: OverpassOptions,
    client: Arc<dyn QueryClient>,
    control: PluginControl,
    host: Option<SharedHost>,
    tracker: FetchTracker,
    in_flight: Option<Box<dyn AsyncHandle>>,
}

impl OverpassPlugin {
    /// Creates the plugin with an Overpass client built from `options`
    pub fn new(options: OverpassOptions) -> Result<Self> {
        let client = OverpassClient::new(options.client.clone())?;
        Self::with_client(options, Arc::new(client))
    }

    /// Creates the plugin around any query client
    pub fn with_client(options: OverpassOptions, client: Arc<dyn QueryClient>) -> Result<Self> {
        Self::with_parts(options, client, &DefaultControlFactory)
    }

    /// Creates the plugin with a custom client and control factory
    pub fn with_parts(
        mut options: OverpassOptions,
        client: Arc<dyn QueryClient>,
        factory: &dyn ControlFactory,
    ) -> Result<Self> {
        options.validate()?;
        // a blank template counts as no query at all
        options.query = options.query.filter(|query| !query.trim().is_empty());

        let mut control = factory.plugin_control(options.show_button);
        if let Some(query) = &options.query {
            control.input.value = query.clone();
        }

        Ok(Self {
            options,
            client,
            control,
            host: None,
            tracker: FetchTracker::new(),
            in_flight: None,
        })
    }

    pub fn options(&self) -> &OverpassOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Active query template
    pub fn query(&self) -> Option<&str> {
        self.options.query.as_deref()
    }

    pub fn control(&self) -> &PluginControl {
        &self.control
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.tracker.status()
    }

    /// Flips the enabled state and re-renders
    pub fn toggle(&mut self) -> Result<()> {
        self.options.enabled = !self.options.enabled;
        log::debug!(
            "overpass plugin {}",
            if self.options.enabled { "enabled" } else { "disabled" }
        );
        self.render()
    }

    /// Replaces the active query template; empty text clears it
    pub fn set_query(&mut self, query: Option<String>) {
        let query = query.filter(|q| !q.trim().is_empty());
        self.control.input.value = query.clone().unwrap_or_default();
        self.options.query = query;
    }

    /// Takes the input's text as the active query and fetches for it
    pub fn submit_query(&mut self) -> Result<()> {
        let text = self.control.input.value.clone();
        self.set_query(Some(text));
        self.update_map()
    }

    /// Injects the overlay on first use, then syncs visibility and icon with the toggle state
    pub fn render(&mut self) -> Result<()> {
        if let Some(host) = self.host.clone() {
            let mut host = lock_host(&host)?;
            if !host.style().has_source(&self.options.source_name) {
                self.inject(&mut *host)?;
            }
        }

        if self.options.enabled {
            self.control.set_map_icon();
            self.show()
        } else {
            self.control.set_plugin_icon();
            self.hide()
        }
    }

    /// Makes the overlay layers and the query input visible
    pub fn show(&mut self) -> Result<()> {
        self.set_visible(true)
    }

    /// Hides the overlay layers and the query input
    pub fn hide(&mut self) -> Result<()> {
        self.set_visible(false)
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        if let Some(host) = self.host.clone() {
            let mut host = lock_host(&host)?;
            self.set_layers_visible(&mut *host, visible)?;
        }
        self.control.show_input(visible);
        Ok(())
    }

    /// Adds the source and layers; returns false when the policy skipped injection
    fn inject(&mut self, host: &mut dyn MapHost) -> Result<bool> {
        let source_name = self.options.source_name.clone();
        let index = resolve_insertion(
            &host.style(),
            &self.options.reference_layer,
            self.options.missing_reference,
        )?;
        let Some(index) = index else {
            log::warn!(
                "no '{}' layer in the style, overpass layers not added",
                self.options.reference_layer
            );
            return Ok(false);
        };

        host.add_source(&source_name, geojson_source(&FeatureCollection::empty())?)?;

        if self.options.style.layers.is_none() {
            self.options.style.layers = Some(build_style_layers(&self.options.style, &source_name));
        }
        let layers = resolve_style_layers(&self.options.style, &source_name);
        let style = add_style_layers(&host.style(), &layers, index);
        host.set_style(style)?;

        log::info!(
            "injected source '{}' and {} layers at index {}",
            source_name,
            layers.len(),
            index
        );
        Ok(true)
    }

    fn set_layers_visible(&self, host: &mut dyn MapHost, visible: bool) -> Result<()> {
        let mut style = host.style();
        let touched = style.set_source_visibility(&self.options.source_name, visible);
        log::debug!(
            "{} {} overpass layers",
            if visible { "showing" } else { "hiding" },
            touched
        );
        host.set_style(style)
    }

    /// Issues a ticket for the current viewport, or `None` when nothing should be fetched
    fn prepare_fetch(&mut self) -> Result<Option<(ResultApplier, String, FetchTicket)>> {
        if !self.options.enabled {
            return Ok(None);
        }
        let Some(template) = self.options.query.clone() else {
            return Ok(None);
        };
        let host = self.host.clone().ok_or(Error::NotAttached)?;

        let bounds = lock_host(&host)?.bounds();
        if token_count(&template) == 0 {
            log::warn!("query has no {{{{bbox}}}} placeholder, sending it unchanged");
        }
        let query = substitute_bbox(&template, &bounds);

        if let Some(previous) = self.in_flight.take() {
            if !previous.is_finished() {
                log::debug!("cancelling in-flight fetch");
                previous.cancel();
            }
        }

        let ticket = self.tracker.issue(&query);
        let applier = ResultApplier::new(host, self.options.source_name.clone(), self.tracker.clone());
        Ok(Some((applier, query, ticket)))
    }

    /// Fetches features for the current viewport in the background
    pub fn update_map(&mut self) -> Result<()> {
        let Some((applier, query, ticket)) = self.prepare_fetch()? else {
            return Ok(());
        };
        let client = Arc::clone(&self.client);
        let handle = runtime::spawn(async move {
            applier.run(client, query, ticket).await;
        })?;
        self.in_flight = Some(handle);
        Ok(())
    }

    /// Fetches features for the current viewport and waits for the result
    pub async fn refresh(&mut self) -> Result<Option<FetchOutcome>> {
        let Some((applier, query, ticket)) = self.prepare_fetch()? else {
            return Ok(None);
        };
        let outcome = applier.run(Arc::clone(&self.client), query, ticket).await;
        Ok(Some(outcome))
    }

    /// Waits for the background fetch started by `update_map`, if any
    pub async fn wait_for_fetch(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.join().await;
        }
    }
}

impl ControlTrait for OverpassPlugin {
    fn name(&self) -> &str {
        &self.options.source_name
    }

    fn subscriptions(&self) -> &[MapEventKind] {
        &SUBSCRIPTIONS
    }

    fn on_add(&mut self, map: SharedHost) -> Result<PluginControl> {
        if self.host.is_some() {
            return Err(Error::Plugin(format!(
                "'{}' is already added to a map",
                self.options.source_name
            )));
        }

        {
            let mut host = lock_host(&map)?;
            for kind in SUBSCRIPTIONS {
                host.on(kind, &self.options.source_name);
            }
        }
        self.host = Some(map);
        Ok(self.control.clone())
    }

    fn on_remove(&mut self) -> Result<()> {
        let Some(map) = self.host.take() else {
            return Ok(());
        };

        if let Some(handle) = self.in_flight.take() {
            handle.cancel();
        }
        self.tracker.invalidate();

        let mut host = lock_host(&map)?;
        for kind in SUBSCRIPTIONS {
            host.off(kind, &self.options.source_name);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &MapEvent) -> Result<()> {
        match event {
            MapEvent::Load => self.render(),
            MapEvent::MoveEnd { .. } => self.update_map(),
        }
    }

    fn handle_control_event(&mut self, event: &ControlEvent) -> Result<()> {
        match event {
            ControlEvent::ToggleClicked => self.toggle(),
            ControlEvent::InputChanged(text) => {
                self.control.input.value = text.clone();
                Ok(())
            }
            event if event.is_submit() => self.submit_query(),
            ControlEvent::KeyPress { .. } => Ok(()),
        }
    }
}
