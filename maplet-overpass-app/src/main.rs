use anyhow::{anyhow, bail, Context};
use clap::Parser;
use maplet_overpass::{
    ControlTrait, LatLngBounds, MapEvent, MemoryMap, OverpassOptions, OverpassPlugin,
    StyleDocument,
};
use std::path::PathBuf;

/// Runs an Overpass query over a bounding box and writes the style with the results injected
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base map style (JSON)
    #[arg(long)]
    style: PathBuf,

    /// Viewport as swLat,swLng,neLat,neLng
    #[arg(long, allow_hyphen_values = true)]
    bbox: String,

    /// Overpass QL template; `{{bbox}}` is replaced with the viewport
    #[arg(long)]
    query: Option<String>,

    /// Plugin options file (JSON, same keys as the plugin constructor)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overpass interpreter endpoint
    #[arg(long)]
    url: Option<String>,

    /// Where to write the resulting style; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn load_options(args: &Args) -> anyhow::Result<OverpassOptions> {
    let mut options = match &args.config {
        Some(path) => OverpassOptions::from_file(path)
            .with_context(|| format!("failed to load options from {}", path.display()))?,
        None => OverpassOptions::default(),
    };

    if let Some(query) = &args.query {
        options = options.with_query(query.clone());
    }
    if let Some(url) = &args.url {
        options.client.overpass_url = url.clone();
    }
    if options.query.is_none() {
        bail!("no query given: pass --query or set \"query\" in the options file");
    }

    let options = options.with_enabled(true);
    options.validate()?;
    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    maplet_overpass::init_logging();

    let args = Args::parse();
    let options = load_options(&args)?;

    let style_json = std::fs::read_to_string(&args.style)
        .with_context(|| format!("failed to read style {}", args.style.display()))?;
    let style = StyleDocument::from_json_str(&style_json)?;
    let bounds = LatLngBounds::parse(&args.bbox)?;

    let map = MemoryMap::new(style, bounds.clone()).into_shared();
    let mut plugin = OverpassPlugin::new(options)?;
    plugin.on_add(map.clone())?;
    plugin.handle_event(&MapEvent::Load)?;
    plugin.handle_event(&MapEvent::MoveEnd { bounds })?;
    plugin.wait_for_fetch().await;

    if let Some(message) = plugin.fetch_status().error() {
        bail!("overpass query failed: {}", message);
    }
    plugin.on_remove()?;

    let output = {
        let map = map.lock().map_err(|_| anyhow!("map lock poisoned"))?;
        if let Some(features) = map.source_data(&plugin.options().source_name) {
            match features.bounds() {
                Some(extent) => log::info!(
                    "{} features written to the style, extent {}",
                    features.len(),
                    extent.to_overpass_bbox()
                ),
                None => log::info!("no features matched the query"),
            }
        }
        map.style_ref().to_json_pretty()?
    };

    match &args.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", output),
    }
    Ok(())
}
