use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mpr_viewer::{
    InputEvent, MemoryBackend, Viewer, ViewerConfig,
    enums::{ToolKind, View, WindowPreset},
    geometry::{Point, Rect},
    mapper::ViewLayout,
    sync::SliceIndices,
    volume::Volume,
};

/// Run a scripted session against a synthetic phantom and save one view.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Viewer configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// View to save.
    #[arg(short, long, default_value = "coronal")]
    view: View,

    /// Window preset applied before saving.
    #[arg(short, long, value_enum)]
    preset: Option<WindowPreset>,

    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> mpr_viewer::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let volume = Volume::phantom((40, 128, 128), (1.0, 1.0, 2.5));
    let indices = SliceIndices::for_dims(volume.dim());
    let scales = volume.scales();
    let backend = MemoryBackend::new(volume, config.segmentation.history_depth);
    let mut viewer = Viewer::new(backend, config, indices).with_scales(scales);

    viewer.load_all().await;
    for view in View::ALL {
        if let Some((width, height)) = viewer.cache().dimensions(view) {
            let wrapper = Rect::new(0.0, 0.0, width as f64, height as f64);
            viewer.set_layout(view, ViewLayout::native(wrapper, (width, height)));
        }
    }

    // Inspect the centre of the axial view so the other views follow it.
    viewer.toggle_tool(ToolKind::Inspector);
    viewer
        .handle(InputEvent::Click {
            view: View::Axial,
            client: Point::new(64.0, 64.0),
        })
        .await;
    if let Some(results) = viewer.results() {
        info!(%results, "inspected");
    }

    if let Some(preset) = args.preset {
        viewer.apply_preset(preset).await;
    }

    for notice in viewer.take_notices() {
        info!(level = ?notice.level, message = %notice.message, "notice");
    }

    match viewer.frame(args.view).raster {
        Some(raster) => {
            raster.save(&args.output)?;
            info!(view = %args.view, output = %args.output.display(), "saved");
        }
        None => info!(view = %args.view, "nothing to save"),
    }
    Ok(())
}
