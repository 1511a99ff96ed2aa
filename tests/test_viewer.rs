mod common;

use mpr_viewer::enums::{CursorStyle, Panel, ToolKind, View, WindowPreset};
use mpr_viewer::error::ServiceError;
use mpr_viewer::geometry::Point;
use mpr_viewer::services::ViewerBackend;
use mpr_viewer::slice_cache::LoadOutcome;
use mpr_viewer::viewer::NoticeLevel;
use mpr_viewer::volume::Volume;
use mpr_viewer::window::WindowLevel;
use mpr_viewer::{InputEvent, ViewerConfig};

use common::at;

#[tokio::test]
async fn lung_preset_refetches_each_view_once() {
    let volume = Volume::phantom((64, 32, 32), (1.0, 1.0, 1.0));
    let mut viewer = common::viewer_for(volume, ViewerConfig::default()).await;
    viewer.set_slice(View::Axial, 50).await;
    let loaded = viewer.cache().loaded_query(View::Axial).unwrap();
    assert_eq!((loaded.layer, loaded.ww, loaded.wc), (50, 400.0, 40.0));
    viewer.backend().clear_fetches();

    viewer.apply_preset(WindowPreset::Lung).await;

    let fetches = viewer.backend().fetches();
    assert_eq!(fetches.len(), 3);
    for view in View::ALL {
        let for_view = viewer.backend().fetches_for(view);
        assert_eq!(for_view.len(), 1, "{view}");
        assert_eq!((for_view[0].ww, for_view[0].wc), (1500.0, -600.0));
    }
    assert_eq!(viewer.backend().fetches_for(View::Axial)[0].layer, 50);

    for preset in WindowPreset::ALL {
        let highlighted = viewer.active_preset() == Some(preset);
        assert_eq!(highlighted, preset == WindowPreset::Lung);
    }
}

#[tokio::test]
async fn unchanged_window_does_not_refetch() {
    let mut viewer = common::viewer().await;
    viewer.set_window(WindowLevel::new(400.0, 40.0)).await;
    viewer.apply_preset(WindowPreset::SoftTissue).await;
    assert!(viewer.backend().fetches().is_empty());

    viewer.set_window(WindowLevel::new(350.0, 40.0)).await;
    assert_eq!(viewer.backend().fetches().len(), 3);
    assert_eq!(viewer.active_preset(), None);
}

#[tokio::test]
async fn colormap_change_refetches() {
    let mut viewer = common::viewer().await;
    viewer.set_colormap(Some("bone".to_string())).await;
    let fetches = viewer.backend().fetches();
    assert_eq!(fetches.len(), 3);
    assert!(fetches.iter().all(|q| q.cmap.as_deref() == Some("bone")));
}

#[tokio::test]
async fn late_response_for_an_old_slice_is_discarded() {
    let mut viewer = common::viewer().await;
    let old = viewer.request_slice(View::Axial);
    let old_bytes = viewer.backend().inner.fetch_slice(&old.query).await.unwrap();

    viewer.set_slice(View::Axial, 7).await;
    assert_eq!(viewer.deliver(&old, Ok(old_bytes)), Some(LoadOutcome::Stale));
    assert_eq!(viewer.cache().loaded_query(View::Axial).unwrap().layer, 7);
    assert!(!viewer.cache().is_pending(View::Axial));
}

#[tokio::test]
async fn responses_out_of_order_keep_the_latest() {
    let mut viewer = common::viewer().await;
    let first = viewer.request_slice(View::Coronal);
    let second = viewer.request_slice(View::Coronal);
    let bytes = viewer.backend().inner.fetch_slice(&second.query).await.unwrap();

    assert_eq!(viewer.deliver(&second, Ok(bytes.clone())), Some(LoadOutcome::Applied));
    assert_eq!(viewer.deliver(&first, Ok(bytes)), Some(LoadOutcome::Stale));
}

#[tokio::test]
async fn failed_fetches_become_notices() {
    let mut viewer = common::viewer().await;
    let ticket = viewer.request_slice(View::Sagittal);
    let err = ServiceError::Transport {
        endpoint: "/image".to_string(),
        message: "timed out".to_string(),
    };
    assert_eq!(viewer.deliver(&ticket, Err(err)), None);
    assert!(!viewer.cache().is_pending(View::Sagittal));

    let ticket = viewer.request_slice(View::Sagittal);
    assert_eq!(viewer.deliver(&ticket, Ok(vec![1, 2, 3])), None);

    let notices = viewer.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));
    assert_eq!(notices[0].message, "timed out");
    assert!(viewer.frame(View::Sagittal).raster.is_some());
}

#[tokio::test]
async fn failed_slice_fetch_keeps_the_shown_layer() {
    let mut viewer = common::viewer().await;
    viewer.backend().fail_fetch.set(true);
    viewer.set_slice(View::Axial, 7).await;

    assert_eq!(viewer.slice(View::Axial), 0);
    assert_eq!(viewer.frame(View::Axial).slice, 0);
    assert_eq!(viewer.cache().loaded_query(View::Axial).unwrap().layer, 0);
    let notices = viewer.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "image service down");

    viewer.backend().fail_fetch.set(false);
    viewer.set_slice(View::Axial, 7).await;
    assert_eq!(viewer.slice(View::Axial), 7);
    assert_eq!(viewer.cache().loaded_query(View::Axial).unwrap().layer, 7);
}

#[tokio::test]
async fn slice_input_is_clamped() {
    let mut viewer = common::viewer().await;
    viewer.set_slice(View::Axial, 500).await;
    assert_eq!(viewer.slice(View::Axial), 19);
    viewer.set_slice(View::Axial, -3).await;
    assert_eq!(viewer.slice(View::Axial), 0);
    viewer.set_slice(View::Axial, 0).await;
    assert_eq!(viewer.backend().fetches_for(View::Axial).len(), 2);
    assert_eq!(viewer.frame(View::Axial).max_slice, 19);
}

#[tokio::test]
async fn hu_picker_reports_and_marks_the_voxel() {
    let mut viewer = common::viewer().await;
    viewer.toggle_tool(ToolKind::HuPicker);
    viewer
        .handle(InputEvent::Click {
            view: View::Axial,
            client: at(32.5, 45.5),
        })
        .await;
    assert_eq!(viewer.results(), Some("Voxel (32, 45, 0): HU = 700"));
    assert_eq!(viewer.marker(View::Axial), Some(Point::new(32.5, 45.5)));
    assert!(viewer.backend().fetches().is_empty());

    viewer
        .handle(InputEvent::Click {
            view: View::Axial,
            client: at(-4.0, 10.0),
        })
        .await;
    assert_eq!(viewer.results(), Some("Click outside image"));
    assert_eq!(viewer.marker(View::Axial), None);

    viewer.toggle_tool(ToolKind::HuPicker);
    assert_eq!(viewer.results(), None);
}

#[tokio::test]
async fn tools_are_mutually_exclusive_and_drive_the_cursor() {
    let mut viewer = common::viewer().await;
    assert_eq!(viewer.frame(View::Axial).cursor, CursorStyle::Grab);
    assert_eq!(viewer.frame(View::Axial).cursor.as_css(), "grab");

    viewer.toggle_tool(ToolKind::Inspector);
    assert_eq!(viewer.frame(View::Coronal).cursor, CursorStyle::Pointer);
    assert_eq!(viewer.frame(View::Coronal).cursor.as_css(), "pointer");

    viewer.toggle_tool(ToolKind::HuPicker);
    assert!(!viewer.tools().is_active(ToolKind::Inspector));
    assert_eq!(viewer.frame(View::Sagittal).cursor, CursorStyle::Crosshair);

    viewer.toggle_tool(ToolKind::Segmentation);
    assert!(!viewer.tools().is_active(ToolKind::HuPicker));
    assert!(viewer.toggle_panel(Panel::WindowLevel));
    assert!(viewer.panel_open(Panel::WindowLevel));
    assert!(!viewer.panel_open(Panel::Contrast));
    assert!(viewer.tools().is_active(ToolKind::Segmentation));

    viewer.toggle_tool(ToolKind::Segmentation);
    assert_eq!(viewer.frame(View::Axial).cursor, CursorStyle::Grab);
}
