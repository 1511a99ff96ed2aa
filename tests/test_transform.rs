mod common;

use approx::assert_abs_diff_eq;

use mpr_viewer::InputEvent;
use mpr_viewer::enums::{PointerButton, View};
use mpr_viewer::geometry::{Point, Rect, Size};
use mpr_viewer::mapper::{CoordinateMapper, ViewLayout};
use mpr_viewer::transform::{TransformState, TransformStore};

use common::at;

fn layout() -> ViewLayout {
    ViewLayout {
        wrapper: Rect::new(100.0, 50.0, 256.0, 256.0),
        canvas: Size::new(256.0, 256.0),
        internal: (512, 512),
    }
}

#[test]
fn pointer_to_pixel_inverts_the_forward_transform() {
    let layout = layout();
    let pixels = [
        Point::new(0.5, 0.5),
        Point::new(10.25, 200.75),
        Point::new(511.5, 3.0),
    ];
    for scale in [1.0, 1.5, 2.0, 4.0, 10.0] {
        for (pan_x, pan_y) in [(0.0, 0.0), (-37.5, 12.25), (100.0, -250.0)] {
            let state = TransformState {
                scale,
                pan_x,
                pan_y,
                is_dragging: false,
            };
            for pixel in pixels {
                let client = CoordinateMapper::pixel_to_pointer(&state, &layout, pixel).unwrap();
                let back = CoordinateMapper::pointer_to_pixel(&state, &layout, client).unwrap();
                assert_abs_diff_eq!(back.x, pixel.x, epsilon = 1e-9);
                assert_abs_diff_eq!(back.y, pixel.y, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn zoom_keeps_the_point_under_the_cursor() {
    let layout = ViewLayout::native(Rect::new(10.0, 20.0, 256.0, 256.0), (256, 256));
    let mut store = TransformStore::default();
    let cursor = Point::new(130.0, 100.0);
    let anchor = CoordinateMapper::wrapper_point(&layout, cursor);

    for delta in [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0] {
        let before =
            CoordinateMapper::pointer_to_pixel(store.get(View::Axial), &layout, cursor).unwrap();
        assert!(store.zoom(View::Axial, anchor, delta));
        assert!(store.get(View::Axial).scale > 1.0);
        let after =
            CoordinateMapper::pointer_to_pixel(store.get(View::Axial), &layout, cursor).unwrap();
        assert_abs_diff_eq!(after.x, before.x, epsilon = 1e-6);
        assert_abs_diff_eq!(after.y, before.y, epsilon = 1e-6);
    }
}

#[test]
fn reaching_unit_scale_always_clears_pan() {
    let mut store = TransformStore::default();
    let steps = [
        (1.0, at(10.0, 10.0)),
        (1.0, at(200.0, 30.0)),
        (-1.0, at(50.0, 180.0)),
        (1.0, at(0.0, 0.0)),
        (-1.0, at(250.0, 250.0)),
        (-1.0, at(12.0, 99.0)),
        (-1.0, at(77.0, 3.0)),
        (1.0, at(128.0, 128.0)),
        (-1.0, at(1.0, 255.0)),
        (-1.0, at(64.0, 64.0)),
    ];
    let mut reached_unit = false;
    for (delta, anchor) in steps {
        store.zoom(View::Coronal, anchor, delta);
        let state = store.get(View::Coronal);
        if state.scale == 1.0 {
            reached_unit = true;
            assert_eq!(state.pan(), Point::ORIGIN);
        }
    }
    assert!(reached_unit);
}

#[tokio::test]
async fn double_click_after_zoom_resets_and_hides_minimap() {
    let mut viewer = common::viewer().await;
    let cursor = at(100.0, 100.0);
    while viewer.transforms().get(View::Axial).scale < 4.0 {
        viewer
            .handle(InputEvent::Wheel {
                view: View::Axial,
                client: cursor,
                delta: 1.0,
            })
            .await;
    }
    assert!(viewer.frame(View::Axial).minimap_visible);
    assert!(!viewer.frame(View::Coronal).minimap_visible);

    viewer.handle(InputEvent::DoubleClick { view: View::Axial }).await;

    let state = viewer.transforms().get(View::Axial);
    assert_eq!(state.scale, 1.0);
    assert_eq!(state.pan(), Point::ORIGIN);
    let frame = viewer.frame(View::Axial);
    assert!(!frame.minimap_visible);
    assert_eq!(frame.transform, "translate(0px, 0px) scale(1)");
}

#[tokio::test]
async fn pan_drag_suppresses_the_following_click() {
    let mut viewer = common::viewer().await;
    viewer.toggle_tool(mpr_viewer::enums::ToolKind::HuPicker);
    viewer
        .handle(InputEvent::Wheel {
            view: View::Axial,
            client: at(32.0, 32.0),
            delta: 1.0,
        })
        .await;
    let start = viewer.transforms().get(View::Axial).pan();

    viewer
        .handle(InputEvent::PointerDown {
            view: View::Axial,
            button: PointerButton::Primary,
            client: at(20.0, 20.0),
        })
        .await;
    viewer
        .handle(InputEvent::PointerMove {
            view: View::Axial,
            client: at(30.0, 25.0),
        })
        .await;
    viewer.handle(InputEvent::PointerUp { view: View::Axial }).await;
    viewer
        .handle(InputEvent::Click {
            view: View::Axial,
            client: at(30.0, 25.0),
        })
        .await;

    let pan = viewer.transforms().get(View::Axial).pan();
    assert_eq!(pan, start + Point::new(10.0, 5.0));
    assert_eq!(viewer.results(), None);
    assert_eq!(viewer.marker(View::Axial), None);
}

#[tokio::test]
async fn wheel_without_layout_is_ignored() {
    let volume = common::phantom();
    let indices = mpr_viewer::sync::SliceIndices::for_dims(volume.dim());
    let backend = mpr_viewer::MemoryBackend::new(volume, 20);
    let mut viewer = mpr_viewer::Viewer::new(backend, Default::default(), indices);
    viewer
        .handle(InputEvent::Wheel {
            view: View::Sagittal,
            client: at(5.0, 5.0),
            delta: 1.0,
        })
        .await;
    assert_eq!(viewer.transforms().get(View::Sagittal).scale, 1.0);
    assert!(viewer.notices().is_empty());
}
