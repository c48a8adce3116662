use crossbeam_channel::Receiver;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::config::Config;
use crate::layout_engine::{
    AvoidAreaController, AvoidAreaType, AvoidControlType, ClientEvent, DisplayGroupInfo,
    DisplayInfo, LayoutCommand, LayoutEvent, WindowLayoutEngine, WindowLayoutPolicy,
};
use crate::model::{
    DisplayId, WindowFlags, WindowId, WindowMode, WindowNode, WindowSizeLimits, WindowTree,
    WindowType,
};
use crate::sys::geometry::Rect;
use crate::sys::transform::Transform;

const D0: DisplayId = DisplayId(0);
const D1: DisplayId = DisplayId(1);

fn phone() -> Rect { Rect::new(0, 0, 1080, 2340) }

fn engine(rects: &[(DisplayId, Rect)]) -> (WindowLayoutEngine, Receiver<(WindowId, ClientEvent)>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut engine = WindowLayoutEngine::new(Config::default(), rects[0].0);
    engine.connect(tx);
    for (id, rect) in rects {
        _ = engine.handle_event(LayoutEvent::DisplayAdded(DisplayInfo::new(*id, *rect, 1.0))).unwrap();
    }
    (engine, rx)
}

fn add(engine: &mut WindowLayoutEngine, node: WindowNode) -> WindowId {
    engine.handle_event(LayoutEvent::WindowAdded(Box::new(node))).unwrap().added_window.unwrap()
}

fn app(name: &str, mode: WindowMode) -> WindowNode {
    WindowNode::new(name, WindowType::AppMainWindow, mode, D0).with_flags(WindowFlags::NEED_AVOID)
}

fn bar(ty: WindowType, rect: Rect) -> WindowNode {
    WindowNode::new(ty.to_string(), ty, WindowMode::Floating, D0).with_request_rect(rect)
}

fn add_bars(engine: &mut WindowLayoutEngine, display: Rect, status: u32, nav: u32) {
    add(engine, bar(WindowType::StatusBar, Rect::new(0, 0, display.width, status)));
    add(engine, bar(WindowType::NavigationBar, Rect::new(0, 0, display.width, nav)));
}

fn rect(engine: &WindowLayoutEngine, id: WindowId) -> Rect { engine.window(id).unwrap().window_rect }

fn avoid_pushes(rx: &Receiver<(WindowId, ClientEvent)>, id: WindowId) -> usize {
    rx.try_iter()
        .filter(|(w, e)| *w == id && matches!(e, ClientEvent::AvoidArea { .. }))
        .count()
}

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test_log::test]
    fn fullscreen_window_avoids_both_bars() {
        let (h_status, h_nav) = (117, 126);
        let mut tree = WindowTree::new();
        let mut ctl = AvoidAreaController::default();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let insert = |tree: &mut WindowTree, node: WindowNode, rect: Rect| {
            let mut node = node.with_client(std::rc::Rc::new(crate::layout_engine::ChannelClient::new(
                WindowId::default(),
                tx.clone(),
            )));
            node.window_rect = rect;
            tree.insert(node)
        };
        let status = insert(
            &mut tree,
            bar(WindowType::StatusBar, Rect::EMPTY),
            Rect::new(0, 0, 1080, h_status),
        );
        let nav = insert(
            &mut tree,
            bar(WindowType::NavigationBar, Rect::EMPTY),
            Rect::new(0, 2340 - h_nav as i32, 1080, h_nav),
        );
        let full = insert(
            &mut tree,
            app("full", WindowMode::Fullscreen).with_request_rect(phone()),
            phone(),
        );
        ctl.update_avoid_area_listener(full, true);
        ctl.process_window_change(&tree, status, AvoidControlType::Add, None).unwrap();
        ctl.process_window_change(&tree, nav, AvoidControlType::Add, None).unwrap();

        let area = ctl.avoid_area_by_type(&tree, full, AvoidAreaType::System);
        assert_eq!(area.top, Rect::new(0, 0, 1080, h_status));
        assert_eq!(area.bottom, Rect::new(0, 2340 - h_nav as i32, 1080, h_nav));
        assert!(area.left.is_empty());
        assert!(area.right.is_empty());
    }

    #[test_log::test]
    fn tiny_floating_window_grows_to_the_minimum() {
        let (mut engine, _rx) = engine(&[(D0, phone())]);
        let id = add(&mut engine, app("tiny", WindowMode::Floating).with_request_rect(Rect::new(0, 0, 50, 50)));
        let win = rect(&engine, id);
        assert_eq!((win.width, win.height), (320, 240));
        assert!(phone().contains_rect(&win));
    }

    #[test_log::test]
    fn removing_the_other_display_keeps_rects() {
        let (mut engine, _rx) = engine(&[(D0, phone()), (D1, Rect::new(1080, 0, 1080, 2340))]);
        let toast = add(&mut engine, bar(WindowType::Toast, Rect::new(900, 0, 200, 200)));
        assert_eq!(rect(&engine, toast), Rect::new(900, 0, 200, 200));
        assert_eq!(engine.policy().display_group_rect(), Rect::new(0, 0, 2160, 2340));

        let response = engine.handle_event(LayoutEvent::DisplayRemoved(D1)).unwrap();
        assert!(response.removed_windows.is_empty());
        assert_eq!(rect(&engine, toast), Rect::new(900, 0, 200, 200));
        assert_eq!(engine.policy().display_group_rect(), phone());
    }

    #[test_log::test]
    fn moving_the_display_translates_its_windows() {
        let (mut engine, _rx) = engine(&[(D0, phone()), (D1, Rect::new(1080, 0, 1080, 2340))]);
        let mut node = bar(WindowType::Toast, Rect::new(1200, 100, 200, 200));
        node.display_id = D1;
        let toast = add(&mut engine, node);
        _ = engine
            .handle_event(LayoutEvent::DisplayChanged {
                display: D1,
                rect: Rect::new(1280, 0, 1080, 2340),
                rotation: Default::default(),
                virtual_pixel_ratio: 1.0,
            })
            .unwrap();
        assert_eq!(rect(&engine, toast), Rect::new(1400, 100, 200, 200));
    }

    #[test_log::test]
    fn never_overlapped_listeners_are_never_notified() {
        let (mut engine, rx) = engine(&[(D0, phone())]);
        let floating = add(
            &mut engine,
            app("floating", WindowMode::Floating).with_request_rect(Rect::new(100, 400, 500, 500)),
        );
        let full = add(&mut engine, app("full", WindowMode::Fullscreen));
        for id in [floating, full] {
            _ = engine.handle_event(LayoutEvent::AvoidAreaListener { id, register: true }).unwrap();
        }
        add_bars(&mut engine, phone(), 100, 100);
        _ = engine
            .handle_event(LayoutEvent::WindowRequested {
                id: floating,
                rect: Rect::new(200, 500, 500, 500),
                reason: crate::model::SizeChangeReason::Move,
            })
            .unwrap();

        let pushes: Vec<_> = rx
            .try_iter()
            .filter(|(w, e)| (*w == floating || *w == full) && matches!(e, ClientEvent::AvoidArea { .. }))
            .collect();
        assert!(pushes.is_empty(), "unexpected pushes {pushes:?}");
    }

    #[test_log::test]
    fn bars_resizing_reaches_overlapped_listener() {
        let (mut engine, rx) = engine(&[(D0, phone())]);
        let wall = WindowNode::new("desktop", WindowType::Desktop, WindowMode::Fullscreen, D0);
        let wall = add(&mut engine, wall);
        _ = engine.handle_event(LayoutEvent::AvoidAreaListener { id: wall, register: true }).unwrap();
        add_bars(&mut engine, phone(), 100, 100);
        assert_eq!(avoid_pushes(&rx, wall), 2);

        let status = engine.tree().layer(D0, crate::model::RootLayer::Above)[0];
        _ = engine
            .handle_event(LayoutEvent::WindowRequested {
                id: status,
                rect: Rect::new(0, 0, 1080, 150),
                reason: crate::model::SizeChangeReason::Resize,
            })
            .unwrap();
        assert_eq!(avoid_pushes(&rx, wall), 1);
        let tree = engine.tree();
        let area = engine.avoid_areas().avoid_area_by_type(tree, wall, AvoidAreaType::System);
        assert_eq!(area.top, Rect::new(0, 0, 1080, 150));
    }

    #[test_log::test]
    fn zoom_follows_relayout_and_turns_off_cleanly() {
        let (mut engine, _rx) = engine(&[(D0, phone())]);
        add_bars(&mut engine, phone(), 100, 100);
        let full = add(&mut engine, app("full", WindowMode::Fullscreen));
        let before = rect(&engine, full);
        _ = engine.handle_command(LayoutCommand::Zoom { x: 540, y: 1170, scale: 2.0 });
        _ = engine.handle_command(LayoutCommand::ZoomPan { dx: 100, dy: 0 });
        assert!(engine.window(full).unwrap().zoom_on);
        assert_eq!(rect(&engine, full), before);

        let nav = engine.tree().layer(D0, crate::model::RootLayer::Above)[1];
        assert!(!engine.window(nav).unwrap().zoom_on);

        _ = engine.handle_command(LayoutCommand::ZoomOff);
        assert_eq!(engine.window(full).unwrap().zoom_transform, Transform::IDENTITY);
    }
}

/// Bars wider than the floating maximum would be clamped off the display edge.
fn display_strategy() -> impl Strategy<Value = Rect> {
    (600u32..=1920, 600u32..=3000).prop_map(|(w, h)| Rect::new(0, 0, w, h))
}

fn mode_strategy() -> impl Strategy<Value = WindowMode> {
    prop_oneof![
        Just(WindowMode::Fullscreen),
        Just(WindowMode::Floating),
        Just(WindowMode::SplitPrimary),
        Just(WindowMode::SplitSecondary),
    ]
}

fn request_strategy() -> impl Strategy<Value = Rect> {
    (-2000i32..3000, -2000i32..3000, 1u32..4000, 1u32..4000)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

#[derive(Debug, Clone)]
enum ZoomOp {
    Zoom { x: i32, y: i32, scale: f32 },
    Pan { dx: i32, dy: i32 },
}

fn zoom_op_strategy() -> impl Strategy<Value = ZoomOp> {
    prop_oneof![
        (0i32..1080, 0i32..2340, 0.1f32..10.0).prop_map(|(x, y, scale)| ZoomOp::Zoom { x, y, scale }),
        (-3000i32..3000, -3000i32..3000).prop_map(|(dx, dy)| ZoomOp::Pan { dx, dy }),
    ]
}

fn apply(engine: &mut WindowLayoutEngine, op: &ZoomOp) {
    let command = match *op {
        ZoomOp::Zoom { x, y, scale } => LayoutCommand::Zoom { x, y, scale },
        ZoomOp::Pan { dx, dy } => LayoutCommand::ZoomPan { dx, dy },
    };
    _ = engine.handle_command(command);
}

proptest! {
    #[test]
    fn layout_is_idempotent(
        display in display_strategy(),
        windows in prop::collection::vec((mode_strategy(), request_strategy()), 1..6),
    ) {
        let mut displays = DisplayGroupInfo::new(D0);
        let mut tree = WindowTree::new();
        let mut policy = WindowLayoutPolicy::new(&Config::default());
        displays.add_display_info(DisplayInfo::new(D0, display, 1.0)).unwrap();
        let rects = displays.all_display_rects();
        policy.process_display_create(&mut displays, &mut tree, D0, &rects).unwrap();
        for (i, (mode, request)) in windows.iter().enumerate() {
            let id = tree.insert(app(&format!("w{i}"), *mode).with_request_rect(*request));
            policy.add_window_node(&displays, &mut tree, id);
        }

        policy.layout_window_tree(&displays, &mut tree, D0);
        let first: Vec<_> = tree.iter().map(|(id, n)| (id, n.window_rect, n.touch_hot_areas.clone())).collect();
        policy.layout_window_tree(&displays, &mut tree, D0);
        let second: Vec<_> = tree.iter().map(|(id, n)| (id, n.window_rect, n.touch_hot_areas.clone())).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tiled_windows_stay_inside_the_limit_rect(
        display in display_strategy(),
        status in 1u32..=300,
        nav in 1u32..=300,
        split in any::<bool>(),
    ) {
        let (mut engine, _rx) = engine(&[(D0, display)]);
        add_bars(&mut engine, display, status, nav);
        let ids = if split {
            vec![
                add(&mut engine, app("primary", WindowMode::SplitPrimary)),
                add(&mut engine, app("secondary", WindowMode::SplitSecondary)),
            ]
        } else {
            vec![add(&mut engine, app("full", WindowMode::Fullscreen))]
        };
        let limit = engine.policy().limit_rect(D0);
        prop_assert_eq!(limit.height, display.height - status - nav);
        for id in ids {
            let win = rect(&engine, id);
            prop_assert!(limit.contains_rect(&win), "{} escapes {}", win, limit);
        }
    }

    #[test]
    fn floating_sizes_respect_effective_limits(
        requests in prop::collection::vec(request_strategy(), 1..5),
        max_width in 400u32..=1920,
        max_height in 400u32..=1920,
    ) {
        let (mut engine, _rx) = engine(&[(D0, Rect::new(0, 0, 2560, 1600))]);
        for (i, request) in requests.iter().enumerate() {
            let mut node = app(&format!("f{i}"), WindowMode::Floating).with_request_rect(*request);
            node.size_limits = WindowSizeLimits { max_width, max_height, ..WindowSizeLimits::default() };
            let id = add(&mut engine, node);
            let node = engine.window(id).unwrap();
            let limits = node.updated_size_limits;
            let win = node.window_rect;
            prop_assert!((limits.min_width..=limits.max_width).contains(&win.width), "{} {:?}", win, limits);
            prop_assert!((limits.min_height..=limits.max_height).contains(&win.height), "{} {:?}", win, limits);
            let ratio = win.width as f32 / win.height as f32;
            prop_assert!(limits.min_ratio <= ratio && ratio <= limits.max_ratio, "{} {:?}", win, limits);
        }
    }

    #[test]
    fn zoom_scale_stays_within_bounds(factors in prop::collection::vec(0.1f32..10.0, 1..10)) {
        let (mut engine, _rx) = engine(&[(D0, phone())]);
        add(&mut engine, app("full", WindowMode::Fullscreen));
        let settings = engine.config().zoom;
        for factor in factors {
            _ = engine.handle_command(LayoutCommand::Zoom { x: 540, y: 1170, scale: factor });
            let scale = engine.zoom().zoom_info().scale;
            prop_assert!(scale >= settings.min_scale - 1e-3 && scale <= settings.max_scale + 1e-3, "{}", scale);
        }
    }

    #[test]
    fn zoom_off_restores_identity(ops in prop::collection::vec(zoom_op_strategy(), 1..8)) {
        let (mut engine, _rx) = engine(&[(D0, phone())]);
        add_bars(&mut engine, phone(), 100, 100);
        let ids = [
            add(&mut engine, app("full", WindowMode::Fullscreen)),
            add(&mut engine, app("float", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 500, 400))),
        ];
        let before: Vec<_> = ids.iter().map(|id| rect(&engine, *id)).collect();
        for op in &ops {
            apply(&mut engine, op);
        }
        _ = engine.handle_command(LayoutCommand::ZoomOff);

        prop_assert!(!engine.zoom().is_zoom_on());
        for (id, node) in engine.tree().iter() {
            prop_assert_eq!(node.zoom_transform, Transform::IDENTITY, "{:?}", id);
            prop_assert!(!node.zoom_on);
        }
        let after: Vec<_> = ids.iter().map(|id| rect(&engine, *id)).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn keyboard_area_has_at_most_one_holder(
        calling in prop::option::of(0usize..3),
        focus in prop::collection::vec(prop::option::of(0usize..3), 1..8),
    ) {
        let (mut engine, _rx) = engine(&[(D0, phone())]);
        let apps: Vec<_> = (0..3).map(|i| add(&mut engine, app(&format!("a{i}"), WindowMode::Fullscreen))).collect();
        for id in &apps {
            _ = engine.handle_event(LayoutEvent::AvoidAreaListener { id: *id, register: true }).unwrap();
        }
        let mut keyboard = bar(WindowType::InputMethodFloat, Rect::new(0, 1500, 1080, 840));
        keyboard.calling_window = calling.map(|i| apps[i]);
        add(&mut engine, keyboard);

        for focused in focus {
            _ = engine.handle_event(LayoutEvent::WindowFocused(focused.map(|i| apps[i]))).unwrap();
            let tree = engine.tree();
            let holders = apps
                .iter()
                .filter(|id| !engine.avoid_areas().avoid_area_by_type(tree, **id, AvoidAreaType::Keyboard).is_empty())
                .count();
            prop_assert!(holders <= 1, "{} windows hold the keyboard", holders);
        }
    }
}
