//! End-to-end: producer task, event bridge, scene, compositor, memory sink.

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use image::{Rgb, Rgba, RgbaImage};
use live_preview::{
    engine_state::{
        capture::MockCamera,
        rendering::{
            geometry::{fit_size, FitMode, Size},
            DisplaySink, Frame, MemorySink, Rect,
        },
        task_management::{
            Backlog, CancellationToken, EventBridge, EventKind, TaskOptions, TaskPool, TaskStatus,
        },
        EngineState,
    },
    ApplicationState, PreviewConfig, PreviewError, StrategyKind, TaskFailure,
};

const DISPLAY: Size = Size {
    width: 32,
    height: 16,
};

fn wait_for_frames(engine: &EngineState) -> Vec<Frame> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let frames = engine.take_frames();
        if !frames.is_empty() || Instant::now() > deadline {
            return frames;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn frames_flow_from_worker_to_display() {
    let mut engine = EngineState::new(2, Backlog::Unbounded, DISPLAY, Rgb([0, 0, 0])).unwrap();
    let mut sink = MemorySink::new(DISPLAY).unwrap();

    let preview = {
        let scene = engine.scene();
        let mut scene = scene.get_mut();
        let background = scene.add_node(None, 0).unwrap();
        let node = scene.node_mut(background).unwrap();
        node.set_rectangle(0, 0, 32, 16).unwrap();
        node.set_skin(Rgb([0, 0, 64]));

        let preview = scene.add_node(None, 3).unwrap();
        scene.node_mut(preview).unwrap().set_rectangle(12, 4, 8, 8).unwrap();
        scene.hide(preview).unwrap();
        preview
    };

    let first = engine.render(&mut sink).unwrap();
    assert_eq!(first, vec![Rect::new(0, 0, 32, 16)]);
    assert_eq!(*sink.surface().get_pixel(16, 8), Rgba([0, 0, 64, 255]));

    let camera = MockCamera::new(
        vec![RgbaImage::from_pixel(8, 8, Rgba([0, 200, 0, 255]))],
        Size::new(8, 8),
    )
    .unwrap();
    engine.start_capture(camera).unwrap();

    let frames = wait_for_frames(&engine);
    let latest = frames.last().expect("no frame arrived").clone();
    {
        let scene = engine.scene();
        let mut scene = scene.get_mut();
        scene.node_mut(preview).unwrap().set_skin(latest);
        scene.show(preview).unwrap();
    }

    // Only the preview area changed.
    let rects = engine.render(&mut sink).unwrap();
    assert_eq!(rects, vec![Rect::new(12, 4, 8, 8)]);
    assert_eq!(*sink.surface().get_pixel(15, 7), Rgba([0, 200, 0, 255]));
    assert_eq!(*sink.surface().get_pixel(2, 2), Rgba([0, 0, 64, 255]));

    engine.shutdown();
    assert_eq!(engine.pool().in_flight(), 0);
}

#[test]
fn single_failing_task_leaves_pool_usable() {
    const KIND: EventKind = EventKind(7);
    let bridge = EventBridge::unbounded();
    let pool = TaskPool::new(1, &bridge).unwrap();

    let failing = pool
        .submit(
            |_: &CancellationToken| Err::<u32, _>(TaskFailure::new("sensor unplugged")),
            TaskOptions::once().emitting(KIND),
        )
        .unwrap();
    assert!(matches!(
        pool.wait(&failing, Duration::from_secs(5)),
        TaskStatus::Failed(_)
    ));

    let events = bridge.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload, Err(TaskFailure::new("sensor unplugged")));

    let next = pool
        .submit(|_: &CancellationToken| Ok::<u32, TaskFailure>(5), TaskOptions::once())
        .unwrap();
    assert_eq!(pool.wait(&next, Duration::from_secs(5)), TaskStatus::Completed(5));

    pool.shutdown();
    assert!(matches!(
        pool.submit(|_: &CancellationToken| Ok::<u32, TaskFailure>(1), TaskOptions::once()),
        Err(PreviewError::PoolShuttingDown)
    ));
}

#[test]
fn looping_task_events_keep_order() {
    const KIND: EventKind = EventKind(8);
    let bridge = EventBridge::unbounded();
    let pool = TaskPool::new(2, &bridge).unwrap();
    let counter = Arc::new(AtomicU32::new(0));

    let calls = counter.clone();
    let handle = pool
        .submit(
            move |_: &CancellationToken| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n > 3 {
                    Err(TaskFailure::new("done"))
                } else {
                    Ok(n)
                }
            },
            TaskOptions::looping().emitting(KIND),
        )
        .unwrap();
    pool.wait(&handle, Duration::from_secs(5));

    let results: Vec<_> = bridge.drain().into_iter().map(|event| event.payload).collect();
    assert_eq!(results, vec![Ok(1), Ok(2), Ok(3), Err(TaskFailure::new("done"))]);
    pool.shutdown();
}

#[test]
fn headless_application_runs_every_strategy() {
    for strategy in [
        StrategyKind::Flip,
        StrategyKind::Update,
        StrategyKind::UpdateOnEvent,
        StrategyKind::UpdateDirtyOnEvent,
    ] {
        let config = PreviewConfig {
            display_size: DISPLAY,
            preview_size: Size::new(8, 12),
            max_fps: 1000,
            frame_count: 5,
            workers: 1,
            strategy,
            ..PreviewConfig::default()
        };
        let mut app = ApplicationState::new(config).unwrap();
        let (stats, sink) = app.run_headless().unwrap();
        assert_eq!(stats.frames, 5);
        assert_eq!(sink.size(), DISPLAY);
    }
}

#[test]
fn fit_scenarios() {
    let source = Size::new(1920, 1080);
    let target = Size::new(400, 300);
    assert_eq!(fit_size(source, target, FitMode::Inner).unwrap(), Size::new(400, 225));
    assert_eq!(fit_size(source, target, FitMode::Outer).unwrap(), Size::new(533, 300));
}
