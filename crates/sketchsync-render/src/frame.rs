//! Per-frame error boundary.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use sketchsync_core::canvas::Canvas;
use sketchsync_core::error::{ErrorKind, ErrorReport, LogTelemetry, Severity, Telemetry};
use sketchsync_core::render::Painter;
use sketchsync_core::sync::Transport;

use crate::renderer::{FrameStats, RenderContext, RenderError, RenderResult, build_frame};

/// Runs frames so that one bad frame never takes down the loop.
///
/// Errors and panics are logged every time and reported to telemetry once
/// per distinct message.
pub struct FrameLoop {
    telemetry: Box<dyn Telemetry>,
    reported: HashSet<String>,
    frames: u64,
    failures: u64,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(Box::new(LogTelemetry))
    }
}

impl FrameLoop {
    pub fn new(telemetry: Box<dyn Telemetry>) -> Self {
        Self {
            telemetry,
            reported: HashSet::new(),
            frames: 0,
            failures: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Prepare and draw one canvas frame.
    pub fn render<T: Transport>(&mut self, canvas: &mut Canvas<T>, painter: &mut dyn Painter) -> Option<FrameStats> {
        self.run(|| {
            canvas.prepare_frame(painter);
            let cursors = canvas.remote_cursors();
            let ctx = RenderContext::new(canvas.scene(), &canvas.camera, canvas.registry())
                .with_preview(canvas.tool_preview())
                .with_cursors(&cursors);
            build_frame(&ctx, painter)
        })
    }

    /// Run `frame` inside the boundary. Returns `None` if it failed.
    pub fn run<R>(&mut self, frame: impl FnOnce() -> RenderResult<R>) -> Option<R> {
        self.frames += 1;
        let error = match catch_unwind(AssertUnwindSafe(frame)) {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(e)) => e,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                RenderError::Panicked(message)
            }
        };
        self.fail(error);
        None
    }

    fn fail(&mut self, error: RenderError) {
        self.failures += 1;
        let message = error.to_string();
        log::error!("Frame {} failed: {}", self.frames, message);
        if self.reported.insert(message.clone()) {
            let report = ErrorReport::new(ErrorKind::Application, Severity::Error, message).with_context("render");
            self.telemetry.report(&report);
        }
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("frames", &self.frames)
            .field("failures", &self.failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_list::DisplayList;
    use kurbo::Point;
    use sketchsync_core::config::SyncConfig;
    use sketchsync_core::error::SyncError;
    use sketchsync_core::input::{Modifiers, MouseButton, PointerEvent};
    use sketchsync_core::shapes::ElementKind;
    use sketchsync_core::sync::TransportEvent;
    use sketchsync_core::tools::{ShapeKind, ToolKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Collect(Rc<RefCell<Vec<ErrorReport>>>);

    impl Telemetry for Collect {
        fn report(&self, report: &ErrorReport) {
            self.0.borrow_mut().push(report.clone());
        }
    }

    /// Transport that never connects.
    struct Offline;

    impl Transport for Offline {
        fn connect(&mut self, _url: &str) -> Result<(), SyncError> {
            Ok(())
        }
        fn send(&mut self, _text: &str) -> Result<(), SyncError> {
            Err(SyncError::Transport("offline".into()))
        }
        fn disconnect(&mut self) {}
        fn poll_events(&mut self) -> Vec<TransportEvent> {
            Vec::new()
        }
    }

    fn frame_loop() -> (FrameLoop, Rc<RefCell<Vec<ErrorReport>>>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let reports = Rc::new(RefCell::new(Vec::new()));
        (FrameLoop::new(Box::new(Collect(reports.clone()))), reports)
    }

    #[test]
    fn test_errors_reported_once_per_message() {
        let (mut frames, reports) = frame_loop();
        for _ in 0..3 {
            let out: Option<()> = frames.run(|| Err(RenderError::RenderFailed("gpu lost".into())));
            assert!(out.is_none());
        }
        let out: Option<()> = frames.run(|| Err(RenderError::RenderFailed("other".into())));
        assert!(out.is_none());
        assert_eq!(frames.failures(), 4);
        assert_eq!(reports.borrow().len(), 2);
        assert_eq!(reports.borrow()[0].error_type, ErrorKind::Application);
        assert_eq!(reports.borrow()[0].context, "render");
    }

    #[test]
    fn test_panic_is_contained() {
        let (mut frames, reports) = frame_loop();
        let out: Option<u32> = frames.run(|| panic!("bad element"));
        assert!(out.is_none());
        assert_eq!(reports.borrow()[0].message, "Frame panicked: bad element");
        assert_eq!(frames.run(|| Ok(7)), Some(7));
        assert_eq!(frames.frames(), 2);
    }

    #[test]
    fn test_render_canvas_with_preview() {
        let (mut frames, reports) = frame_loop();
        let mut canvas = Canvas::new(Offline, SyncConfig::default(), Vec::new());
        canvas.set_tool(ToolKind::Shape(ShapeKind::Rect));
        canvas.handle_pointer(
            PointerEvent::Down {
                position: Point::new(10.0, 10.0),
                button: MouseButton::Left,
            },
            Modifiers::NONE,
        );
        canvas.handle_pointer(
            PointerEvent::Move {
                position: Point::new(80.0, 60.0),
            },
            Modifiers::NONE,
        );

        let mut list = DisplayList::new();
        let stats = frames.render(&mut canvas, &mut list).unwrap();
        assert_eq!(stats.drawn, 0);
        // Background, grid, and the preview rectangle's stroke.
        assert_eq!(list.len(), 3);
        assert!(reports.borrow().is_empty());

        canvas.handle_pointer(
            PointerEvent::Up {
                position: Point::new(80.0, 60.0),
                button: MouseButton::Left,
            },
            Modifiers::NONE,
        );
        list.clear();
        let stats = frames.render(&mut canvas, &mut list).unwrap();
        assert_eq!(stats.drawn, 1);
        assert_eq!(canvas.scene().elements()[0].kind, ElementKind::Rect);
    }
}
