//! SketchSync Core Library
//!
//! Scene and synchronization engine for the SketchSync collaborative board:
//! camera, element model, tools, history and the sync manager.

pub mod autosave;
pub mod camera;
pub mod canvas;
pub mod collaboration;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod history;
pub mod input;
pub mod render;
pub mod scene;
pub mod selection;
pub mod services;
pub mod shapes;
pub mod shortcuts;
pub mod sync;
pub mod tools;

pub use camera::Camera;
pub use canvas::{Canvas, CanvasDocument};
pub use collaboration::{ConnectionState, SyncEvent, SyncManager};
pub use config::SyncConfig;
pub use error::{CoreError, CoreResult, ErrorKind, ErrorReport, LogTelemetry, Severity, SyncError, Telemetry};
pub use events::{EventBus, Origin, SceneObserver};
pub use history::History;
pub use input::{InputState, Modifiers, MouseButton, PointerEvent};
pub use render::{DrawContext, Painter};
pub use scene::{Scene, SceneDiff};
pub use services::{BoardId, BoardMetadata, Credential, Credentials, ImageStore, InlineImageStore, StaticCredentials};
pub use shapes::{Anchor, Element, ElementBehavior, ElementId, ElementKind, ElementRegistry};
pub use sync::{ClientMessage, NativeTransport, Participant, RemoteCursor, ServerMessage, Transport, TransportEvent};
pub use tools::{ExternalTool, ShapeKind, TextRequest, ToolContext, ToolKind, ToolManager, ToolPreview};
