//! Livecanvas keeps remote 2D drawing surfaces in sync with live, periodically fetched data.
//!
//! The moving parts:
//!
//! - [`Scene`]: an arena of [`RenderObject`]s whose positions follow [`FlightPlan`]s
//! - [`CommandBatch`]: drawing commands encoded into one payload per frame, flipped onto the
//!   display surface in a single step
//! - [`Controller`]: data sources fetched on cooldowns, merged into per-renderer views, and
//!   [`LayerRenderer`]s recomputed only when their inputs changed
//! - [`Engine`]: the scheduler, refresh, and hover loops driving any number of [`Viewer`]s
#![forbid(unsafe_code)]

pub mod control;
pub mod data;
pub mod draw;
pub mod foundation;
pub mod motion;
pub mod scene;
pub mod session;

pub use crate::foundation::core::{Coords, Seconds, now_secs};
pub use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};

pub use crate::control::controller::{Controller, ControllerConfig, TickReport};
pub use crate::control::executor::{FetchExecutor, InlineExecutor, PendingFetch, PoolExecutor};
pub use crate::data::dataset::{Dataset, Row, merge_views};
pub use crate::data::renderer::{LayerRenderer, OptionValue, OptionValues, RendererOption};
pub use crate::data::source::{DataSource, Fetch, SourceStatus};
pub use crate::draw::batch::{CommandBatch, DrawOp, Primitive};
pub use crate::draw::style::{Rgba, StyleKey, StyleValue};
pub use crate::draw::transport::{Panel, PointerState, RecordingTransport, SurfaceTransport};
pub use crate::motion::bounce::{BounceHandler, FnHandler, PlacementFrame, TrajectoryDecisionHandler};
pub use crate::motion::flight::{FlightPlan, FlightState};
pub use crate::motion::trajectory::Trajectory;
pub use crate::scene::node::{GlowSpec, NodeProps, RenderObject, Shape};
pub use crate::scene::tree::{HitSelection, NodeId, Scene};
pub use crate::session::engine::{Engine, EngineConfig};
pub use crate::session::viewer::{Viewer, ViewerConfig};
