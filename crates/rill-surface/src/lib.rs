//! rill Surface
//!
//! The stateful side of rill: a [`Surface`] owns the content of one streaming
//! message and keeps a region of a [`rill_dom::DomTree`] in sync with it.
//!
//! Per update the surface unbinds host inputs, renders and sanitizes, patches
//! the live tree (or replaces it), highlights code, rebinds, scrolls, places the
//! streaming dot and finally runs the content-changed hook.

pub mod clock;
pub mod config;
pub mod highlight;
pub mod host;
pub mod locate;
pub mod patch;
pub mod router;
pub mod scroll;
pub mod surface;
pub mod throttle;
pub mod tools;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SurfaceConfig;
pub use highlight::{CodeHighlighter, HighlightError};
pub use host::{ClientStatus, Host, HostCall, HostError, HtmlDependency, RecordingHost, TextLayout};
pub use locate::find_innermost_streaming_element;
pub use patch::{patch_children, PatchStats, RenderMode, RenderPlan};
pub use router::{ContentMessage, MessageError, MessageRouter, StreamMessage, StreamingMessage};
pub use scroll::{ScrollBehavior, ScrollController, ScrollRequest};
pub use surface::{Surface, SurfaceError};
pub use throttle::TrailingThrottle;
pub use tools::{ToolRequestBus, ToolRequestSubscription};

pub use rill_render::ContentType;
