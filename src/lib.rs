//! Unsaved-changes tracking for form pages.
//!
//! [`Page`] is a deterministic, in-memory page: a DOM built from HTML, an
//! event dispatcher, and a virtual clock. On top of it sits the tracker
//! ([`SafeEdits`]) that marks registered form controls as *blocked* when
//! their live value drifts from the value captured at registration, and a
//! navigation guard that vetoes `beforeunload` while anything is dirty.
//!
//! ```
//! use safe_edits::Page;
//!
//! # fn main() -> safe_edits::Result<()> {
//! let mut page = Page::from_html(r#"
//!   <form id='profile'>
//!     <input id='name' value='foo'>
//!   </form>
//! "#)?;
//! page.register("profile")?;
//! page.activate();
//!
//! page.type_text("#name", "bar")?;
//! assert!(page.is_dirty());
//! assert!(page.request_unload().vetoed());
//!
//! page.type_text("#name", "foo")?;
//! assert!(!page.is_dirty());
//! # Ok(())
//! # }
//! ```

mod dom;
mod events;
mod guard;
mod html;
mod options;
mod page;
mod selector;
mod timers;
mod tracker;
mod value;

pub use dom::NodeId;
pub use guard::{BeforeUnloadOutcome, GuardState};
pub use options::{Options, TraceOptions};
pub use page::{DirtyNotification, Page};
pub use timers::{PendingTimer, TimerId};
pub use tracker::SafeEdits;
pub use value::ControlValue;

/// Overrides the comparable value of a tracked element.
pub const ATTR_VALUE: &str = "data-safe-edits-value";
/// Mirrored onto every registered element.
pub const ATTR_MEMBER: &str = "data-safe-edits-member";
/// Mirrored while an element's live value differs from its original.
pub const ATTR_BLOCK: &str = "data-safe-edits-block";
/// Mirrored while a bypass marker is held by an element.
pub const ATTR_BYPASS: &str = "data-safe-edits-bypass";
/// Marks the scope a reset trigger clears.
pub const ATTR_CONTAINER: &str = "data-safe-edits-container";

/// Event dispatched on the document after every tracker state change.
pub const DIRTY_EVENT: &str = "safe_edits:dirty";

pub const DEFAULT_TRACKED_TAGS: &str = "input,select";
pub const DEFAULT_TRACKED_EVENT: &str = "input";
pub const DEFAULT_TRIGGER_TAGS: &str = "input";
pub const DEFAULT_TRIGGER_EVENT: &str = "click";
pub const DEFAULT_BYPASS_EXPIRY_MS: i64 = 500;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("registration container not found: #{0}")]
    ContainerNotFound(String),
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(
        "timer queue exceeded max steps: limit={limit}, now_ms={now_ms}, pending_tasks={pending}"
    )]
    TimerStepLimit {
        limit: usize,
        now_ms: i64,
        pending: usize,
    },
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
