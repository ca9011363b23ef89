//! quill-cache - prompt-cache checkpoint planning.
//!
//! Providers accept a handful of reusable checkpoint boundaries per request.
//! The planner places a new one whenever the text accumulated since the last
//! checkpoint reaches [`MIN_TOKENS_FOR_CACHE`], keeping at most
//! [`MAX_CACHE_MARKERS`] of them; the oldest lapses first.
//!
//! Markers are absolute positions into the window history at the time they
//! were created. Window eviction shifts that history, so an old marker can
//! later point at a different message or past the end. [`CheckpointPlanner::apply_markers`]
//! silently skips out-of-range positions. This loss of a justified
//! checkpoint is known and deliberately left unreconciled.

mod planner;
mod render;
mod state;

pub use planner::{CheckpointPlanner, MAX_CACHE_MARKERS, MIN_TOKENS_FOR_CACHE};
pub use render::{ProviderBackend, RenderedRequest, render_request};
pub use state::CacheState;
