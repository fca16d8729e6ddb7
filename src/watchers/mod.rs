//! Watchers: small stateless-ish policies that react to channel/user events
//! using externally persisted entries (spec.md §4.7).

pub mod autojoin;
pub mod automode;
pub mod contacts;
pub mod ignore;

pub use autojoin::AutoJoinWatcher;
pub use automode::AutoModeWatcher;
pub use contacts::ContactWatcher;
pub use ignore::IgnoreWatcher;
