//! Request collectors: stateful accumulators over a run of numeric replies
//! that only resolve once their terminating numeric arrives (spec.md §4.4).

pub mod dns;
pub mod list;
pub mod modes;
pub mod who;
pub mod whois;

pub use dns::DnsCollector;
pub use list::ListCollector;
pub use modes::ModeListCollector;
pub use who::WhoCollector;
pub use whois::WhoisCollector;
