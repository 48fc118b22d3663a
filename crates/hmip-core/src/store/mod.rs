// ── Reactive home store ──
//
// The home graph is immutable once published. Writers build the next
// graph copy-on-write and swap it in; readers hold whichever graph they
// loaded for as long as they like.

mod graph;
mod home_store;
mod snapshot;

pub use graph::HomeGraph;
pub use home_store::HomeStore;
pub use snapshot::build_graph;
