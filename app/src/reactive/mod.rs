mod debounce;
mod join;
mod keyed;

pub use debounce::Debouncer;
pub use join::{Join, JoinArena};
pub use keyed::{KeyedReplay, Subscription};
