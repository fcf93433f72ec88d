mod index;
mod manager;
mod traits;

pub use index::{split_host, TldIndex};
pub use manager::StandardManager;
pub use traits::{BlocklistManager, BlocklistMatcher};
