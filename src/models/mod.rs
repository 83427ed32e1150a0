pub mod watched_item;

pub use watched_item::{NewItem, WatchedItem};
