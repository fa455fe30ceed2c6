pub mod cache;
pub mod monkey;
pub mod source;

pub use cache::{MonkeyCache, MonkeyError, DEFAULT_EXPIRATION};
pub use monkey::{Monkey, MonkeyField};
pub use source::{FetchError, HttpMonkeySource, MonkeySource};
