pub mod credential;
pub mod filter;
pub mod list;
pub mod media;
pub mod media_ids;
pub mod page;

pub use credential::{Credential, UserRef};
pub use filter::{FilterError, FilterSpec, Range, SearchField};
pub use list::{ListState, RemoteList};
pub use media::{MediaItem, MediaKey, MediaKind};
pub use media_ids::MediaIds;
pub use page::{Page, PageCursor};
