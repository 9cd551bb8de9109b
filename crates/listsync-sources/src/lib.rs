pub mod error;
pub mod traits;
pub mod trakt;

pub use error::RemoteError;
pub use traits::{BatchOutcome, ListDetails, ListSummary, Privacy, RemoteListApi, SearchTarget, TokenRefresher, ME};
pub use trakt::{RetryPolicy, TraktClient};
