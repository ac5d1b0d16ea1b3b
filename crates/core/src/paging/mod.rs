//! Paginated search over the local cache, backed by the marketplace.
//!
//! - [`RemoteMediator`] fetches a page from the marketplace and writes it to
//!   the cache together with the next remote key.
//! - [`PagedSource`] reads pages of a term's cached results and never touches
//!   the network. A source is invalidated by any cache write.
//! - [`Pager`] ties both together and publishes a [`PagingState`].

mod mediator;
mod pager;
mod source;
mod types;

pub use mediator::RemoteMediator;
pub use pager::Pager;
pub use source::{LoadResult, Page, PagedSource};
pub use types::*;
