mod descriptor;
mod options;
mod url;

pub(crate) use descriptor::parse_header;
pub use descriptor::{RequestDefaults, RequestDescriptor};
pub use options::{FetchOptions, RequestBody};
pub use url::{build_url, merge_query};
