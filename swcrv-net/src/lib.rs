// swcrv-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{build_http_client, download_to_file, fetch_optional_text, fetch_release_tags, DownloadedFile};
pub use validation::validate_url;
