//! Scraper engine: resilient single-page fetch and title extraction.
mod decode;
mod extract;
mod fetch;
mod retry;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use extract::extract_title;
pub use fetch::{HttpTransport, ReqwestTransport};
pub use retry::{Sleeper, TitleProbe, TokioSleeper};
pub use types::{AttemptOutcome, FailureKind, FetchConfig, FetchResult};
