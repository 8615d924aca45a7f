// Library root
// -----------
// Client-side HTTP layer for the Deciphon command-line tool. The binary
// (`main.rs`) drives these modules through the interactive menu in `ui`.
//
// Module responsibilities:
// - `settings`: API URL, API key and timeouts, read once at startup.
// - `transport`: builds and sends one authenticated request.
// - `translate`: turns connection failures into a terminal diagnostic.
// - `progress`: progress bars for uploads and downloads.
// - `api`: the JSON/plain/post/delete operations; `upload` and `download`
//   add the streaming transfers.
// - `ui`: terminal menu on top of `api`.
pub mod api;
pub mod download;
pub mod error;
pub mod progress;
pub mod settings;
pub mod translate;
pub mod transport;
pub mod ui;
pub mod upload;

pub use api::ApiClient;
pub use error::{ConnectivityError, Error};
pub use settings::Settings;
