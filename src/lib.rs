// TikTok lookup - Library root

pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http_client;
pub mod kind;
pub mod params;
pub mod query;
pub mod state;

pub use cancel::CancelToken;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, FetchFailure};
pub use kind::RequestKind;
pub use params::RequestParams;
pub use query::EncodingMode;
pub use state::{RequestState, RequestTracker, Session};
