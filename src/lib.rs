pub mod config;
pub mod exception;
pub mod param;
pub mod pattern;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod util;

pub use config::Config;
pub use exception::Exception;
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use router::{endpoint, handler_fn, BoxedHandler, Chain, Handler, Next, Route, Router};
pub use server::Server;
