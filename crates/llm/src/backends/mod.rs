mod echo;
mod http;

pub use echo::EchoBackend;
pub use http::HttpBackend;
