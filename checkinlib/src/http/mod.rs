//! A deliberately small HTTP/1.1 server core: one GET request per connection, answered
//! with a full page and then closed.

pub mod connection;
pub mod request;
pub mod response;

pub use connection::{Connection, ConnectionState, Transport};
pub use request::{Route, REQUEST_BUFFER_LEN};
pub use response::{render_page, RenderError, Response, NOT_FOUND, RESPONSE_CAPACITY};
