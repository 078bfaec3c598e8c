pub mod error_body;
pub mod request_id;

pub use error_body::attach_request_id;
pub use request_id::{request_id_layer, RequestIdExt};
