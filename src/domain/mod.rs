pub mod event;
pub mod record;
pub mod signature_request;
