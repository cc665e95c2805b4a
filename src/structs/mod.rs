pub mod request;
pub mod respond;
