pub mod bytes;
pub mod secret;
