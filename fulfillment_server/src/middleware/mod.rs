mod hmac;
mod shared_secret;

pub use hmac::HmacMiddlewareFactory;
pub use shared_secret::SharedSecretMiddlewareFactory;
