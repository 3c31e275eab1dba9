//! Ready-made middleware.
//!
//! - [`BodyParser`]: decodes text, JSON and urlencoded form bodies into
//!   [`ParsedBody`](crate::ParsedBody)
//! - [`RequestLogger`]: logs each request as it enters the chain

mod body;
mod logger;

pub use body::BodyParser;
pub use logger::RequestLogger;
