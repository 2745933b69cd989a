//! Request extraction, assertion construction and response dispatch

pub mod assertion_builder;
pub mod request_parser;
pub mod response_dispatcher;

pub use assertion_builder::{AssertionBuilder, ResponseDocument};
pub use request_parser::{ExtractedRequest, RequestParser};
pub use response_dispatcher::{PostResponse, ResponseDispatcher};
