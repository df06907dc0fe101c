pub mod ast_cache;
pub mod convert;
pub mod document;
pub mod message_handler;
pub mod parse_service;
pub mod providers;
pub mod resolve;
pub mod symbol_index;
