pub mod event;
pub mod parse;
