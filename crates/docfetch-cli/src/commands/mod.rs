pub mod cat;
pub mod path;
pub mod resolve;
