pub mod fetch;
pub mod symbols;
pub mod top;
