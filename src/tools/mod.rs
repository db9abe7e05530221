// Race engine and built-in strategies
pub mod fetch;
