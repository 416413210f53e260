mod macros;
pub mod time;
