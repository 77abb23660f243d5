pub mod process;
pub mod validate;
