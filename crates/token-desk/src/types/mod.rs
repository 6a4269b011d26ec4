pub mod address;
pub mod log;
pub mod token;
