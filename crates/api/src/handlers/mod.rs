pub mod contractor;
pub mod file;
pub mod suggestion;
