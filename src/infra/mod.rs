pub mod backend;
pub mod fixture;
