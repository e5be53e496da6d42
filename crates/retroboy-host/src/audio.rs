pub mod driver;
pub mod mixer;
pub mod sink;
