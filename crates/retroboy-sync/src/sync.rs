pub mod controller;
pub mod cursor;
pub mod reset;
pub mod session;
pub mod stats;
pub mod timer;
pub mod trigger;
