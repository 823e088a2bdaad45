pub mod config;
pub mod logging;

pub mod encoder;
pub mod naming;
pub mod scanner;
pub mod scheduler;
