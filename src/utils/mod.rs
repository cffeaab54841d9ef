pub mod interval;
pub mod logging;
