pub mod clock;
pub mod date;
pub mod panel;
pub mod rollup;
pub mod sample;
pub mod shift;
