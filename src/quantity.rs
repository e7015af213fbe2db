#[macro_use]
pub mod macros;

pub mod current;
pub mod energy;
pub mod power;
pub mod time;
pub mod voltage;
