pub mod constants;
pub mod interpolate;
pub mod motion;
pub mod moves;
pub mod net;
pub mod protocol;
pub mod role;
pub mod sim;
pub mod time;
