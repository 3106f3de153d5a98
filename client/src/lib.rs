pub mod input;
pub mod net;
pub mod predict;
pub mod proxy;
pub mod run;
pub mod session;
pub mod time;

pub mod test_helpers;
