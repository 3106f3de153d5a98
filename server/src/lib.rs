pub mod authority;
pub mod input;
pub mod net;
pub mod run;
pub mod state;

pub mod test_helpers;
