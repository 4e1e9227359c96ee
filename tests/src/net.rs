mod interface_test;
pub mod util;
