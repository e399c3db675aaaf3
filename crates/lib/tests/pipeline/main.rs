mod common;
mod install_tests;
mod resolve_tests;
