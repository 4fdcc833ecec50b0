pub mod bridge;
pub mod selftest;
