#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod config;
pub mod dhcp;
pub mod dns;
pub mod http;
pub mod outputs;
pub mod query;
pub mod ssd1306;
pub mod synchronizer;
