#![no_std]

pub mod dns;
pub mod engine;
pub mod wait;
