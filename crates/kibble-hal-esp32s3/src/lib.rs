#![no_std]

//! ESP32-S3 board adapters for the Kibble badge: keyboard, OLED, flash
//! settings and the HTTP fact client.

pub mod input;
pub mod network;
pub mod platform;
pub mod render;
pub mod storage;
