#![cfg_attr(not(test), no_std)]

//! Board-independent logic for the Kibble fact badge: fonts, column rendering,
//! serpentine pixel mapping, the scroll engine and the settings menu.

pub mod connectivity;
pub mod facts;
pub mod font;
pub mod http;
pub mod input;
pub mod menu;
pub mod render;
pub mod scroll;
pub mod settings;
pub mod text_policy;
pub mod time;
