pub mod cardkb;
