pub mod canvas;
pub mod gamepad;
pub mod input;
pub mod nav;
pub mod renderer;
pub mod sound;
pub mod touch;
