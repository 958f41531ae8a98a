pub mod camera;
pub mod intent;
pub mod screen;
pub mod viewport;
