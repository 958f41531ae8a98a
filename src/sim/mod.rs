pub mod deferred;
pub mod event;
pub mod frame_loop;
pub mod session;
pub mod store;
