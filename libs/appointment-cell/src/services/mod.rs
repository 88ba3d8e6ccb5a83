pub mod appointments;
pub mod autocancel;
pub mod lifecycle;
