pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::appointment_routes;
pub use services::appointments::AppointmentService;
pub use services::autocancel::AutoCancelScheduler;
