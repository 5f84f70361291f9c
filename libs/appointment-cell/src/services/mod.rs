pub mod availability;
pub mod lifecycle;
pub mod scheduling;

pub use availability::AvailabilityService;
pub use lifecycle::AppointmentLifecycleService;
pub use scheduling::AppointmentSchedulerService;
