pub mod assignment_service;
pub mod payment_service;
