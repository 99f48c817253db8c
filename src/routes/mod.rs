pub mod admin_routes;
pub mod application_routes;
pub mod assessment_routes;
pub mod certificate_routes;
pub mod health;
