pub mod application;
pub mod assessment;
pub mod attempt;
pub mod certificate;
pub mod question;
pub mod webhook_log;
