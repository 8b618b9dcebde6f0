pub mod errors;
pub mod db;
pub mod enums;
pub mod tenant;
pub mod member;
pub mod renewal_record;
pub mod course;
pub mod booking;
pub mod payment_order;
pub mod processed_webhook_event;
pub mod audit_log;

#[cfg(test)]
mod tests;
