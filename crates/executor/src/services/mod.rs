pub mod cleanup_service;
pub mod dispatch_service;
pub mod message;
pub mod scan_service;
pub mod stores;

/// One outbound Telegram message, already formatted and routed to a forum
/// thread. Queued on a bounded channel between scan and dispatch.
#[derive(Debug, Clone)]
pub struct Notification {
    pub thread_id: i32,
    pub text: String,
}
