pub mod availability;
pub mod booking;
pub mod cancellation;
pub mod cart;
pub mod events;
pub mod identity;
pub mod pricing;

pub use availability::{availability_matrix, is_available, OccupiedSlot, SlotAvailability};
pub use booking::{Booking, BookingStatus, Room, Slot};
pub use cancellation::{can_cancel, refund_tier, RefundTier};
pub use cart::{CartLine, CheckoutRequest, CheckoutResponse};
pub use events::{AvailabilityEvent, BookingNotice, NotificationKind, OutboxEntry};
pub use identity::Identity;
pub use pricing::price_cents;
