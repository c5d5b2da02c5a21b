pub mod auth;
pub mod availability;
pub mod bookings;
pub mod calendar;
pub mod cancellation;
pub mod checkout;
pub mod notifications;
pub mod outbox;
pub mod payments;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod testing;
