//! Booking ledger domain.
//!
//! This crate provides:
//! - Aggregate/DomainEvent traits and a command handler with optimistic
//!   concurrency and conflict retry
//! - Room aggregate whose stream doubles as the room's claim calendar
//! - Booking aggregate with booking and payment state machines
//! - Reference registration, which makes booking references unique
//! - `BookingService`, the entry point used by payments and the API

pub mod aggregate;
pub mod booking;
pub mod clock;
pub mod command;
pub mod commands;
pub mod directory;
pub mod error;
pub mod notification;
pub mod pricing;
pub mod reference;
pub mod room;
pub mod service;
pub mod stay;

pub use aggregate::{Aggregate, DomainEvent};
pub use booking::{
    Booking, BookingError, BookingEvent, BookingStatus, GatewayKind, NewBooking, PaymentOutcome,
    PaymentRecord, PaymentStatus,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{Command, CommandHandler, CommandResult};
pub use commands::{ChangeRoomRate, CreateBooking, RegisterRoom, UpdateBooking};
pub use directory::{Guest, InMemoryUserDirectory, UserDirectory};
pub use error::DomainError;
pub use notification::{
    Channel, InMemoryNotificationSink, Notification, NotificationError, NotificationSink,
};
pub use pricing::stay_price;
pub use reference::{
    BookingReference, RandomReferenceGenerator, ReferenceError, ReferenceEvent,
    ReferenceGenerator, ReferenceRegistration, SequenceReferenceGenerator,
};
pub use room::{ReleaseReason, Room, RoomDetails, RoomError, RoomEvent, StayClaim};
pub use service::{BookingConfig, BookingService};
pub use stay::{InvalidDateRange, StayDates};
