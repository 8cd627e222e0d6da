//! Commands accepted by the booking service.

use chrono::NaiveDate;
use common::{AggregateId, Money, RoomId, UserId};

use crate::booking::{Booking, BookingStatus, PaymentStatus};
use crate::command::Command;
use crate::room::{Room, RoomDetails};

/// Command to add a room to the inventory.
#[derive(Debug, Clone)]
pub struct RegisterRoom {
    pub room_id: RoomId,
    pub details: RoomDetails,
    pub nightly_rate: Money,
}

impl RegisterRoom {
    /// Creates a RegisterRoom command with a generated room ID.
    pub fn new(details: RoomDetails, nightly_rate: Money) -> Self {
        Self {
            room_id: RoomId::new(),
            details,
            nightly_rate,
        }
    }
}

impl Command for RegisterRoom {
    type Aggregate = Room;

    fn aggregate_id(&self) -> AggregateId {
        self.room_id.aggregate_id()
    }
}

/// Command to change a room's nightly rate for future bookings.
#[derive(Debug, Clone)]
pub struct ChangeRoomRate {
    pub room_id: RoomId,
    pub nightly_rate: Money,
}

impl Command for ChangeRoomRate {
    type Aggregate = Room;

    fn aggregate_id(&self) -> AggregateId {
        self.room_id.aggregate_id()
    }
}

/// Command to book a room for a guest.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    /// ID the new booking will get.
    pub booking_id: AggregateId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl CreateBooking {
    /// Creates a CreateBooking command with a generated booking ID.
    pub fn new(user_id: UserId, room_id: RoomId, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            booking_id: AggregateId::new(),
            user_id,
            room_id,
            check_in,
            check_out,
        }
    }
}

impl Command for CreateBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Administrative status update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateBooking {
    pub booking_id: AggregateId,
    pub booking_status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl UpdateBooking {
    pub fn new(booking_id: AggregateId) -> Self {
        Self {
            booking_id,
            ..Default::default()
        }
    }

    pub fn booking_status(mut self, status: BookingStatus) -> Self {
        self.booking_status = Some(status);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }
}

impl Command for UpdateBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}
