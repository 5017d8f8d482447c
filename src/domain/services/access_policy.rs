//! Role-based access rules.
//!
//! Every request is made on behalf of an [`Actor`]. Administrators can do
//! everything; other roles only reach records they own. Booking visibility
//! additionally depends on the therapist/affiliate profile behind the actor,
//! captured by [`BookingViewer`].

use crate::domain::entities::{Booking, BookingFilter, BookingStatus, BookingVisibility, UserRole};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins, or the user the record belongs to.
    pub fn is_self_or_admin(&self, owner_user_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_user_id
    }
}

/// An actor together with the profiles that grant booking access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingViewer {
    pub actor: Actor,
    /// Therapist profile owned by the actor, if any
    pub therapist_id: Option<i64>,
    /// Affiliate profile owned by the actor, if any
    pub affiliate_id: Option<i64>,
}

impl BookingViewer {
    /// Records a non-admin viewer can reach. Listing and single reads both
    /// go through it.
    pub fn visibility(&self) -> BookingVisibility {
        BookingVisibility {
            therapist_id: self.therapist_id,
            affiliate_id: self.affiliate_id,
            client_user_id: self.actor.user_id,
        }
    }

    /// Narrow a listing filter to what the viewer may see.
    pub fn restrict(&self, mut filter: BookingFilter) -> BookingFilter {
        filter.visible_to = if self.actor.is_admin() {
            None
        } else {
            Some(self.visibility())
        };
        filter
    }

    pub fn can_view(&self, booking: &Booking) -> bool {
        self.actor.is_admin() || self.visibility().admits(booking)
    }

    /// Admins and the booking's therapist may set any status; the client who
    /// made the booking may only cancel it.
    pub fn can_set_status(&self, booking: &Booking, status: BookingStatus) -> bool {
        if self.actor.is_admin() || self.owns_as_therapist(booking) {
            return true;
        }
        status == BookingStatus::Cancelled && booking.client_user_id == Some(self.actor.user_id)
    }

    fn owns_as_therapist(&self, booking: &Booking) -> bool {
        self.therapist_id == Some(booking.therapist_id)
    }
}
