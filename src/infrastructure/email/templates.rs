use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::domain::BookingStatus;

/// A subject line and plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmailTemplate {
    Welcome {
        full_name: String,
    },
    BookingReceived {
        client_name: String,
        booking_id: i64,
        service_name: String,
        booking_date: NaiveDate,
        start_time: NaiveTime,
        total_amount: Decimal,
    },
    BookingStatusChanged {
        client_name: String,
        booking_id: i64,
        booking_date: NaiveDate,
        start_time: NaiveTime,
        status: BookingStatus,
    },
    PasswordChanged {
        full_name: String,
    },
}

impl EmailTemplate {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::BookingReceived { .. } => "booking_received",
            Self::BookingStatusChanged { .. } => "booking_status_changed",
            Self::PasswordChanged { .. } => "password_changed",
        }
    }

    pub fn render(&self, frontend_url: &str) -> RenderedEmail {
        let base = frontend_url.trim_end_matches('/');

        match self {
            Self::Welcome { full_name } => RenderedEmail {
                subject: "Welcome aboard".to_string(),
                body: format!(
                    "Hi {full_name},\n\nYour account is ready. Sign in at {base}/login to book your first session.\n"
                ),
            },
            Self::BookingReceived {
                client_name,
                booking_id,
                service_name,
                booking_date,
                start_time,
                total_amount,
            } => RenderedEmail {
                subject: format!("Booking received for {booking_date}"),
                body: format!(
                    "Hi {client_name},\n\nWe received your booking for {service_name} on {booking_date} at {}.\n\
                     Total: {total_amount}\nStatus: pending\n\nDetails: {base}/bookings/{booking_id}\n",
                    start_time.format("%H:%M"),
                ),
            },
            Self::BookingStatusChanged {
                client_name,
                booking_id,
                booking_date,
                start_time,
                status,
            } => RenderedEmail {
                subject: format!("Your booking is now {status}"),
                body: format!(
                    "Hi {client_name},\n\nYour booking on {booking_date} at {} is now {status}.\n\n\
                     Details: {base}/bookings/{booking_id}\n",
                    start_time.format("%H:%M"),
                ),
            },
            Self::PasswordChanged { full_name } => RenderedEmail {
                subject: "Your password was changed".to_string(),
                body: format!(
                    "Hi {full_name},\n\nThe password of your account was just changed and all sessions were signed out.\n\
                     If this wasn't you, reset it at {base}/forgot-password.\n"
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_received_render() {
        let template = EmailTemplate::BookingReceived {
            client_name: "Sam".into(),
            booking_id: 42,
            service_name: "Deep tissue".into(),
            booking_date: NaiveDate::from_ymd_opt(2030, 5, 17).unwrap(),
            start_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            total_amount: Decimal::new(8000, 2),
        };

        let email = template.render("https://app.example.com/");

        assert_eq!(email.subject, "Booking received for 2030-05-17");
        assert!(email.body.contains("Deep tissue on 2030-05-17 at 14:30"));
        assert!(email.body.contains("Total: 80.00"));
        assert!(email.body.contains("https://app.example.com/bookings/42"));
    }

    #[test]
    fn test_status_changed_subject() {
        let template = EmailTemplate::BookingStatusChanged {
            client_name: "Sam".into(),
            booking_id: 1,
            booking_date: NaiveDate::from_ymd_opt(2030, 5, 17).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            status: BookingStatus::Confirmed,
        };

        assert_eq!(template.render("").subject, "Your booking is now confirmed");
        assert_eq!(template.kind(), "booking_status_changed");
    }
}
