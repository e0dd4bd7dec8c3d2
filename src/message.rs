//! Client-facing message texts and WhatsApp deep links. Nothing is sent from
//! here: the admin opens the link and sends the pre-filled message by hand.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Appointment, AppointmentStatus};
use crate::timeofday::pretty_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Confirmation,
    Rejection,
    Update,
    Reminder,
}

impl MessageKind {
    /// The message that announces an appointment's current status.
    pub fn for_status(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Confirmed => MessageKind::Confirmation,
            AppointmentStatus::Rejected => MessageKind::Rejection,
            AppointmentStatus::Request | AppointmentStatus::Cancelled => MessageKind::Update,
        }
    }
}

/// The structured appointment data a message is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContext {
    pub kind: MessageKind,
    pub client_name: String,
    pub client_phone: String,
    pub service_name: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub status: AppointmentStatus,
}

impl MessageContext {
    pub fn new(kind: MessageKind, appointment: &Appointment, service_name: Option<String>) -> Self {
        Self {
            kind,
            client_name: appointment.client_name.clone(),
            client_phone: appointment.client_phone.clone(),
            service_name,
            date: appointment.date,
            start_time: appointment.start_time(),
            status: appointment.status,
        }
    }
}

pub fn render(ctx: &MessageContext, studio_name: &str) -> String {
    let date = pretty_date(ctx.date);
    let service_line = ctx
        .service_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| format!("Service: {s}\n"))
        .unwrap_or_default();
    let name = &ctx.client_name;
    let time = &ctx.start_time;

    match ctx.kind {
        MessageKind::Confirmation => format!(
            "Hi {name}! Your appointment at {studio_name} on {date} at {time} is confirmed.\n\
             {service_line}Please reply OK to confirm."
        ),
        MessageKind::Rejection => format!(
            "Hi {name}, unfortunately we can't take your appointment on {date} at {time}.\n\
             {service_line}Reply here and we'll find another time."
        ),
        MessageKind::Update => format!(
            "Hi {name}, your appointment on {date} at {time} has been updated: it is now {}.\n\
             {service_line}",
            ctx.status
        ),
        MessageKind::Reminder => format!(
            "Hi {name}! A reminder of your appointment at {studio_name} on {date} at {time}.\n\
             {service_line}If you can't make it, let us know so we can free the slot."
        ),
    }
}

/// Keep only the digits of a phone number, as `wa.me` expects.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `https://wa.me/<digits>?text=<encoded>`; without a usable phone the link
/// opens WhatsApp's contact picker instead.
pub fn whatsapp_link(text: &str, phone: &str) -> String {
    let digits = phone_digits(phone);
    let encoded = urlencoding::encode(text);
    if digits.is_empty() {
        format!("https://wa.me/?text={encoded}")
    } else {
        format!("https://wa.me/{digits}?text={encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(kind: MessageKind, status: AppointmentStatus) -> MessageContext {
        MessageContext {
            kind,
            client_name: "Ana".into(),
            client_phone: "+54 9 11 5555-0000".into(),
            service_name: Some("Gel manicure".into()),
            date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            start_time: "10:00".into(),
            status,
        }
    }

    #[test]
    fn kind_follows_status() {
        assert_eq!(
            MessageKind::for_status(AppointmentStatus::Confirmed),
            MessageKind::Confirmation
        );
        assert_eq!(
            MessageKind::for_status(AppointmentStatus::Rejected),
            MessageKind::Rejection
        );
        assert_eq!(
            MessageKind::for_status(AppointmentStatus::Cancelled),
            MessageKind::Update
        );
    }

    #[test]
    fn confirmation_mentions_studio_date_and_service() {
        let text = render(
            &ctx(MessageKind::Confirmation, AppointmentStatus::Confirmed),
            "Atomica Nails",
        );
        assert!(text.contains("Atomica Nails"));
        assert!(text.contains("02/02/2026"));
        assert!(text.contains("10:00"));
        assert!(text.contains("Service: Gel manicure"));
    }

    #[test]
    fn missing_service_name_drops_the_line() {
        let mut c = ctx(MessageKind::Reminder, AppointmentStatus::Confirmed);
        c.service_name = None;
        assert!(!render(&c, "studio").contains("Service:"));
    }

    #[test]
    fn update_states_new_status() {
        let text = render(
            &ctx(MessageKind::Update, AppointmentStatus::Cancelled),
            "studio",
        );
        assert!(text.contains("cancelled"));
    }

    #[test]
    fn link_uses_digits_only() {
        let link = whatsapp_link("Hi there", "+54 9 11 5555-0000");
        assert_eq!(link, "https://wa.me/5491155550000?text=Hi%20there");
    }

    #[test]
    fn link_without_phone() {
        assert_eq!(
            whatsapp_link("a&b\n", "n/a"),
            "https://wa.me/?text=a%26b%0A"
        );
    }
}
