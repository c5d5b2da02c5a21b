use crate::models::Booking;

const ICS_FMT: &str = "%Y%m%dT%H%M%S";

/// Single-event iCalendar export for one booking. Times are floating local
/// times, matching how booking dates are interpreted.
pub fn generate_ics(booking: &Booking, site_name: &str) -> String {
    let (start, end) = booking.slot.hours();
    let dtstart = booking.date.and_time(start).format(ICS_FMT).to_string();
    let dtend = booking.date.and_time(end).format(ICS_FMT).to_string();
    let dtstamp = booking.created_at.format(ICS_FMT).to_string();
    let uid = format!("{}@roombook", booking.id);

    let summary = format!("{} - {}", site_name, booking.room.label());
    let description = format!(
        "{}\\nAccess code: {}",
        booking.slot.label(),
        booking.access_code()
    );

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Roombook//Room Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
