use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod events;
pub mod games;
pub mod health;
pub mod metrics;
pub mod recovery;

fn format_deadline(deadline: OffsetDateTime) -> String {
    deadline
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
