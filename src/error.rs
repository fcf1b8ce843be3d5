
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::construct::{SpotId, SpotType, TicketId};

#[derive(Error, Debug)]
pub enum LotError {
    #[error("No {spot_type} spot is available")]
    NotAvailable { spot_type: SpotType },
    #[error("Vehicle '{registration}' already has an open ticket")]
    DuplicateOpenTicket { registration: String },
    #[error("Unknown spot: {id}")]
    UnknownSpot { id: SpotId },
    #[error("Unknown ticket: {id}")]
    UnknownTicket { id: TicketId },
    #[error("No open ticket for vehicle '{registration}'")]
    UnknownVehicle { registration: String },
    #[error("Ticket {id} is already closed")]
    AlreadyClosed { id: TicketId },
    #[error("Exit time {out_time} precedes entry time {in_time}")]
    InvalidInterval {
        in_time: DateTime<Utc>,
        out_time: DateTime<Utc>,
    },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, LotError>;

// Helper conversions
impl From<rusqlite::Error> for LotError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<config::ConfigError> for LotError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
