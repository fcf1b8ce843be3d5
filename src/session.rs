//! Entry and exit workflows.
//!
//! A [`Session`] coordinates the spot inventory, the ticket ledger and the
//! fare calculator. Per vehicle the lifecycle is NONE → OPEN → CLOSED; a
//! new entry after CLOSED starts a fresh ticket.
//!
//! The time source is injected through the [`Clock`] trait so tests can
//! run against a deterministic clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::construct::{Facility, SpotId, SpotType, TicketId};
use crate::error::Result;
use crate::fare::{compute_fare, FareSchedule};

/// Source of "now" for entry and exit timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The default clock: plain wall-clock UTC.
pub struct WallClock;
impl Clock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What the driver gets at the gate on the way in.
#[derive(Clone, Copy, Debug)]
pub struct EntryReceipt {
    pub ticket: TicketId,
    pub spot: SpotId,
    pub in_time: DateTime<Utc>,
}

/// What the driver pays on the way out.
#[derive(Clone, Copy, Debug)]
pub struct ExitReceipt {
    pub ticket: TicketId,
    pub price: f64,
    pub out_time: DateTime<Utc>,
}

pub struct Session {
    facility: Arc<Facility>,
    schedule: FareSchedule,
    clock: Arc<dyn Clock>,
}

impl Session {
    pub fn new(facility: Arc<Facility>, schedule: FareSchedule) -> Session {
        Self::with_clock(facility, schedule, Arc::new(WallClock))
    }

    pub fn with_clock(
        facility: Arc<Facility>,
        schedule: FareSchedule,
        clock: Arc<dyn Clock>,
    ) -> Session {
        Session {
            facility,
            schedule,
            clock,
        }
    }

    /// Claims a spot and opens a ticket for the vehicle.
    ///
    /// When no ticket can be created, the claimed spot is released again
    /// before the error is returned, so a rejected entry never leaks a
    /// spot. A full pool surfaces as `NotAvailable`, a vehicle that is
    /// already parked as `DuplicateOpenTicket`.
    pub fn process_entry(&self, registration: &str, spot_type: SpotType) -> Result<EntryReceipt> {
        let spot = self.facility.claim_spot(spot_type)?;
        let in_time = self.clock.now();
        match self
            .facility
            .create_ticket(registration, spot, spot_type, in_time)
        {
            Ok(ticket) => {
                info!(registration, spot, ticket, "vehicle parked");
                Ok(EntryReceipt {
                    ticket,
                    spot,
                    in_time,
                })
            }
            Err(creation) => {
                if let Err(release) = self.facility.release_spot(spot) {
                    warn!(spot, error = %release, "could not release spot after rejected entry");
                }
                warn!(registration, error = %creation, "entry rejected");
                Err(creation)
            }
        }
    }

    /// Closes the vehicle's open ticket, prices the stay and frees the
    /// spot.
    ///
    /// The ticket closure is committed before the spot release, so an
    /// interruption between the two steps can only leave a closed ticket
    /// with a still-unavailable spot, never an open ticket on a spot that
    /// shows available.
    pub fn process_exit(&self, registration: &str) -> Result<ExitReceipt> {
        let ticket = self.facility.get_open_ticket(registration)?;
        let recurrent = self.facility.prior_ticket_count(registration)? > 0;
        let out_time = self.clock.now();
        let price = compute_fare(
            ticket.in_time(),
            out_time,
            ticket.spot_type(),
            recurrent,
            &self.schedule,
        )?;
        self.facility.close_ticket(ticket.ticket(), out_time, price)?;
        self.facility.release_spot(ticket.spot())?;
        info!(registration, ticket = ticket.ticket(), price, "vehicle exited");
        Ok(ExitReceipt {
            ticket: ticket.ticket(),
            price,
            out_time,
        })
    }
}
