// used for persistence
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::construct::{PersistenceMode, Spot, SpotId, SpotType, Ticket, TicketId};
use crate::error::{LotError, Result};

// ------------- Persistence -------------
// The persistor owns the SQLite connection and is the only place SQL
// lives. Callers serialize access through the facility's persistor lock;
// the single connection then serializes conflicting writes, which is the
// transactional guarantee the keepers depend on.
pub struct Persistor {
    db: Connection,
}

impl Persistor {
    pub fn new(mode: &PersistenceMode) -> Result<Persistor> {
        let db = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        db.execute_batch(
            "
            create table if not exists Spot (
                Spot_Identity integer not null,
                Spot_Type text not null,
                Available integer not null,
                constraint referenceable_Spot_Identity primary key (
                    Spot_Identity
                )
            );
            create table if not exists Ticket (
                Ticket_Identity integer not null,
                Spot_Identity integer not null,
                Spot_Type text not null,
                Registration text not null,
                In_Time text not null,
                Out_Time text null,
                Price real null,
                constraint Ticket_occupies_Spot foreign key (
                    Spot_Identity
                ) references Spot(Spot_Identity),
                constraint referenceable_Ticket_Identity primary key (
                    Ticket_Identity
                )
            );
            create index if not exists Ticket_by_Registration on Ticket (
                Registration
            );
            ",
        )?;
        Ok(Persistor { db })
    }

    pub fn insert_spot(&self, spot: &Spot) -> Result<()> {
        self.db
            .prepare_cached(
                "
                insert into Spot (
                    Spot_Identity,
                    Spot_Type,
                    Available
                ) values (?, ?, ?)
            ",
            )?
            .execute(params![
                spot.id(),
                spot.spot_type().name(),
                spot.available()
            ])?;
        Ok(())
    }

    pub fn update_spot(&self, id: SpotId, available: bool) -> Result<()> {
        let updated = self
            .db
            .prepare_cached(
                "
                update Spot
                    set Available = ?
                    where Spot_Identity = ?
            ",
            )?
            .execute(params![available, id])?;
        if updated != 1 {
            return Err(LotError::Storage(format!(
                "spot {id} is missing from the store"
            )));
        }
        Ok(())
    }

    pub fn all_spots(&self) -> Result<Vec<Spot>> {
        let mut statement = self.db.prepare_cached(
            "
            select Spot_Identity, Spot_Type, Available
                from Spot
                order by Spot_Identity
        ",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, SpotId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;
        let mut spots = Vec::new();
        for row in rows {
            let (id, type_name, available) = row?;
            let spot_type =
                SpotType::from_name(&type_name).ok_or_else(|| LotError::DataCorruption {
                    message: format!("spot {id} has unknown type '{type_name}'"),
                })?;
            spots.push(Spot::new(id, spot_type, available));
        }
        Ok(spots)
    }

    pub fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.db
            .prepare_cached(
                "
                insert into Ticket (
                    Ticket_Identity,
                    Spot_Identity,
                    Spot_Type,
                    Registration,
                    In_Time,
                    Out_Time,
                    Price
                ) values (?, ?, ?, ?, ?, null, null)
            ",
            )?
            .execute(params![
                ticket.ticket(),
                ticket.spot(),
                ticket.spot_type().name(),
                ticket.registration(),
                ticket.in_time()
            ])?;
        Ok(())
    }

    // The guard on Out_Time makes set-once hold at the store level as
    // well: a closed row can never be closed again.
    pub fn close_ticket(&self, id: TicketId, out_time: DateTime<Utc>, price: f64) -> Result<()> {
        let updated = self
            .db
            .prepare_cached(
                "
                update Ticket
                    set Out_Time = ?,
                        Price = ?
                    where Ticket_Identity = ?
                    and Out_Time is null
            ",
            )?
            .execute(params![out_time, price, id])?;
        if updated != 1 {
            return Err(LotError::DataCorruption {
                message: format!("ticket {id} is not open in the store"),
            });
        }
        Ok(())
    }

    pub fn all_tickets(&self) -> Result<Vec<Ticket>> {
        let mut statement = self.db.prepare_cached(
            "
            select Ticket_Identity, Spot_Identity, Spot_Type, Registration, In_Time, Out_Time, Price
                from Ticket
                order by Ticket_Identity
        ",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, TicketId>(0)?,
                row.get::<_, SpotId>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
                row.get::<_, Option<DateTime<Utc>>>(5)?,
                row.get::<_, Option<f64>>(6)?,
            ))
        })?;
        let mut tickets = Vec::new();
        for row in rows {
            let (id, spot, type_name, registration, in_time, out_time, price) = row?;
            let spot_type =
                SpotType::from_name(&type_name).ok_or_else(|| LotError::DataCorruption {
                    message: format!("ticket {id} has unknown spot type '{type_name}'"),
                })?;
            tickets.push(Ticket::restored(
                id,
                spot,
                spot_type,
                registration,
                in_time,
                out_time,
                price,
            ));
        }
        Ok(tickets)
    }
}
