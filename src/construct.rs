use std::sync::{Mutex, MutexGuard};

// pools are ordered maps so the lowest numbered free spot is always claimed first
use std::collections::BTreeMap;

// other keepers use HashSet or HashMap
use core::hash::BuildHasherDefault;
use std::collections::{HashMap, HashSet};
use seahash::SeaHasher;

// used to print out readable forms of a construct
use std::fmt;

// used for entry and exit timestamps
use chrono::{DateTime, Utc};

// our own stuff that we need
use crate::error::{LotError, Result};
use crate::persist::Persistor;

// ------------- Identities -------------
pub type SpotId = u32;
pub type TicketId = u64;

pub type IdHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: TicketId = 0;

/// Where ledger state lives: a throwaway in-memory SQLite database or a
/// file on disk that survives restarts.
#[derive(Debug, Clone)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// locks are short-lived; a poisoned one means a panic elsewhere and is
// surfaced as an error rather than unwrapped
pub(crate) fn guard<T>(lock: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    lock.lock().map_err(|e| LotError::Lock(e.to_string()))
}

/// Registrations are compared between entry and exit, so one normalization
/// is applied at the ledger boundary: surrounding whitespace is trimmed and
/// ASCII letters are uppercased.
pub fn normalize_registration(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

// ------------- SpotType -------------
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum SpotType {
    Car,
    Bike,
}

impl SpotType {
    pub const ALL: [SpotType; 2] = [SpotType::Car, SpotType::Bike];

    /// Canonical name, also the form stored in the Spot and Ticket tables.
    pub fn name(&self) -> &'static str {
        match self {
            SpotType::Car => "CAR",
            SpotType::Bike => "BIKE",
        }
    }
    pub fn from_name(name: &str) -> Option<SpotType> {
        match name {
            "CAR" => Some(SpotType::Car),
            "BIKE" => Some(SpotType::Bike),
            _ => None,
        }
    }
}
impl fmt::Display for SpotType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- Spot -------------
#[derive(Clone, Debug)]
pub struct Spot {
    id: SpotId,
    spot_type: SpotType,
    available: bool,
}

impl Spot {
    pub fn new(id: SpotId, spot_type: SpotType, available: bool) -> Self {
        Self {
            id,
            spot_type,
            available,
        }
    }
    // It's intentional to encapsulate the fields in the struct
    // and only expose them using "getters", because this yields
    // true immutability for objects after creation.
    pub fn id(&self) -> SpotId {
        self.id
    }
    pub fn spot_type(&self) -> SpotType {
        self.spot_type
    }
    pub fn available(&self) -> bool {
        self.available
    }
}
impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.id, self.spot_type)
    }
}

/// Spots of the given types are numbered in disjoint consecutive ranges
/// (cars first), so a spot id alone identifies a spot facility-wide.
pub fn provision_spots(car_spots: u32, bike_spots: u32) -> Vec<Spot> {
    let mut spots = Vec::with_capacity((car_spots + bike_spots) as usize);
    for id in 1..=car_spots {
        spots.push(Spot::new(id, SpotType::Car, true));
    }
    for id in car_spots + 1..=car_spots + bike_spots {
        spots.push(Spot::new(id, SpotType::Bike, true));
    }
    spots
}

#[derive(Debug)]
pub struct SpotPool {
    spot_type: SpotType,
    spots: BTreeMap<SpotId, bool>, // id -> available
}
impl SpotPool {
    fn new(spot_type: SpotType) -> Self {
        Self {
            spot_type,
            spots: BTreeMap::new(),
        }
    }
    fn insert(&mut self, spot: &Spot) {
        self.spots.insert(spot.id(), spot.available());
    }
    /// Test-and-set: the lowest free id is marked unavailable before it is
    /// handed out, so no two callers can ever be given the same spot.
    fn claim_lowest(&mut self) -> Option<SpotId> {
        let id = self
            .spots
            .iter()
            .find(|(_, available)| **available)
            .map(|(id, _)| *id)?;
        self.spots.insert(id, false);
        Some(id)
    }
    fn set_available(&mut self, id: SpotId, available: bool) {
        self.spots.insert(id, available);
    }
    fn is_available(&self, id: SpotId) -> Option<bool> {
        self.spots.get(&id).copied()
    }
    fn free(&self) -> usize {
        self.spots.values().filter(|available| **available).count()
    }
    pub fn spot_type(&self) -> SpotType {
        self.spot_type
    }
}

// ------------- SpotKeeper -------------
// One pool (and one lock) per spot type, so car and bike traffic
// never contend with each other.
#[derive(Debug)]
pub struct SpotKeeper {
    // which pool a spot belongs to; the inventory is fixed after
    // provisioning, so this index is read without a lock
    index: HashMap<SpotId, SpotType, IdHasher>,
    car: Mutex<SpotPool>,
    bike: Mutex<SpotPool>,
}
impl SpotKeeper {
    pub fn from_spots(spots: &[Spot]) -> Result<Self> {
        let mut index = HashMap::<SpotId, SpotType, IdHasher>::default();
        let mut car = SpotPool::new(SpotType::Car);
        let mut bike = SpotPool::new(SpotType::Bike);
        for spot in spots {
            if index.insert(spot.id(), spot.spot_type()).is_some() {
                return Err(LotError::DataCorruption {
                    message: format!("spot {} occurs more than once", spot.id()),
                });
            }
            match spot.spot_type() {
                SpotType::Car => car.insert(spot),
                SpotType::Bike => bike.insert(spot),
            }
        }
        Ok(Self {
            index,
            car: Mutex::new(car),
            bike: Mutex::new(bike),
        })
    }
    pub fn pool(&self, spot_type: SpotType) -> &Mutex<SpotPool> {
        match spot_type {
            SpotType::Car => &self.car,
            SpotType::Bike => &self.bike,
        }
    }
    pub fn spot_type_of(&self, id: SpotId) -> Option<SpotType> {
        self.index.get(&id).copied()
    }
    /// Total provisioned spots of the type, not the free count.
    pub fn count_by_type(&self, spot_type: SpotType) -> usize {
        self.index.values().filter(|t| **t == spot_type).count()
    }
}

// ------------- Ticket -------------
#[derive(Clone, Debug)]
pub struct Ticket {
    ticket: TicketId,
    spot: SpotId,
    spot_type: SpotType,
    registration: String,
    in_time: DateTime<Utc>,
    out_time: Option<DateTime<Utc>>,
    price: Option<f64>,
}

impl Ticket {
    /// A freshly created ticket is always open: no exit time, no price.
    pub fn new(
        ticket: TicketId,
        spot: SpotId,
        spot_type: SpotType,
        registration: String,
        in_time: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket,
            spot,
            spot_type,
            registration,
            in_time,
            out_time: None,
            price: None,
        }
    }
    // The restore function is necessary when restoring an existing
    // persisted ledger, where closed tickets carry all fields.
    pub fn restored(
        ticket: TicketId,
        spot: SpotId,
        spot_type: SpotType,
        registration: String,
        in_time: DateTime<Utc>,
        out_time: Option<DateTime<Utc>>,
        price: Option<f64>,
    ) -> Self {
        Self {
            ticket,
            spot,
            spot_type,
            registration,
            in_time,
            out_time,
            price,
        }
    }
    pub fn ticket(&self) -> TicketId {
        self.ticket
    }
    pub fn spot(&self) -> SpotId {
        self.spot
    }
    pub fn spot_type(&self) -> SpotType {
        self.spot_type
    }
    pub fn registration(&self) -> &str {
        &self.registration
    }
    pub fn in_time(&self) -> DateTime<Utc> {
        self.in_time
    }
    pub fn out_time(&self) -> Option<DateTime<Utc>> {
        self.out_time
    }
    pub fn price(&self) -> Option<f64> {
        self.price
    }
    pub fn is_open(&self) -> bool {
        self.out_time.is_none()
    }
}

// ------------- TicketIdGenerator -------------
#[derive(Debug)]
pub struct TicketIdGenerator {
    lower_bound: TicketId,
    issued: HashSet<TicketId, IdHasher>,
    released: Vec<TicketId>,
}

impl TicketIdGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: GENESIS,
            issued: HashSet::<TicketId, IdHasher>::default(),
            released: Vec::new(),
        }
    }
    // The retain function is necessary when restoring an existing
    // persisted ledger, so generation resumes above every issued id.
    pub fn retain(&mut self, t: TicketId) {
        self.issued.insert(t);
        if t > self.lower_bound {
            self.lower_bound = t;
        }
    }
    pub fn check(&self, t: TicketId) -> bool {
        self.issued.contains(&t)
    }
    // An id is released only when its ticket never reached the store,
    // so the numbering stays gapless.
    pub fn release(&mut self, t: TicketId) {
        if self.issued.remove(&t) {
            self.released.push(t);
        }
    }
    pub fn generate(&mut self) -> TicketId {
        let id = self.released.pop().unwrap_or_else(|| {
            self.lower_bound += 1;
            self.lower_bound
        });
        self.issued.insert(id);
        id
    }
}

// ------------- TicketKeeper -------------
#[derive(Debug)]
pub struct TicketKeeper {
    open_by_registration: HashMap<String, Ticket, OtherHasher>,
    // double indexing, but open tickets should be few so it's not a big deal
    open_registration_by_ticket: HashMap<TicketId, String, IdHasher>,
    created: HashMap<String, usize, OtherHasher>,
}
impl TicketKeeper {
    pub fn new() -> Self {
        Self {
            open_by_registration: HashMap::default(),
            open_registration_by_ticket: HashMap::default(),
            created: HashMap::default(),
        }
    }
    pub fn has_open(&self, registration: &str) -> bool {
        self.open_by_registration.contains_key(registration)
    }
    pub fn open_ticket(&self, registration: &str) -> Option<&Ticket> {
        self.open_by_registration.get(registration)
    }
    pub fn open_registration(&self, ticket: TicketId) -> Option<String> {
        self.open_registration_by_ticket.get(&ticket).cloned()
    }
    pub fn keep_open(&mut self, ticket: Ticket) {
        let registration = ticket.registration().to_owned();
        *self.created.entry(registration.clone()).or_insert(0) += 1;
        self.open_registration_by_ticket
            .insert(ticket.ticket(), registration.clone());
        self.open_by_registration.insert(registration, ticket);
    }
    pub fn close_open(&mut self, registration: &str) {
        if let Some(ticket) = self.open_by_registration.remove(registration) {
            self.open_registration_by_ticket.remove(&ticket.ticket());
        }
    }
    pub fn restore(&mut self, ticket: Ticket) {
        let registration = ticket.registration().to_owned();
        *self.created.entry(registration.clone()).or_insert(0) += 1;
        if ticket.is_open() {
            self.open_registration_by_ticket
                .insert(ticket.ticket(), registration.clone());
            self.open_by_registration.insert(registration, ticket);
        }
    }
    /// Tickets for the registration strictly before the current session:
    /// the currently open one, if any, is excluded.
    pub fn prior_count(&self, registration: &str) -> usize {
        let total = self.created.get(registration).copied().unwrap_or(0);
        if self.has_open(registration) {
            total.saturating_sub(1)
        } else {
            total
        }
    }
}

// ------------- Facility -------------
// This wires the keepers and the persistor together. The composite
// operations below each lock the owning keeper first and the persistor
// second, and hold the keeper lock across the store write, so every
// operation is all-or-nothing with respect to concurrent callers.
pub struct Facility {
    spots: SpotKeeper,
    tickets: Mutex<TicketKeeper>,
    ticket_ids: Mutex<TicketIdGenerator>,
    // responsible for the persistence layer
    persistor: Mutex<Persistor>,
}

impl Facility {
    /// Opens (or creates) the store, provisions the fixed inventory on
    /// first use, and restores prior ledger state otherwise. Once spots
    /// have been provisioned the counts given here are ignored: the
    /// inventory is fixed for the lifetime of the facility.
    pub fn new(mode: PersistenceMode, car_spots: u32, bike_spots: u32) -> Result<Facility> {
        let persistor = Persistor::new(&mode)?;
        let mut spot_rows = persistor.all_spots()?;
        if spot_rows.is_empty() {
            spot_rows = provision_spots(car_spots, bike_spots);
            for spot in &spot_rows {
                persistor.insert_spot(spot)?;
            }
        }
        let spots = SpotKeeper::from_spots(&spot_rows)?;

        let mut tickets = TicketKeeper::new();
        let mut ticket_ids = TicketIdGenerator::new();
        for ticket in persistor.all_tickets()? {
            ticket_ids.retain(ticket.ticket());
            tickets.restore(ticket);
        }

        Ok(Facility {
            spots,
            tickets: Mutex::new(tickets),
            ticket_ids: Mutex::new(ticket_ids),
            persistor: Mutex::new(persistor),
        })
    }

    // ------------- inventory operations -------------

    /// Atomically claims the lowest numbered free spot of the type.
    /// `NotAvailable` is the expected answer for a full pool.
    pub fn claim_spot(&self, spot_type: SpotType) -> Result<SpotId> {
        let mut pool = guard(self.spots.pool(spot_type))?;
        let id = pool
            .claim_lowest()
            .ok_or(LotError::NotAvailable { spot_type })?;
        if let Err(e) = guard(&self.persistor).and_then(|p| p.update_spot(id, false)) {
            pool.set_available(id, true);
            return Err(e);
        }
        Ok(id)
    }

    /// Marks a spot available again. Releasing a spot that is already
    /// available is idempotent, since a double release must never leave
    /// the inventory inconsistent.
    pub fn release_spot(&self, id: SpotId) -> Result<()> {
        let spot_type = self
            .spots
            .spot_type_of(id)
            .ok_or(LotError::UnknownSpot { id })?;
        let mut pool = guard(self.spots.pool(spot_type))?;
        if pool.is_available(id) == Some(true) {
            return Ok(());
        }
        pool.set_available(id, true);
        if let Err(e) = guard(&self.persistor).and_then(|p| p.update_spot(id, true)) {
            pool.set_available(id, false);
            return Err(e);
        }
        Ok(())
    }

    pub fn is_available(&self, id: SpotId) -> Result<bool> {
        let spot_type = self
            .spots
            .spot_type_of(id)
            .ok_or(LotError::UnknownSpot { id })?;
        let pool = guard(self.spots.pool(spot_type))?;
        pool.is_available(id).ok_or(LotError::UnknownSpot { id })
    }

    pub fn count_by_type(&self, spot_type: SpotType) -> usize {
        self.spots.count_by_type(spot_type)
    }

    pub fn free_by_type(&self, spot_type: SpotType) -> Result<usize> {
        Ok(guard(self.spots.pool(spot_type))?.free())
    }

    // ------------- ledger operations -------------

    pub fn has_open_ticket(&self, registration: &str) -> Result<bool> {
        let registration = normalize_registration(registration);
        Ok(guard(&self.tickets)?.has_open(&registration))
    }

    /// Atomically checks for an open ticket and inserts the new one. The
    /// keeper lock is held across the duplicate check and the store
    /// insert, so two concurrent entries for one vehicle can never both
    /// succeed.
    pub fn create_ticket(
        &self,
        registration: &str,
        spot: SpotId,
        spot_type: SpotType,
        in_time: DateTime<Utc>,
    ) -> Result<TicketId> {
        let registration = normalize_registration(registration);
        let mut tickets = guard(&self.tickets)?;
        if tickets.has_open(&registration) {
            return Err(LotError::DuplicateOpenTicket { registration });
        }
        let id = guard(&self.ticket_ids)?.generate();
        let ticket = Ticket::new(id, spot, spot_type, registration, in_time);
        if let Err(e) = guard(&self.persistor).and_then(|p| p.insert_ticket(&ticket)) {
            guard(&self.ticket_ids)?.release(id);
            return Err(e);
        }
        tickets.keep_open(ticket);
        Ok(id)
    }

    pub fn get_open_ticket(&self, registration: &str) -> Result<Ticket> {
        let registration = normalize_registration(registration);
        guard(&self.tickets)?
            .open_ticket(&registration)
            .cloned()
            .ok_or(LotError::UnknownVehicle { registration })
    }

    /// Sets the exit time and price exactly once.
    pub fn close_ticket(&self, id: TicketId, out_time: DateTime<Utc>, price: f64) -> Result<()> {
        let mut tickets = guard(&self.tickets)?;
        let Some(registration) = tickets.open_registration(id) else {
            return if guard(&self.ticket_ids)?.check(id) {
                Err(LotError::AlreadyClosed { id })
            } else {
                Err(LotError::UnknownTicket { id })
            };
        };
        guard(&self.persistor).and_then(|p| p.close_ticket(id, out_time, price))?;
        tickets.close_open(&registration);
        Ok(())
    }

    pub fn prior_ticket_count(&self, registration: &str) -> Result<usize> {
        let registration = normalize_registration(registration);
        Ok(guard(&self.tickets)?.prior_count(&registration))
    }
}
