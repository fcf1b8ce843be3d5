//! Thin console front end for the lotkeeper engine.
//!
//! Everything here translates menu choices into Session API calls; no
//! business logic lives in this binary.

use std::io;
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::EnvFilter;

use lotkeeper::construct::{Facility, SpotType};
use lotkeeper::error::Result;
use lotkeeper::session::Session;
use lotkeeper::settings::Settings;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Err(e) = run() {
        error!(error = %e, "lotkeeper terminated");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = Settings::load()?;
    let facility = Arc::new(Facility::new(
        settings.persistence_mode()?,
        settings.facility.car_spots,
        settings.facility.bike_spots,
    )?);
    let session = Session::new(Arc::clone(&facility), settings.fare_schedule());

    loop {
        println!("Select an option:");
        println!("1. Park a vehicle.");
        println!("2. Exit the parking.");
        println!("3. Show occupancy.");
        println!("0. Quit.");

        let Some(entered) = read_line() else { break };
        match entered.as_str() {
            "0" => break,
            "1" => {
                println!("Vehicle type (CAR/BIKE):");
                let Some(entered) = read_line() else { break };
                let spot_type = match SpotType::from_name(&entered.to_ascii_uppercase()) {
                    Some(spot_type) => spot_type,
                    None => {
                        println!("Unknown vehicle type.");
                        continue;
                    }
                };
                println!("Registration number:");
                let Some(registration) = read_line() else { break };
                match session.process_entry(&registration, spot_type) {
                    Ok(receipt) => println!(
                        "Please park at spot {} (ticket {}).",
                        receipt.spot, receipt.ticket
                    ),
                    Err(e) => println!("{e}"),
                }
            }
            "2" => {
                println!("Registration number:");
                let Some(registration) = read_line() else { break };
                match session.process_exit(&registration) {
                    Ok(receipt) => println!(
                        "Please pay {:.3} (ticket {}).",
                        receipt.price, receipt.ticket
                    ),
                    Err(e) => println!("{e}"),
                }
            }
            "3" => {
                for spot_type in SpotType::ALL {
                    println!(
                        "{}: {} of {} free",
                        spot_type,
                        facility.free_by_type(spot_type)?,
                        facility.count_by_type(spot_type)
                    );
                }
            }
            _ => continue,
        }
    }
    Ok(())
}

fn read_line() -> Option<String> {
    let mut entered = String::new();
    match io::stdin().read_line(&mut entered) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(entered.trim().to_owned()),
    }
}
