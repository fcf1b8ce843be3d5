use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use lotkeeper::construct::SpotType;
use lotkeeper::error::LotError;
use lotkeeper::fare::{compute_fare, FareSchedule};

fn entry() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

#[test]
fn car_for_one_hour_pays_the_hourly_rate() {
    let out = entry() + TimeDelta::minutes(60);
    let price = compute_fare(entry(), out, SpotType::Car, false, &FareSchedule::default())
        .expect("fare");
    assert_eq!(price, 1.5);
}

#[test]
fn bike_for_45_minutes_pays_three_quarters_of_the_rate() {
    let out = entry() + TimeDelta::minutes(45);
    let price = compute_fare(entry(), out, SpotType::Bike, false, &FareSchedule::default())
        .expect("fare");
    assert_eq!(price, 0.75);
}

#[test]
fn short_stays_are_free_for_both_types() {
    let out = entry() + TimeDelta::minutes(28);
    for spot_type in SpotType::ALL {
        let price = compute_fare(entry(), out, spot_type, false, &FareSchedule::default())
            .expect("fare");
        assert_eq!(price, 0.0, "{spot_type} should park 28 minutes for free");
    }
}

#[test]
fn exactly_half_an_hour_is_still_free() {
    let out = entry() + TimeDelta::minutes(30);
    let price = compute_fare(entry(), out, SpotType::Car, false, &FareSchedule::default())
        .expect("fare");
    assert_eq!(price, 0.0);
}

#[test]
fn one_second_past_the_grace_period_is_billed() {
    let out = entry() + TimeDelta::minutes(30) + TimeDelta::seconds(1);
    let price = compute_fare(entry(), out, SpotType::Car, false, &FareSchedule::default())
        .expect("fare");
    assert!(price > 0.0);
}

#[test]
fn recurring_visitor_gets_five_percent_off() {
    let out = entry() + TimeDelta::minutes(60);
    let price = compute_fare(entry(), out, SpotType::Car, true, &FareSchedule::default())
        .expect("fare");
    assert_eq!(price, 1.425);
}

#[test]
fn discount_never_applies_to_a_free_stay() {
    let out = entry() + TimeDelta::minutes(20);
    let price = compute_fare(entry(), out, SpotType::Bike, true, &FareSchedule::default())
        .expect("fare");
    assert_eq!(price, 0.0);
}

#[test]
fn a_full_day_is_billed_per_elapsed_hour() {
    let out = entry() + TimeDelta::hours(24);
    let price = compute_fare(entry(), out, SpotType::Car, false, &FareSchedule::default())
        .expect("fare");
    assert_eq!(price, 36.0);
}

#[test]
fn exit_before_entry_is_rejected() {
    let out = entry() - TimeDelta::minutes(10);
    let result = compute_fare(entry(), out, SpotType::Car, false, &FareSchedule::default());
    assert!(matches!(result, Err(LotError::InvalidInterval { .. })));
}

#[test]
fn identical_inputs_always_yield_identical_prices() {
    let out = entry() + TimeDelta::minutes(93);
    let first = compute_fare(entry(), out, SpotType::Car, true, &FareSchedule::default())
        .expect("fare");
    for _ in 0..100 {
        let again = compute_fare(entry(), out, SpotType::Car, true, &FareSchedule::default())
            .expect("fare");
        assert_eq!(first, again);
    }
}

#[test]
fn custom_rates_are_honored() {
    let schedule = FareSchedule {
        car_rate_per_hour: 2.0,
        bike_rate_per_hour: 0.5,
    };
    let out = entry() + TimeDelta::minutes(60);
    assert_eq!(
        compute_fare(entry(), out, SpotType::Car, false, &schedule).expect("fare"),
        2.0
    );
    assert_eq!(
        compute_fare(entry(), out, SpotType::Bike, false, &schedule).expect("fare"),
        0.5
    );
}

#[test]
fn negative_or_non_finite_rates_fail_validation() {
    let negative = FareSchedule {
        car_rate_per_hour: -1.0,
        bike_rate_per_hour: 1.0,
    };
    assert!(matches!(negative.validate(), Err(LotError::Config(_))));
    let non_finite = FareSchedule {
        car_rate_per_hour: 1.5,
        bike_rate_per_hour: f64::NAN,
    };
    assert!(matches!(non_finite.validate(), Err(LotError::Config(_))));
    assert!(FareSchedule::default().validate().is_ok());
}
