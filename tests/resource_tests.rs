use chrono::{NaiveDate, NaiveDateTime};
use schedule_calendar::{
    Availability, CostRateTable, CostRateTableEntry, Rate, Resource, ResourceId, Schedule, TimeUnit,
};

fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

#[test]
fn rate_lookup_picks_the_first_entry_ending_after_the_date() {
    let mut schedule = Schedule::default();
    let id = schedule.add_resource(Resource::new(ResourceId(0), "Welder")).unwrap();

    let table = schedule
        .resource_mut(id)
        .unwrap()
        .cost_rate_table_mut(0)
        .unwrap();
    *table = CostRateTable::new();
    for (end, amount) in [((2024, 1, 1), 10.0), ((2024, 6, 1), 12.0), ((2024, 12, 31), 15.0)] {
        let end = dt(end.0, end.1, end.2, 0);
        table.add(
            CostRateTableEntry::new(dt(1984, 1, 1, 0), end)
                .with_rate(0, Rate::new(amount, TimeUnit::Hours)),
        );
    }

    let table = schedule.resource(id).unwrap().cost_rate_table(0).unwrap();
    assert_eq!(table.index_by_date(dt(2024, 3, 15, 0)), Some(1));
    assert_eq!(
        table.entry_by_date(dt(2024, 3, 15, 0)).unwrap().standard_rate(),
        Some(&Rate::new(12.0, TimeUnit::Hours))
    );
    assert_eq!(table.index_by_date(dt(2025, 1, 1, 0)), None);
    assert!(table.table_is_populated());
}

#[test]
fn zero_rates_are_interchangeable() {
    assert_eq!(Rate::new(0.0, TimeUnit::Hours), Rate::new(0.0, TimeUnit::Days));
    assert_ne!(Rate::new(5.0, TimeUnit::Hours), Rate::new(5.0, TimeUnit::Days));
    assert!(Rate::equivalent(Some(&Rate::new(0.0, TimeUnit::Weeks)), None));
    assert!(!Rate::equivalent(None, Some(&Rate::new(1.0, TimeUnit::Hours))));
}

#[test]
fn resource_availability_windows() {
    let mut schedule = Schedule::default();
    let mut crane = Resource::new(ResourceId(0), "Crane");
    crane.availability.add(Availability::new(
        Some(dt(2024, 3, 1, 0)),
        Some(dt(2024, 3, 31, 17)),
        100.0,
    ));
    crane.availability.add(Availability::new(
        Some(dt(2024, 5, 1, 0)),
        None,
        50.0,
    ));
    let id = schedule.add_resource(crane).unwrap();
    let crane = schedule.resource(id).unwrap();

    assert_eq!(crane.available_from(dt(2024, 3, 10, 9)), Some(dt(2024, 3, 1, 0)));
    assert_eq!(crane.available_to(dt(2024, 3, 10, 9)), Some(dt(2024, 3, 31, 17)));

    let gap = dt(2024, 4, 10, 9);
    assert_eq!(
        crane.available_from(gap),
        Some(dt(2024, 3, 31, 17) + chrono::TimeDelta::minutes(1))
    );
    assert_eq!(
        crane.available_to(gap),
        Some(dt(2024, 5, 1, 0) - chrono::TimeDelta::minutes(1))
    );

    assert_eq!(crane.available_to(dt(2024, 6, 1, 0)), None);
    assert_eq!(crane.available_from(dt(2024, 1, 1, 0)), None);
    assert_eq!(
        crane.availability.entry_by_date(dt(2024, 6, 1, 0)).map(|a| a.units),
        Some(50.0)
    );
}
