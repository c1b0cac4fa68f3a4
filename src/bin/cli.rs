use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use schedule_calendar::calendar::week::ALL_WEEKDAYS;
use schedule_calendar::context::EntityKind;
use schedule_calendar::{
    Calendar, CalendarError, CalendarException, CalendarId, DayType, Duration, LocalTimeRange,
    Schedule, TimeUnit,
};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show the current calendar\n  calendars                          List calendars\n  use     <id>                       Switch the current calendar\n  derive  <name>                     Create a calendar derived from the current one\n  hours   <weekday> <HH:MM-HH:MM,..|off|default>\n                                     Set the hours of a weekday\n  except  <YYYY-MM-DD> [YYYY-MM-DD] [HH:MM-HH:MM,..]\n                                     Add an exception (non-working without hours)\n  ranges  <YYYY-MM-DD>               Working hours on a date\n  working <YYYY-MM-DD>               Whether a date has working time\n  work    <start> <end> [unit]       Working time between two instants (YYYY-MM-DDTHH:MM)\n  date    <start> <duration>         Instant reached after a duration (e.g. 8h, 1.5d, -2h)\n  next    <instant>                  Next working instant\n  prev    <instant>                  Previous end of work\n  save json <path>                   Save the current calendar\n  load json <path>                   Load a calendar and make it current\n  quit|exit                          Exit"
    );
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_instant(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .ok()
        .or_else(|| parse_date(s).map(|date| date.and_time(NaiveTime::MIN)))
}

fn parse_ranges(s: &str) -> Option<Vec<LocalTimeRange>> {
    s.split(',')
        .map(|part| {
            let (start, end) = part.split_once('-')?;
            let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
            let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
            Some(LocalTimeRange::new(start, end))
        })
        .collect()
}

fn format_ranges(ranges: &[LocalTimeRange]) -> String {
    if ranges.is_empty() {
        return "non-working".to_string();
    }
    ranges
        .iter()
        .map(|range| match range.bounds() {
            Some((start, end)) => format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
            None => range.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn show_calendar(schedule: &Schedule, id: CalendarId) {
    let Some(view) = schedule.calendar_view(id) else {
        println!("Unknown calendar {id}");
        return;
    };
    let calendar = view.calendar();
    let parent = calendar
        .parent()
        .map_or_else(|| "none".to_string(), |parent| parent.to_string());
    println!("Calendar {} '{}' (parent: {})", id, calendar.name, parent);
    for day in ALL_WEEKDAYS {
        let marker = match calendar.week().day_type(day) {
            DayType::Default => " (inherited)",
            _ => "",
        };
        println!("  {day}: {}{marker}", format_ranges(&view.hours(day)));
    }
    println!("  exceptions: {}", calendar.exceptions().len());
}

fn save_calendar(schedule: &Schedule, id: CalendarId, path: &Path) -> Result<(), CalendarError> {
    let calendar = schedule.calendar(id).ok_or(CalendarError::UnknownCalendar(id))?;
    std::fs::write(path, calendar.to_json()?)?;
    Ok(())
}

/// Replaces any calendar with the same ID in place, so derived calendars stay attached.
fn load_calendar(schedule: &mut Schedule, path: &Path) -> Result<CalendarId, CalendarError> {
    let calendar = Calendar::from_json(&std::fs::read_to_string(path)?)?;
    let id = calendar.id();
    schedule.context().reserve(EntityKind::Calendar, id.0);
    if schedule.calendar(id).is_some() {
        schedule.calendars_mut().replace(calendar)?;
        Ok(id)
    } else {
        schedule.calendars_mut().add(calendar)
    }
}

fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut schedule = match Schedule::from_config_path(config_path().as_deref()) {
        Ok(schedule) => schedule,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let Some(mut current) = schedule.default_calendar() else {
        eprintln!("Error: no default calendar");
        std::process::exit(1);
    };

    println!("Schedule Calendar (CLI) - type 'help' for commands\n");
    show_calendar(&schedule, current);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => show_calendar(&schedule, current),
            "calendars" => {
                for calendar in schedule.calendars().iter() {
                    let marker = if calendar.id() == current { "*" } else { " " };
                    println!("{marker} {} {}", calendar.id(), calendar.name);
                }
            }
            "use" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                Some(id) if schedule.calendar(CalendarId(id)).is_some() => {
                    current = CalendarId(id);
                    println!("Using calendar {current}.");
                }
                Some(id) => println!("Unknown calendar {id}"),
                None => println!("Usage: use <id>"),
            },
            "derive" => {
                let name: Vec<&str> = parts.collect();
                if name.is_empty() {
                    println!("Usage: derive <name>");
                    continue;
                }
                match schedule.add_derived_calendar(name.join(" "), current) {
                    Ok(id) => {
                        current = id;
                        println!("Created calendar {id}.");
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "hours" => {
                let day = parts.next().and_then(|s| s.parse::<Weekday>().ok());
                let arg = parts.next();
                let (Some(day), Some(arg)) = (day, arg) else {
                    println!("Usage: hours <weekday> <HH:MM-HH:MM,..|off|default>");
                    continue;
                };
                let Some(calendar) = schedule.calendars_mut().get_mut(current) else {
                    println!("Unknown calendar {current}");
                    continue;
                };
                let week = calendar.week_mut();
                match arg {
                    "off" => week.set_working_day(day, false),
                    "default" => week.set_day_type(day, DayType::Default),
                    _ => match parse_ranges(arg) {
                        Some(ranges) => {
                            week.set_working_day(day, true);
                            week.set_hours(day, ranges);
                        }
                        None => {
                            println!("Invalid hours (HH:MM-HH:MM,..)");
                            continue;
                        }
                    },
                }
                println!("Hours set for {day}.");
            }
            "except" => {
                let args: Vec<&str> = parts.collect();
                let Some(from) = args.first().and_then(|s| parse_date(s)) else {
                    println!("Usage: except <YYYY-MM-DD> [YYYY-MM-DD] [HH:MM-HH:MM,..]");
                    continue;
                };
                let mut rest = &args[1..];
                let to = match rest.first().and_then(|s| parse_date(s)) {
                    Some(to) => {
                        rest = &rest[1..];
                        to
                    }
                    None => from,
                };
                let hours = match rest.first() {
                    Some(arg) => match parse_ranges(arg) {
                        Some(hours) => hours,
                        None => {
                            println!("Invalid hours (HH:MM-HH:MM,..)");
                            continue;
                        }
                    },
                    None => Vec::new(),
                };
                let Some(calendar) = schedule.calendars_mut().get_mut(current) else {
                    println!("Unknown calendar {current}");
                    continue;
                };
                calendar.add_exception(CalendarException::new(from, to).with_hours(hours));
                println!("Exception added.");
            }
            "ranges" | "working" => {
                let Some(date) = parts.next().and_then(parse_date) else {
                    println!("Usage: {} <YYYY-MM-DD>", cmd);
                    continue;
                };
                let Some(view) = schedule.calendar_view(current) else {
                    println!("Unknown calendar {current}");
                    continue;
                };
                if cmd == "ranges" {
                    println!("{date}: {}", format_ranges(&view.ranges(date)));
                } else {
                    println!("{date}: {}", view.is_working_date(date));
                }
            }
            "work" => {
                let start = parts.next().and_then(parse_instant);
                let end = parts.next().and_then(parse_instant);
                let unit = match parts.next().map(str::parse::<TimeUnit>) {
                    Some(Ok(unit)) => unit,
                    Some(Err(e)) => {
                        println!("Error: {}", e);
                        continue;
                    }
                    None => TimeUnit::Hours,
                };
                let (Some(start), Some(end)) = (start, end) else {
                    println!("Usage: work <start> <end> [unit]");
                    continue;
                };
                if let Some(view) = schedule.calendar_view(current) {
                    println!("Work: {}", view.work(start, end, unit));
                }
            }
            "date" => {
                let start = parts.next().and_then(parse_instant);
                let duration = parts.next().map(str::parse::<Duration>);
                let (Some(start), Some(duration)) = (start, duration) else {
                    println!("Usage: date <start> <duration>");
                    continue;
                };
                let duration = match duration {
                    Ok(duration) => duration,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                if let Some(view) = schedule.calendar_view(current) {
                    println!("Date: {}", view.date(start, duration).format("%Y-%m-%d %H:%M"));
                }
            }
            "next" | "prev" => {
                let Some(instant) = parts.next().and_then(parse_instant) else {
                    println!("Usage: {} <instant>", cmd);
                    continue;
                };
                if let Some(view) = schedule.calendar_view(current) {
                    let result = if cmd == "next" {
                        view.next_work_start(instant)
                    } else {
                        view.previous_work_finish(instant)
                    };
                    println!("{}", result.format("%Y-%m-%d %H:%M"));
                }
            }
            "save" | "load" => {
                let format = parts.next();
                let path = parts.next();
                let (Some("json"), Some(path)) = (format, path) else {
                    println!("Usage: {} json <path>", cmd);
                    continue;
                };
                let path = Path::new(path);
                if cmd == "save" {
                    match save_calendar(&schedule, current, path) {
                        Ok(()) => println!("Calendar saved to {}", path.display()),
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    match load_calendar(&mut schedule, path) {
                        Ok(id) => {
                            current = id;
                            println!("Calendar loaded from {}", path.display());
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
