mod aggregate;
mod calendar;
mod colors;
mod day;
mod domain;
mod interval;
mod journals;
mod logging;
mod settings;
mod storage;
mod store;
mod ui;
mod week;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing::level_filters::LevelFilter;

use crate::aggregate::format_minutes;
use crate::calendar::{iso_week_of, parse_week_number, parse_year, weeks_in_year};
use crate::day::DayModel;
use crate::domain::Journal;
use crate::interval::TimeField;
use crate::journals::{recent_journals, remember_journal, resolve_journal_path, state_dir};
use crate::logging::enable_logging;
use crate::settings::Settings;
use crate::storage::{load_journal, save_journal};
use crate::store::{Store, TaskFilter, recent_task_names};
use crate::ui::{print_counters, print_day, print_summary_rows, run_dashboard, summary_html};
use crate::week::WeekModel;

#[derive(Debug, Parser)]
#[command(name = "taskcounter", about = "Weekly task time counter")]
struct Cli {
	#[arg(long)]
	journal: Option<PathBuf>,
	/// Overrides RUST_LOG for the log file.
	#[arg(long)]
	log_level: Option<LevelFilter>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FieldArg {
	Start,
	End,
}

impl From<FieldArg> for TimeField {
	fn from(field: FieldArg) -> Self {
		match field {
			FieldArg::Start => TimeField::Start,
			FieldArg::End => TimeField::End,
		}
	}
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	/// Print the days, counters and summary of a week.
	Week {
		#[arg(long)]
		year: Option<String>,
		#[arg(long)]
		week: Option<String>,
	},
	Add {
		#[arg(long)]
		date: Option<String>,
		#[arg(long)]
		name: String,
		#[arg(long)]
		start: Option<String>,
		#[arg(long)]
		end: Option<String>,
	},
	SetTime {
		#[arg(long)]
		date: Option<String>,
		#[arg(long)]
		row: usize,
		#[arg(long, value_enum)]
		field: FieldArg,
		#[arg(long)]
		time: String,
	},
	/// Rename a task; an empty name deletes it.
	Rename {
		#[arg(long)]
		date: Option<String>,
		#[arg(long)]
		row: usize,
		#[arg(long, default_value = "")]
		name: String,
	},
	Target {
		#[arg(long)]
		minutes: u32,
		#[arg(long)]
		year: Option<String>,
		#[arg(long)]
		week: Option<String>,
	},
	Summary {
		#[arg(long)]
		year: Option<String>,
		#[arg(long)]
		week: Option<String>,
		#[arg(long)]
		man_day: Option<u32>,
		#[arg(long)]
		html: bool,
	},
	Daily {
		#[arg(long)]
		date: Option<String>,
		#[arg(long)]
		man_day: Option<u32>,
	},
	Annual {
		#[arg(long)]
		year: String,
	},
	CatchUp,
	WeeksInYear {
		#[arg(long)]
		year: String,
	},
	/// Task names used during the last 90 days.
	Names,
	Settings {
		#[arg(long)]
		week_time: Option<u32>,
		#[arg(long)]
		man_day_time: Option<u32>,
		#[arg(long)]
		valid_color: Option<String>,
		#[arg(long)]
		invalid_color: Option<String>,
		#[arg(long)]
		current_cell_color: Option<String>,
	},
	Journals {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

fn run() -> Result<()> {
	let cli = Cli::parse();
	let interactive = matches!(cli.command, None | Some(Command::Dashboard));
	if let Err(err) = enable_logging(&state_dir(), cli.log_level, !interactive) {
		eprintln!("warning: logging disabled: {err:#}");
	}

	if let Some(Command::Journals { limit }) = &cli.command {
		return print_recent_journals(*limit);
	}
	if let Some(Command::WeeksInYear { year }) = &cli.command {
		let year = parse_year(year)?;
		println!("{}", weeks_in_year(year)?);
		return Ok(());
	}

	let mut journal_path = resolve_journal_path(cli.journal);
	let mut journal = load_journal(&journal_path)
		.with_context(|| format!("failed to load journal {}", journal_path.display()))?;
	if let Err(err) = remember_journal(&journal_path) {
		eprintln!("warning: failed to store recent journal: {err}");
	}
	info!(path = %journal_path.display(), "journal opened");

	let today = Local::now().date_naive();
	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			save(&journal_path, &journal)?;
			println!("initialized journal at {}", journal_path.display());
		}
		Command::Dashboard => {
			run_dashboard(&mut journal, &mut journal_path)?;
		}
		Command::Week { year, week } => {
			let week = open_week(&mut journal, year.as_deref(), week.as_deref(), today)?;
			save(&journal_path, &journal)?;
			for date in week.dates() {
				let day = DayModel::open(&mut journal, date, week.key());
				print_day(&day, day.minutes_of_day(&journal));
			}
			println!();
			print_counters(&week, &journal);
			println!();
			let man_day = Settings::load(&journal).default_man_day_time;
			print_summary_rows(&week.week_summary(&journal, man_day));
		}
		Command::Add {
			date,
			name,
			start,
			end,
		} => {
			let date = parse_date(date.as_deref(), today)?;
			let added = add_task(&mut journal, date, &name, start.as_deref(), end.as_deref());
			save(&journal_path, &journal)?;
			let id = added?;
			println!("created task {id}");
		}
		Command::SetTime {
			date,
			row,
			field,
			time,
		} => {
			let date = parse_date(date.as_deref(), today)?;
			let time = parse_time(&time)?;
			let mut day = open_day(&mut journal, date)?;
			if day.row(row).is_none() {
				bail!("no task on row {row} of {date}");
			}
			if let Some(rejection) = day.time_rejection(row, field.into(), time) {
				bail!("refused: {rejection}");
			}
			if !day.set_time(&mut journal, row, field.into(), time) {
				bail!("unable to update row {row}");
			}
			save(&journal_path, &journal)?;
			print_day(&day, day.minutes_of_day(&journal));
		}
		Command::Rename { date, row, name } => {
			let date = parse_date(date.as_deref(), today)?;
			let mut day = open_day(&mut journal, date)?;
			if day.row(row).is_none() {
				bail!("no task on row {row} of {date}");
			}
			if !day.set_name(&mut journal, row, &name) {
				bail!("unable to rename row {row}");
			}
			save(&journal_path, &journal)?;
			print_day(&day, day.minutes_of_day(&journal));
		}
		Command::Target { minutes, year, week } => {
			let mut week = open_week(&mut journal, year.as_deref(), week.as_deref(), today)?;
			if !week.set_target_minutes(&mut journal, minutes) {
				bail!("week {} is not stored", week.key());
			}
			save(&journal_path, &journal)?;
			println!("target of week {} set to {}", week.key(), format_minutes(f64::from(minutes)));
		}
		Command::Summary {
			year,
			week,
			man_day,
			html,
		} => {
			let week = open_week(&mut journal, year.as_deref(), week.as_deref(), today)?;
			let man_day = man_day.unwrap_or_else(|| settings::default_man_day_time(&journal));
			let rows = week.week_summary(&journal, man_day);
			if html {
				println!("{}", summary_html(&rows));
			} else {
				println!("summary for week {}", week.key());
				print_summary_rows(&rows);
			}
		}
		Command::Daily { date, man_day } => {
			let date = parse_date(date.as_deref(), today)?;
			let week = open_week_of(&mut journal, date)?;
			let man_day = man_day.unwrap_or_else(|| settings::default_man_day_time(&journal));
			println!("summary for {}", date.format("%A %Y-%m-%d"));
			print_summary_rows(&week.daily_summary(&journal, date, man_day));
		}
		Command::Annual { year } => {
			let year = parse_year(&year)?;
			let minutes = journal.sum_duration_minutes(TaskFilter::Year(year)).unwrap_or(0.0);
			println!("{year}: {}", format_minutes(minutes));
		}
		Command::CatchUp => {
			let week = open_week_of(&mut journal, today)?;
			println!(
				"worked {} of {}",
				format_minutes(week.total_time_worked(&journal)),
				format_minutes(week.total_time_to_work(&journal) as f64)
			);
			println!("catch-up {}", week.catch_up(&journal));
		}
		Command::Names => {
			let names = recent_task_names(&journal, today);
			if names.is_empty() {
				println!("no task names used in the last 90 days");
			}
			for name in names {
				println!("{name}");
			}
		}
		Command::Settings {
			week_time,
			man_day_time,
			valid_color,
			invalid_color,
			current_cell_color,
		} => {
			let mut changed = false;
			if let Some(minutes) = week_time {
				settings::set_default_week_time(&mut journal, minutes)?;
				changed = true;
			}
			if let Some(minutes) = man_day_time {
				settings::set_default_man_day_time(&mut journal, minutes)?;
				changed = true;
			}
			for (name, color) in [
				(settings::VALID_COLOR, valid_color),
				(settings::INVALID_COLOR, invalid_color),
				(settings::CURRENT_CELL_COLOR, current_cell_color),
			] {
				if let Some(color) = color {
					settings::set_color(&mut journal, name, &color)?;
					changed = true;
				}
			}
			if changed {
				save(&journal_path, &journal)?;
			}
			print_settings(&Settings::load(&journal));
		}
		Command::Journals { .. } | Command::WeeksInYear { .. } => {}
	}

	Ok(())
}

fn save(path: &Path, journal: &Journal) -> Result<()> {
	save_journal(path, journal).with_context(|| format!("failed to save journal {}", path.display()))
}

fn open_week(journal: &mut Journal, year: Option<&str>, week: Option<&str>, today: NaiveDate) -> Result<WeekModel> {
	let current = iso_week_of(today);
	let year = year.map(parse_year).transpose()?.unwrap_or(current.year);
	let week_number = match week {
		Some(week) => parse_week_number(week)?,
		None => current.week_number as i32,
	};
	Ok(WeekModel::open(journal, year, week_number)?)
}

fn open_week_of(journal: &mut Journal, date: NaiveDate) -> Result<WeekModel> {
	let key = iso_week_of(date);
	Ok(WeekModel::open(journal, key.year, key.week_number as i32)?)
}

fn open_day(journal: &mut Journal, date: NaiveDate) -> Result<DayModel> {
	let week = open_week_of(journal, date)?;
	Ok(DayModel::open(journal, date, week.key()))
}

/// Creates a named task on `date` and sets the given times in order. The
/// task is kept when a time is refused; the error names it.
fn add_task(journal: &mut Journal, date: NaiveDate, name: &str, start: Option<&str>, end: Option<&str>) -> Result<String> {
	let mut day = open_day(journal, date)?;
	let entry_row = day.last_task_row();
	if !day.set_name(journal, entry_row, name) {
		bail!("task name is required");
	}
	let id = day
		.rows()
		.last()
		.map(|task| task.id.clone())
		.context("created task not found")?;
	for (field, value) in [(TimeField::Start, start), (TimeField::End, end)] {
		let Some(value) = value else {
			continue;
		};
		let time = parse_time(value)?;
		let row = row_of(&day, &id)?;
		if let Some(rejection) = day.time_rejection(row, field, time) {
			bail!("task {id} created but {value} was refused: {rejection}");
		}
		if !day.set_time(journal, row, field, time) {
			bail!("task {id} created but {value} could not be stored");
		}
	}
	Ok(id)
}

fn row_of(day: &DayModel, id: &str) -> Result<usize> {
	day.rows()
		.iter()
		.position(|task| task.id == id)
		.with_context(|| format!("task {id} not found"))
}

fn parse_date(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
	match input {
		Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD")),
		None => Ok(today),
	}
}

fn parse_time(input: &str) -> Result<NaiveTime> {
	NaiveTime::parse_from_str(input, "%H:%M").with_context(|| format!("invalid time '{input}', expected HH:MM"))
}

fn print_recent_journals(limit: usize) -> Result<()> {
	let rows = recent_journals(limit)?;
	if rows.is_empty() {
		println!("no recent journals");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}

fn print_settings(settings: &Settings) {
	println!("default week time:    {}", format_minutes(f64::from(settings.default_week_time)));
	println!("default man-day time: {}", format_minutes(f64::from(settings.default_man_day_time)));
	println!("valid color:          {}", settings.valid_color);
	println!("invalid color:        {}", settings.invalid_color);
	println!("current cell color:   {}", settings.current_cell_color);
}
