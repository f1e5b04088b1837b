use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Local, NaiveDate, NaiveTime, Weekday};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState};
use ratatui::{Frame, Terminal};
use tracing::{error, info};

use crate::aggregate::{CatchUp, SummaryRow, format_minutes};
use crate::calendar::{
	CalendarError, WeekKey, current_week, dates_of_week, next_week, parse_week_number, parse_year, previous_week,
};
use crate::colors::{Rgb, color_between, contrast_color, split_color};
use crate::day::DayModel;
use crate::domain::{Journal, Task};
use crate::interval::TimeField;
use crate::journals::{recent_journals, remember_journal};
use crate::settings::{self, Settings};
use crate::storage::{load_journal, save_journal};
use crate::store::{Store, TaskFilter, recent_task_names};
use crate::week::WeekModel;

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const WEEKDAYS: [Weekday; 7] = [
	Weekday::Mon,
	Weekday::Tue,
	Weekday::Wed,
	Weekday::Thu,
	Weekday::Fri,
	Weekday::Sat,
	Weekday::Sun,
];

pub fn run_dashboard(journal: &mut Journal, journal_path: &mut PathBuf) -> anyhow::Result<()> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, journal, journal_path);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	journal: &mut Journal,
	journal_path: &mut PathBuf,
) -> anyhow::Result<()> {
	let mut app = App::new(Local::now().date_naive());
	let known_weeks = journal.header.weeks.len();
	let mut view = build_view(&mut app, journal)?;
	if journal.header.weeks.len() != known_weeks {
		app.report(persist(journal_path, journal));
	}

	loop {
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view, journal_path.as_path()))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, journal, journal_path, &view),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, journal, journal_path, &view),
					InputMode::Normal => handle_normal_key(&mut app, key.code, journal, journal_path, &view),
				};

				if should_quit {
					break;
				}
			}
		}

		let known_weeks = journal.header.weeks.len();
		view = match build_view(&mut app, journal) {
			Ok(view) => view,
			Err(err) => {
				error!(%err, week = %app.week, "cannot open week");
				app.week = current_week(app.today);
				app.follow_today = true;
				app.status = format!("error: {err}");
				build_view(&mut app, journal)?
			}
		};
		if journal.header.weeks.len() != known_weeks {
			app.report(persist(journal_path, journal));
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel, journal_path: &Path) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(3), Constraint::Min(12), Constraint::Length(5)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(20),
			Constraint::Percentage(50),
			Constraint::Percentage(30),
		])
		.split(layout[1]);

	render_header(frame, layout[0], view, journal_path);
	render_days_panel(frame, body[0], app, view);
	render_tasks_panel(frame, body[1], app, view);
	render_counters_panel(frame, body[2], view);
	render_footer(frame, layout[2], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_header(frame: &mut Frame, area: Rect, view: &ViewModel, journal_path: &Path) {
	let dates = view.week.dates();
	let line = Line::from(vec![
		Span::styled(
			format!("Week {}", view.week.key()),
			Style::default().add_modifier(Modifier::BOLD),
		),
		Span::raw(format!(
			"  {} - {}  | target {} | man-day {} | {}",
			dates.monday().format("%d %b %Y"),
			dates.sunday().format("%d %b %Y"),
			format_minutes(f64::from(view.week.target_minutes())),
			format_minutes(f64::from(view.settings.default_man_day_time)),
			journal_path.display()
		)),
	]);
	let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("taskcounter"));
	frame.render_widget(header, area);
}

fn render_days_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.day_totals
		.iter()
		.map(|(date, minutes)| {
			let mut style = Style::default();
			if *date == app.today {
				style = style.fg(Color::LightYellow).add_modifier(Modifier::BOLD);
			}
			ListItem::new(Line::from(vec![
				Span::styled(date.format("%a %d %b").to_string(), style),
				Span::raw(format!("  {}", format_minutes(*minutes))),
			]))
		})
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	state.select(Some(app.weekday.num_days_from_monday() as usize));

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title("Days")
				.border_style(border_style(app.focus == FocusPane::Days)),
		)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_tasks_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let valid = rgb_style(&view.settings.valid_color);
	let invalid = rgb_style(&view.settings.invalid_color);
	let current = rgb_style(&view.settings.current_cell_color);
	let focused = app.focus == FocusPane::Tasks;

	let mut rows = Vec::with_capacity(view.day.row_count());
	for (index, task) in view.day.rows().iter().enumerate() {
		let base = if view.day.row_is_complete(index) { valid } else { invalid };
		let cells = TaskColumn::ALL
			.iter()
			.map(|column| {
				let style = if focused && index == app.row && *column == app.column {
					current.add_modifier(Modifier::BOLD)
				} else {
					base
				};
				Cell::from(task_cell_text(task, *column, app, index)).style(style)
			})
			.collect::<Vec<_>>();
		rows.push(Row::new(cells));
	}

	let entry_row = view.day.last_task_row();
	let entry_style = if focused && app.row == entry_row {
		Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(Color::DarkGray)
	};
	rows.push(Row::new(vec![Cell::from("(new task: Enter)"), Cell::from(""), Cell::from(""), Cell::from("")]).style(entry_style));

	let mut state = TableState::default();
	state.select(Some(app.row.min(entry_row)));

	let title = format!(
		"{} | total {}",
		view.day.date().format("%A, %d %B %Y"),
		format_minutes(view.minutes_of_day)
	);
	let table = Table::new(
		rows,
		[
			Constraint::Min(16),
			Constraint::Length(7),
			Constraint::Length(7),
			Constraint::Length(7),
		],
	)
	.header(
		Row::new(vec!["Task", "Start", "End", "Time"]).style(Style::default().add_modifier(Modifier::BOLD)),
	)
	.block(
		Block::default()
			.borders(Borders::ALL)
			.title(title)
			.border_style(border_style(focused)),
	);

	frame.render_stateful_widget(table, area, &mut state);
}

fn task_cell_text(task: &Task, column: TaskColumn, app: &App, row: usize) -> String {
	let editing = app.row == row && app.column == column && !app.edit_buffer.is_empty();
	match column {
		TaskColumn::Name => task.name.clone(),
		TaskColumn::Start | TaskColumn::End if editing => pending_buffer(&app.edit_buffer),
		TaskColumn::Start => format_time(task.start_time),
		TaskColumn::End => format_time(task.end_time),
		TaskColumn::Duration => task.duration_minutes().map(format_minutes).unwrap_or_default(),
	}
}

fn render_counters_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let week_color = color_between(
		&view.settings.invalid_color,
		&view.settings.valid_color,
		view.progress,
	);
	let catch_up_color = if view.catch_up.is_behind() {
		&view.settings.invalid_color
	} else {
		&view.settings.valid_color
	};

	let mut lines = vec![
		Line::from(format!("Day:      {}", format_minutes(view.minutes_of_day))),
		Line::from(vec![
			Span::raw("Week:     "),
			Span::styled(
				format!(
					" {} / {} ",
					format_minutes(view.minutes_of_week),
					format_minutes(f64::from(view.week.target_minutes()))
				),
				color_style(week_color),
			),
		]),
		Line::from(vec![
			Span::raw("Catch-up: "),
			Span::styled(format!(" {} ", view.catch_up), rgb_style(catch_up_color)),
		]),
		Line::from(format!(
			"Year {}: {}",
			view.week.key().year,
			format_minutes(view.annual_minutes)
		)),
		Line::from(""),
		Line::from(Span::styled("Week summary", Style::default().add_modifier(Modifier::BOLD))),
	];

	if view.summary.is_empty() {
		lines.push(Line::from("(no timed tasks)"));
	} else {
		for row in &view.summary {
			lines.push(Line::from(format!(
				"{} | {} | {}",
				format_minutes(row.minutes),
				row.man_day,
				row.name
			)));
		}
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Counters"));
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("Tab pane | arrows/hjkl navigate | [ ] week | . this week | Enter edit | q quit"),
			Line::from(
				"digits HHMM (start/end) | d delete | r recent name | w week target | m man-day | g go to week | e export | s switch journal",
			),
			Line::from(format!(
				"{}{}",
				app.status,
				if app.focus == FocusPane::Tasks {
					format!(" | {}", app.edit_hint())
				} else {
					String::new()
				}
			)),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(60, 50, frame.area());
	frame.render_widget(Clear, area);

	let items = select
		.options
		.iter()
		.map(|option| ListItem::new(Line::from(Span::styled(option.label.clone(), option.style))))
		.collect::<Vec<_>>();
	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len() - 1)));
	}

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(select.title.clone())
				.border_style(border_style(true)),
		)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);

	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	journal: &mut Journal,
	journal_path: &mut PathBuf,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') => true,
		KeyCode::Esc => {
			if app.edit_buffer.is_empty() {
				return true;
			}
			app.clear_edit_buffer();
			app.status = "Edit cancelled".to_string();
			false
		}
		KeyCode::Tab | KeyCode::BackTab => {
			app.focus = app.focus.toggle();
			app.clear_edit_buffer();
			false
		}
		KeyCode::Char('[') | KeyCode::PageUp => {
			app.shift_week(previous_week(app.week));
			false
		}
		KeyCode::Char(']') | KeyCode::PageDown => {
			app.shift_week(next_week(app.week));
			false
		}
		KeyCode::Char('.') => {
			app.week = current_week(app.today);
			app.follow_today = true;
			app.row = 0;
			app.clear_edit_buffer();
			app.status = "Back to the current week".to_string();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			match app.focus {
				FocusPane::Days => app.shift_weekday(-1),
				FocusPane::Tasks => app.move_row(-1, view),
			}
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			match app.focus {
				FocusPane::Days => app.shift_weekday(1),
				FocusPane::Tasks => app.move_row(1, view),
			}
			false
		}
		KeyCode::Left | KeyCode::Char('h') => {
			match app.focus {
				FocusPane::Days => app.shift_weekday(-1),
				FocusPane::Tasks => app.move_column(-1),
			}
			false
		}
		KeyCode::Right | KeyCode::Char('l') => {
			match app.focus {
				FocusPane::Days => app.shift_weekday(1),
				FocusPane::Tasks => app.move_column(1),
			}
			false
		}
		KeyCode::Enter => {
			match app.focus {
				FocusPane::Days => {
					app.focus = FocusPane::Tasks;
					app.row = view.day.last_task_row();
					app.column = TaskColumn::Name;
				}
				FocusPane::Tasks => open_row_prompt(app, view),
			}
			false
		}
		KeyCode::Char(digit) if digit.is_ascii_digit() && app.focus == FocusPane::Tasks => {
			handle_time_digit_input(app, digit, journal, journal_path, view);
			false
		}
		KeyCode::Backspace => {
			app.edit_buffer.pop();
			false
		}
		KeyCode::Char('d') if app.focus == FocusPane::Tasks => {
			match view.day.row(app.row) {
				Some(task) => app.mode = InputMode::Select(build_delete_select(app.row, task)),
				None => app.status = "Select a task to delete".to_string(),
			}
			false
		}
		KeyCode::Char('r') => {
			match build_recent_name_select(journal, app.today) {
				Ok(select) => app.mode = InputMode::Select(select),
				Err(err) => app.status = err,
			}
			false
		}
		KeyCode::Char('w') => {
			app.mode = InputMode::Prompt(PromptState::with_input(
				format!("Target for week {} (HH:MM)", view.week.key()),
				PromptKind::WeekTarget,
				format_minutes(f64::from(view.week.target_minutes())),
			));
			false
		}
		KeyCode::Char('m') => {
			app.mode = InputMode::Prompt(PromptState::with_input(
				"Man-day length (HH:MM)",
				PromptKind::ManDay,
				format_minutes(f64::from(view.settings.default_man_day_time)),
			));
			false
		}
		KeyCode::Char('g') => {
			app.mode = InputMode::Prompt(PromptState::new("Go to week (YYYY-WW)", PromptKind::GoToWeek));
			false
		}
		KeyCode::Char('e') => {
			app.status = match export_summary(journal_path, view) {
				Ok(path) => format!("exported summary to {}", path.display()),
				Err(err) => format!("error: {err}"),
			};
			false
		}
		KeyCode::Char('s') => {
			match build_journal_switch_select(journal_path) {
				Ok(select) => app.mode = InputMode::Select(select),
				Err(err) => app.status = err,
			}
			false
		}
		_ => false,
	}
}

fn open_row_prompt(app: &mut App, view: &ViewModel) {
	if app.column != TaskColumn::Name {
		app.status = "Type HHMM to set a time".to_string();
		return;
	}

	let current = view.day.row(app.row).map(|task| task.name.clone()).unwrap_or_default();
	let title = if current.is_empty() {
		"New task name".to_string()
	} else {
		"Task name (empty deletes the task)".to_string()
	};
	app.mode = InputMode::Prompt(PromptState::with_input(
		title,
		PromptKind::TaskName { row: app.row },
		current,
	));
}

fn handle_time_digit_input(
	app: &mut App,
	digit: char,
	journal: &mut Journal,
	journal_path: &Path,
	view: &ViewModel,
) {
	let field = match app.column {
		TaskColumn::Start => TimeField::Start,
		TaskColumn::End => TimeField::End,
		TaskColumn::Name | TaskColumn::Duration => {
			app.status = "Move to the start or end column to type a time".to_string();
			return;
		}
	};
	if view.day.row(app.row).is_none() {
		app.status = "Name the task before setting its times".to_string();
		return;
	}

	app.edit_buffer.push(digit);
	if app.edit_buffer.len() < 4 {
		return;
	}

	let buffer = std::mem::take(&mut app.edit_buffer);
	let Some(time) = parse_hhmm(&buffer) else {
		app.status = format!("invalid time '{buffer}', expected HHMM");
		return;
	};

	if let Some(rejection) = view.day.time_rejection(app.row, field, time) {
		app.status = format!("refused {}: {rejection}", time.format("%H:%M"));
		return;
	}

	let edited = view.day.row(app.row).map(|task| task.id.clone());
	let mut day = view.day.clone();
	if !day.set_time(journal, app.row, field, time) {
		app.status = "unable to update the task".to_string();
		return;
	}
	if let Err(err) = persist(journal_path, journal) {
		app.status = format!("error: {err}");
		return;
	}

	if let Some(row) = day.rows().iter().position(|task| Some(&task.id) == edited.as_ref()) {
		app.row = row;
	}
	let label = match field {
		TimeField::Start => "start",
		TimeField::End => "end",
	};
	app.status = format!("updated {label} to {}", time.format("%H:%M"));
}

fn handle_prompt_key(
	app: &mut App,
	code: KeyCode,
	journal: &mut Journal,
	journal_path: &mut PathBuf,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), app, journal, journal_path.as_path(), view) {
				Ok(message) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(
	app: &mut App,
	code: KeyCode,
	journal: &mut Journal,
	journal_path: &mut PathBuf,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), journal, journal_path, view) {
				Ok(message) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(
	prompt: PromptState,
	app: &mut App,
	journal: &mut Journal,
	journal_path: &Path,
	view: &ViewModel,
) -> Result<String, String> {
	match prompt.kind {
		PromptKind::TaskName { row } => {
			let name = prompt.input.trim().to_string();
			let existed = view.day.row(row).is_some();
			if !existed && name.is_empty() {
				return Err("task name is required".to_string());
			}

			let mut day = view.day.clone();
			if !day.set_name(journal, row, &name) {
				return Err("unable to update the task".to_string());
			}
			persist(journal_path, journal)?;
			Ok(match (existed, name.is_empty()) {
				(true, true) => "deleted task".to_string(),
				(true, false) => format!("renamed task: {name}"),
				(false, _) => format!("created task: {name}"),
			})
		}
		PromptKind::WeekTarget => {
			let minutes = parse_duration(&prompt.input)?;
			let mut week = view.week.clone();
			if !week.set_target_minutes(journal, minutes) {
				return Err(format!("week {} is not stored", view.week.key()));
			}
			persist(journal_path, journal)?;
			Ok(format!("week target set to {}", format_minutes(f64::from(minutes))))
		}
		PromptKind::ManDay => {
			let minutes = parse_duration(&prompt.input)?;
			settings::set_default_man_day_time(journal, minutes).map_err(|err| err.to_string())?;
			persist(journal_path, journal)?;
			Ok(format!("man-day set to {}", format_minutes(f64::from(minutes))))
		}
		PromptKind::GoToWeek => {
			let key = parse_week_key(&prompt.input)?;
			app.week = key;
			app.follow_today = true;
			app.row = 0;
			Ok(format!("moved to week {key}"))
		}
	}
}

fn submit_select(
	select: SelectState,
	journal: &mut Journal,
	journal_path: &mut PathBuf,
	view: &ViewModel,
) -> Result<String, String> {
	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::DeleteConfirm { row, task_name } => {
			if selected_value.is_none() {
				return Ok("delete cancelled".to_string());
			}
			let mut day = view.day.clone();
			if !day.set_name(journal, row, "") {
				return Err(format!("unable to delete {task_name}"));
			}
			persist(journal_path, journal)?;
			Ok(format!("deleted task: {task_name}"))
		}
		SelectKind::RecentName => {
			let name = selected_value.ok_or_else(|| "no name selected".to_string())?;
			let mut day = view.day.clone();
			let entry_row = day.last_task_row();
			if !day.set_name(journal, entry_row, &name) {
				return Err(format!("unable to create {name}"));
			}
			persist(journal_path, journal)?;
			Ok(format!("created task: {name}"))
		}
		SelectKind::JournalSwitch => {
			let next_path = selected_value
				.map(PathBuf::from)
				.ok_or_else(|| "no journal selected".to_string())?;
			switch_journal(journal, journal_path, next_path)
		}
	}
}

fn build_delete_select(row: usize, task: &Task) -> SelectState {
	let title = format!(
		"Delete task? {} {}-{}",
		task.name,
		format_time(task.start_time),
		format_time(task.end_time)
	);
	SelectState::new(
		title,
		SelectKind::DeleteConfirm {
			row,
			task_name: task.name.clone(),
		},
		vec![
			SelectOption::new("No, keep it", None, Style::default()),
			SelectOption::new("Yes, delete", Some("delete".to_string()), Style::default().fg(Color::LightRed)),
		],
	)
}

fn build_recent_name_select(journal: &Journal, today: NaiveDate) -> Result<SelectState, String> {
	let names = recent_task_names(journal, today);
	if names.is_empty() {
		return Err("no task names used in the last 90 days".to_string());
	}
	let options = names
		.into_iter()
		.map(|name| SelectOption::new(name.clone(), Some(name), Style::default()))
		.collect();
	Ok(SelectState::new("Reuse a recent task name", SelectKind::RecentName, options))
}

fn build_journal_switch_select(current_path: &Path) -> Result<SelectState, String> {
	let mut paths = recent_journals(100).map_err(|err| format!("failed to load recent journals: {err}"))?;
	let current_path = current_path.to_path_buf();
	if !paths.iter().any(|path| path == &current_path) {
		paths.insert(0, current_path.clone());
	}

	let current_value = current_path.display().to_string();
	let options = paths
		.into_iter()
		.map(|path| {
			let value = path.display().to_string();
			let is_current = value == current_value;
			let mut label = value.clone();
			if is_current {
				label = format!("* {label}");
			}
			if !path.exists() {
				label = format!("[new] {label}");
			}

			let style = if is_current {
				Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
			} else {
				Style::default()
			};

			SelectOption::new(label, Some(value), style)
		})
		.collect::<Vec<_>>();

	let mut select = SelectState::new("Switch journal", SelectKind::JournalSwitch, options);
	select.selected = select
		.options
		.iter()
		.position(|option| option.value.as_deref() == Some(current_value.as_str()))
		.unwrap_or(0);
	Ok(select)
}

fn switch_journal(journal: &mut Journal, journal_path: &mut PathBuf, next_path: PathBuf) -> Result<String, String> {
	if &next_path == journal_path {
		return Ok(format!("already using journal: {}", journal_path.display()));
	}

	let next_journal = load_journal(&next_path).map_err(|err| err.to_string())?;
	*journal = next_journal;
	*journal_path = next_path;
	info!(path = %journal_path.display(), "switched journal");

	match remember_journal(journal_path.as_path()) {
		Ok(()) => Ok(format!("switched journal: {}", journal_path.display())),
		Err(err) => Ok(format!(
			"switched journal: {} (warning: failed to store recents: {err})",
			journal_path.display()
		)),
	}
}

fn export_summary(journal_path: &Path, view: &ViewModel) -> Result<PathBuf, String> {
	let path = journal_path.with_file_name(format!("summary-{}.html", view.week.key()));
	fs::write(&path, summary_html(&view.summary)).map_err(|err| err.to_string())?;
	Ok(path)
}

fn persist(path: &Path, journal: &Journal) -> Result<(), String> {
	save_journal(path, journal).map_err(|err| err.to_string())
}

fn build_view(app: &mut App, journal: &mut Journal) -> Result<ViewModel, CalendarError> {
	let week = WeekModel::open(journal, app.week.year, app.week.week_number as i32)?;
	if app.follow_today {
		app.weekday = week.default_weekday(app.today);
		app.follow_today = false;
	}
	let day = week.day(journal, app.weekday);
	let journal = &*journal;
	let settings = Settings::load(journal);
	let day_totals = week
		.dates()
		.map(|date| {
			let minutes = journal.sum_duration_minutes(TaskFilter::Day(date)).unwrap_or(0.0);
			(date, minutes)
		})
		.collect();

	Ok(ViewModel {
		minutes_of_day: day.minutes_of_day(journal),
		minutes_of_week: week.minutes_of_week(journal),
		progress: week.progress(journal),
		catch_up: week.catch_up(journal),
		annual_minutes: week.total_annual_worked_minutes(journal, week.key().year),
		summary: week.week_summary(journal, settings.default_man_day_time),
		day_totals,
		settings,
		day,
		week,
	})
}

/// Renders the week summary as a standalone HTML table.
pub fn summary_html(rows: &[SummaryRow]) -> String {
	let mut html = String::from(
		"<html><head><meta http-equiv=\"content-type\" content=\"text/html; charset=utf-8\"></head><body>",
	);
	html.push_str("<table cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"width:100%;\">");
	for row in rows {
		html.push_str(&format!(
			"<tr><th style=\"border:2px solid black;margin:0;padding:2px;text-align:left;background-color:#ddd;\">{}</th>\
			<td style=\"border:2px solid black;margin:0;padding:2px;text-align:center;width:20%;\">{}</td></tr>",
			escape_html(&row.name),
			format_minutes(row.minutes)
		));
	}
	html.push_str("</table></body></html>");
	html
}

fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

pub fn print_summary_rows(rows: &[SummaryRow]) {
	if rows.is_empty() {
		println!("no timed tasks");
		return;
	}
	for row in rows {
		println!("{} | {:>5} | {}", format_minutes(row.minutes), row.man_day.to_string(), row.name);
	}
}

pub fn print_day(day: &DayModel, minutes_of_day: f64) {
	println!("{} | {}", day.date().format("%a %Y-%m-%d"), format_minutes(minutes_of_day));
	for (row, task) in day.rows().iter().enumerate() {
		println!(
			"  {row:>2}. {:<5}-{:>5} {:>6} {}",
			format_time(task.start_time),
			format_time(task.end_time),
			task.duration_minutes().map(format_minutes).unwrap_or_default(),
			task.name
		);
	}
}

pub fn print_counters(week: &WeekModel, journal: &Journal) {
	println!(
		"week {} | {} / {}",
		week.key(),
		format_minutes(week.minutes_of_week(journal)),
		format_minutes(f64::from(week.target_minutes()))
	);
	println!("catch-up {}", week.catch_up(journal));
}

fn format_time(time: Option<NaiveTime>) -> String {
	time.map(|time| time.format("%H:%M").to_string()).unwrap_or_default()
}

fn pending_buffer(buffer: &str) -> String {
	let mut pending = buffer.to_string();
	while pending.len() < 4 {
		pending.push('_');
	}
	pending
}

fn parse_hhmm(buffer: &str) -> Option<NaiveTime> {
	let hour = buffer.get(0..2)?.parse::<u32>().ok()?;
	let minute = buffer.get(2..4)?.parse::<u32>().ok()?;
	NaiveTime::from_hms_opt(hour, minute, 0)
}

/// `H:MM` or a plain number of minutes.
fn parse_duration(input: &str) -> Result<u32, String> {
	let input = input.trim();
	let parsed = match input.split_once(':') {
		Some((hours, minutes)) => {
			let hours = hours.trim().parse::<u32>();
			let minutes = minutes.trim().parse::<u32>();
			match (hours, minutes) {
				(Ok(hours), Ok(minutes)) if minutes < 60 => hours.checked_mul(60).and_then(|h| h.checked_add(minutes)),
				_ => None,
			}
		}
		None => input.parse::<u32>().ok(),
	};
	parsed.ok_or_else(|| format!("invalid duration '{input}', expected H:MM or minutes"))
}

fn parse_week_key(input: &str) -> Result<WeekKey, String> {
	let input = input.trim();
	let (year, week) = input
		.split_once("-W")
		.or_else(|| input.split_once(['-', ' ', 'w', 'W']))
		.ok_or_else(|| format!("invalid week '{input}', expected YYYY-WW"))?;
	let year = parse_year(year.trim()).map_err(|err| err.to_string())?;
	let week = parse_week_number(week.trim()).map_err(|err| err.to_string())?;
	dates_of_week(year, week).map_err(|err| err.to_string())?;
	Ok(WeekKey::new(year, week.unsigned_abs()))
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn rgb_style(color: &str) -> Style {
	match split_color(color) {
		Some(rgb) => color_style(rgb),
		None => Style::default(),
	}
}

fn color_style(background: Rgb) -> Style {
	let foreground = contrast_color(&background.to_string());
	Style::default()
		.bg(Color::Rgb(background.r, background.g, background.b))
		.fg(Color::Rgb(foreground.r, foreground.g, foreground.b))
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::with_input(title, kind, String::new())
	}

	fn with_input(title: impl Into<String>, kind: PromptKind, input: String) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	kind: SelectKind,
	options: Vec<SelectOption>,
	selected: usize,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			kind,
			options,
			selected: 0,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: Option<String>,
	style: Style,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: Option<String>, style: Style) -> Self {
		Self {
			label: label.into(),
			value,
			style,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	TaskName { row: usize },
	WeekTarget,
	ManDay,
	GoToWeek,
}

#[derive(Debug, Clone)]
enum SelectKind {
	DeleteConfirm { row: usize, task_name: String },
	RecentName,
	JournalSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Days,
	Tasks,
}

impl FocusPane {
	fn toggle(self) -> Self {
		match self {
			FocusPane::Days => FocusPane::Tasks,
			FocusPane::Tasks => FocusPane::Days,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskColumn {
	Name,
	Start,
	End,
	Duration,
}

impl TaskColumn {
	const ALL: [TaskColumn; 4] = [TaskColumn::Name, TaskColumn::Start, TaskColumn::End, TaskColumn::Duration];

	fn index(self) -> usize {
		Self::ALL.iter().position(|column| *column == self).unwrap_or(0)
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	today: NaiveDate,
	focus: FocusPane,
	week: WeekKey,
	weekday: Weekday,
	/// Reselect the day on the next view build: today inside the week, Monday otherwise.
	follow_today: bool,
	row: usize,
	column: TaskColumn,
	edit_buffer: String,
	mode: InputMode,
	status: String,
}

impl App {
	fn new(today: NaiveDate) -> Self {
		Self {
			today,
			focus: FocusPane::Tasks,
			week: current_week(today),
			weekday: Weekday::Mon,
			follow_today: true,
			row: 0,
			column: TaskColumn::Name,
			edit_buffer: String::new(),
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		self.row = self.row.min(view.day.last_task_row());
	}

	fn report(&mut self, result: Result<(), String>) {
		if let Err(err) = result {
			self.status = format!("error: {err}");
		}
	}

	fn shift_week(&mut self, next: Result<WeekKey, CalendarError>) {
		match next {
			Ok(week) => {
				self.week = week;
				self.follow_today = true;
				self.row = 0;
				self.clear_edit_buffer();
				self.status = format!("Week {week}");
			}
			Err(err) => self.status = format!("error: {err}"),
		}
	}

	fn shift_weekday(&mut self, delta: i32) {
		let index = self.weekday.num_days_from_monday() as i32 + delta;
		self.weekday = WEEKDAYS[index.clamp(0, 6) as usize];
		self.row = 0;
		self.clear_edit_buffer();
	}

	fn move_row(&mut self, delta: i32, view: &ViewModel) {
		let last = view.day.last_task_row();
		if delta > 0 {
			self.row = (self.row + delta as usize).min(last);
		} else {
			self.row = self.row.saturating_sub(delta.unsigned_abs() as usize);
		}
		self.clear_edit_buffer();
	}

	fn move_column(&mut self, delta: i32) {
		let index = (self.column.index() as i32 + delta).clamp(0, TaskColumn::ALL.len() as i32 - 1);
		self.column = TaskColumn::ALL[index as usize];
		self.clear_edit_buffer();
	}

	fn clear_edit_buffer(&mut self) {
		self.edit_buffer.clear();
	}

	fn edit_hint(&self) -> String {
		let field = match self.column {
			TaskColumn::Start => "start",
			TaskColumn::End => "end",
			TaskColumn::Name => return "Enter: edit task name".to_string(),
			TaskColumn::Duration => return String::new(),
		};
		if self.edit_buffer.is_empty() {
			return format!("Edit {field}: type HHMM");
		}
		format!("Edit {field}: {}", pending_buffer(&self.edit_buffer))
	}
}

struct ViewModel {
	week: WeekModel,
	day: DayModel,
	settings: Settings,
	day_totals: Vec<(NaiveDate, f64)>,
	minutes_of_day: f64,
	minutes_of_week: f64,
	progress: f64,
	catch_up: CatchUp,
	annual_minutes: f64,
	summary: Vec<SummaryRow>,
}
