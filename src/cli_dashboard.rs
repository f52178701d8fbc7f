//! Node tabs (one per configured node: status, earnings, filewalker grid)
//! Summary (fleet totals and running filewalkers)

use std::{
  io,
  path::PathBuf,
  sync::mpsc,
  thread,
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
  event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode},
  execute,
  terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::runtime::Runtime;
use tui::{
  backend::{Backend, CrosstermBackend},
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Span, Spans},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
  Terminal,
};
use tracing::{error, info};

use storjwatch::{
  aggregate::FleetSummary,
  config::{Config, DEFAULT_CONFIG_FILE},
  init_tracing,
  models::{MaintenanceKind, NodeSnapshot, Satellite, TaskGrid, TaskStatus},
  node_processing::collect_fleet,
};

/// Interactive dashboard for storj nodes.
#[derive(Parser)]
#[command(name = "storjwatch_cli", about)]
struct Cli {
  /// Path to config file.
  #[arg(env = "STORJWATCH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
  config_file: PathBuf,
}

enum ScanUpdate {
  Started,
  Done(Vec<NodeSnapshot>),
  Failed(String),
}

struct App {
  current_tab: usize,
  nodes: Vec<NodeSnapshot>,
  summary: FleetSummary,
  scanning: bool,
  last_error: Option<String>,
}

impl App {
  fn new() -> Self {
    Self {
      current_tab: 0,
      nodes: vec![],
      summary: FleetSummary::from_nodes(&[]),
      scanning: false,
      last_error: None,
    }
  }

  // nodes plus the summary tab
  fn tab_count(&self) -> usize {
    self.nodes.len() + 1
  }

  fn next_tab(&mut self) {
    self.current_tab = (self.current_tab + 1) % self.tab_count();
  }

  fn previous_tab(&mut self) {
    self.current_tab = (self.current_tab + self.tab_count() - 1) % self.tab_count();
  }

  fn update(&mut self, update: ScanUpdate) {
    match update {
      ScanUpdate::Started => self.scanning = true,
      ScanUpdate::Done(nodes) => {
        self.summary = FleetSummary::from_nodes(&nodes);
        self.nodes = nodes;
        self.scanning = false;
        self.last_error = None;
        self.current_tab = self.current_tab.min(self.tab_count() - 1);
      }
      ScanUpdate::Failed(e) => {
        self.scanning = false;
        self.last_error = Some(e);
      }
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  // anything chattier would draw over the alternate screen
  init_tracing("error");
  let config = Config::from_file(&cli.config_file)?;

  let (request_tx, request_rx) = mpsc::channel::<()>();
  let (update_tx, update_rx) = mpsc::channel::<ScanUpdate>();

  thread::spawn(move || {
    let rt = match Runtime::new() {
      Ok(rt) => rt,
      Err(e) => {
        let _ = update_tx.send(ScanUpdate::Failed(format!("could not start runtime: {}", e)));
        return;
      }
    };
    while request_rx.recv().is_ok() {
      let _ = update_tx.send(ScanUpdate::Started);
      let update = match rt.block_on(collect_fleet(&config, Utc::now())) {
        Ok(nodes) => {
          info!("Scanned {} nodes", nodes.len());
          ScanUpdate::Done(nodes)
        }
        Err(e) => {
          error!("Scan failed: {}", e);
          ScanUpdate::Failed(format!("{:#}", anyhow::Error::from(e)))
        }
      };
      if update_tx.send(update).is_err() {
        break;
      }
    }
  });
  request_tx.send(()).context("scan worker is gone")?;

  enable_raw_mode()?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend)?;

  let result = run_app(&mut terminal, &request_tx, &update_rx);

  disable_raw_mode()?;
  execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
  terminal.show_cursor()?;
  result
}

fn run_app<B: Backend>(
  terminal: &mut Terminal<B>,
  request_tx: &mpsc::Sender<()>,
  update_rx: &mpsc::Receiver<ScanUpdate>,
) -> Result<()> {
  let mut app = App::new();
  let tick_rate = Duration::from_millis(250);
  let mut last_tick = Instant::now();

  loop {
    while let Ok(update) = update_rx.try_recv() {
      app.update(update);
    }
    terminal.draw(|f| ui(f, &app))?;

    let timeout = tick_rate
      .checked_sub(last_tick.elapsed())
      .unwrap_or_else(|| Duration::from_secs(0));
    if event::poll(timeout)? {
      if let CEvent::Key(key) = event::read()? {
        match key.code {
          KeyCode::Char('q') => break,
          KeyCode::Char('r') if !app.scanning => {
            request_tx.send(()).context("scan worker is gone")?;
          }
          KeyCode::Right => app.next_tab(),
          KeyCode::Left => app.previous_tab(),
          _ => {}
        }
      }
    }
    if last_tick.elapsed() >= tick_rate {
      last_tick = Instant::now();
    }
  }
  Ok(())
}

fn ui<B: Backend>(f: &mut tui::Frame<B>, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .margin(1)
    .constraints([
      Constraint::Length(3),
      Constraint::Min(0),
      Constraint::Length(3),
    ].as_ref())
    .split(f.size());

  let mut tab_titles: Vec<String> = app.nodes.iter().map(|n| n.name.clone()).collect();
  tab_titles.push("Summary".to_string());
  let tabs = Tabs::new(
    tab_titles
      .iter()
      .map(|t| Spans::from(Span::styled(t.as_str(), Style::default().fg(Color::Yellow))))
      .collect(),
  )
    .block(Block::default().borders(Borders::ALL).title("Nodes"))
    .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .select(app.current_tab);
  f.render_widget(tabs, chunks[0]);

  match app.nodes.get(app.current_tab) {
    Some(node) => render_node(f, node, chunks[1]),
    None => render_summary(f, &app.summary, chunks[1]),
  }

  let footer_text = match (&app.last_error, app.scanning) {
    (_, true) => "Scanning logs ... | q: Quit".to_string(),
    (Some(e), false) => format!("Error: {} | r: Rescan | q: Quit", e),
    (None, false) => "←/→: Switch Tabs | r: Rescan | q: Quit".to_string(),
  };
  let footer_style = match app.last_error {
    Some(_) => Style::default().fg(Color::Red),
    None => Style::default().fg(Color::White),
  };
  let footer = Paragraph::new(footer_text)
    .style(footer_style)
    .block(Block::default().borders(Borders::ALL));
  f.render_widget(footer, chunks[2]);
}

fn render_node<B: Backend>(f: &mut tui::Frame<B>, node: &NodeSnapshot, area: Rect) {
  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Length(34), Constraint::Min(0)].as_ref())
    .split(area);

  let fin = &node.financials;
  let value = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".into());
  let (status, status_color) = match node.is_up {
    Some(true) => (format!("up {}", node.uptime_label), Color::Green),
    Some(false) => (node.uptime_label.clone(), Color::Red),
    None => (node.uptime_label.clone(), Color::Yellow),
  };
  let mut lines = vec![
    Spans::from(vec![Span::raw("Status: "), Span::styled(status, Style::default().fg(status_color))]),
    Spans::from(Span::raw("")),
    Spans::from(Span::raw(format!("Current Total: $ {}", value(&fin.current_total)))),
    Spans::from(Span::raw(format!("Estimated Total: $ {}", value(&fin.estimated_total)))),
    Spans::from(Span::raw("")),
    Spans::from(Span::raw(format!("Disk Used: {}", value(&fin.disk_used)))),
    Spans::from(Span::raw(format!("Unpaid Data: {}", value(&fin.unpaid_data)))),
  ];
  if let Some(pct) = &fin.deviation_percentage {
    lines.push(Spans::from(Span::raw("")));
    lines.push(Spans::from(Span::styled(
      format!("Report Deviation: {} %", pct),
      Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )));
  }
  let stats = Paragraph::new(lines)
    .block(Block::default().borders(Borders::ALL).title("Node Main Stats"));
  f.render_widget(stats, chunks[0]);

  let table = filewalker_table(&node.tasks, |status| {
    let color = match status {
      TaskStatus::Running => Color::Red,
      TaskStatus::Unknown => Color::Yellow,
      TaskStatus::Offline => Color::DarkGray,
      TaskStatus::Completed { .. } => Color::Green,
    };
    Cell::from(status.to_string()).style(Style::default().fg(color))
  })
    .block(Block::default().borders(Borders::ALL).title(format!("{} - Filewalker", node.name)));
  f.render_widget(table, chunks[1]);
}

fn render_summary<B: Backend>(f: &mut tui::Frame<B>, summary: &FleetSummary, area: Rect) {
  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Length(34), Constraint::Min(0)].as_ref())
    .split(area);

  let lines = vec![
    Spans::from(Span::styled(
      format!("Estimated total: $ {:.2}", summary.estimated_total),
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Spans::from(Span::raw(format!("Current total: $ {:.2}", summary.current_total))),
    Spans::from(Span::raw("")),
    Spans::from(Span::raw(format!("Nodes up: {}/{}", summary.nodes_up, summary.nodes))),
    Spans::from(Span::raw(format!("Disk used: {:.2} TB", summary.disk_used_tb))),
    Spans::from(Span::raw(format!("Unpaid data: {:.2} TB", summary.unpaid_data_tb))),
  ];
  let stats = Paragraph::new(lines)
    .block(Block::default().borders(Borders::ALL).title("All Nodes"));
  f.render_widget(stats, chunks[0]);

  let table = filewalker_table(&summary.running, |count| {
    let style = if *count > 0 { Style::default().fg(Color::Red) } else { Style::default() };
    Cell::from(format!("{} running", count)).style(style)
  })
    .block(Block::default().borders(Borders::ALL).title("Filewalker"));
  f.render_widget(table, chunks[1]);
}

fn filewalker_table<'a, T>(grid: &TaskGrid<T>, cell: impl Fn(&T) -> Cell<'a>) -> Table<'a> {
  let header = Row::new(vec!["", "GARBAGE COLLECTOR", "TRASH CLEANUP", "USED SPACE FILEWALKER"])
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    .bottom_margin(1);
  let rows: Vec<Row> = Satellite::ALL
    .into_iter()
    .map(|sat| {
      let mut cells = vec![Cell::from(sat.label())];
      cells.extend(MaintenanceKind::ALL.into_iter().map(|kind| cell(&grid[(kind, sat)])));
      Row::new(cells)
    })
    .collect();

  Table::new(rows)
    .header(header)
    .widths(&[
      Constraint::Length(5),
      Constraint::Length(20),
      Constraint::Length(20),
      Constraint::Length(22),
    ])
}
