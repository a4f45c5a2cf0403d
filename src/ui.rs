use crate::client::{ClientError, RelayClient};
use crate::command::{help_text, parse_input, Input, SlashCommand};
use crate::protocol::{ChatResponse, Provider};
use crate::session::{Applied, Session};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size};
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use ratatui::{Frame, Terminal, TerminalOptions, Viewport};
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;
type UiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const INPUT_HEIGHT: u16 = 6;

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().flush();
    }
}

#[derive(Debug, Clone)]
enum ChatLine {
    User(String),
    Assistant(String),
    Info(String),
    Error(String),
}

impl ChatLine {
    fn lines(&self) -> Vec<Line<'static>> {
        let (header, body, body_style) = match self {
            ChatLine::User(text) => (
                Some(("You:", Color::Blue)),
                text,
                Style::default().fg(Color::Blue),
            ),
            ChatLine::Assistant(text) => (
                Some(("Assistant:", Color::Yellow)),
                text,
                Style::default(),
            ),
            ChatLine::Info(text) => (
                None,
                text,
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            ),
            ChatLine::Error(text) => (None, text, Style::default().fg(Color::Red)),
        };

        let mut lines = Vec::new();
        if let Some((label, color)) = header {
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
        }
        for line in body.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), body_style)));
        }
        lines
    }

    fn rendered_height(&self, width: u16) -> u16 {
        let width = width.max(1) as usize;
        let total: usize = self
            .lines()
            .iter()
            .map(|line| line.width().max(1).div_ceil(width))
            .sum();
        total.min(u16::MAX as usize) as u16
    }
}

/// Multi-line editor state. Cursor positions count chars, not bytes.
struct InputBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    fn byte_offset(&self) -> usize {
        let line = &self.lines[self.row];
        line.char_indices()
            .nth(self.col)
            .map_or(line.len(), |(idx, _)| idx)
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset();
        self.lines[self.row].insert(offset, c);
        self.col += 1;
    }

    fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let offset = self.byte_offset();
            self.lines[self.row].remove(offset);
        } else if self.row > 0 {
            let tail = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&tail);
        }
    }

    fn new_line(&mut self) {
        let offset = self.byte_offset();
        let tail = self.lines[self.row].split_off(offset);
        self.lines.insert(self.row + 1, tail);
        self.row += 1;
        self.col = 0;
    }

    fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    fn move_vertical(&mut self, up: bool) {
        let target = if up {
            self.row.checked_sub(1)
        } else {
            Some(self.row + 1).filter(|row| *row < self.lines.len())
        };
        if let Some(row) = target {
            self.row = row;
            self.col = self.col.min(self.line_len(row));
        }
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    fn render(&self) -> Text<'static> {
        if self.is_blank() && self.lines.len() == 1 {
            return Text::from(Span::styled(
                "Type your message... (/help for commands)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|line| Line::from(line.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

enum UiEvent {
    Reply(Result<ChatResponse, ClientError>),
}

pub struct App {
    session: Session,
    client: Arc<RelayClient>,
    input: InputBuffer,
    should_quit: bool,
    sender: mpsc::Sender<UiEvent>,
    receiver: mpsc::Receiver<UiEvent>,
    is_loading: bool,
}

impl App {
    pub fn new(session: Session, client: RelayClient) -> Self {
        let (sender, receiver) = mpsc::channel(8);

        Self {
            session,
            client: Arc::new(client),
            input: InputBuffer::new(),
            should_quit: false,
            sender,
            receiver,
            is_loading: false,
        }
    }

    fn status(&self) -> String {
        let search = if self.session.allow_search() { "on" } else { "off" };
        let busy = if self.is_loading { " [Thinking...]" } else { "" };
        format!(
            " {} / {} | search {} | Enter send, Shift+Enter newline, Esc quit{} ",
            self.session.provider(),
            self.session.model(),
            search,
            busy
        )
    }

    fn settings_summary(&self) -> String {
        let act_as = if self.session.act_as().is_empty() {
            "(none)"
        } else {
            self.session.act_as()
        };
        format!(
            "server: {}\nprovider: {}\nmodel: {}\nact as: {}\nweb search: {}",
            self.client.base_url(),
            self.session.provider(),
            self.session.model(),
            act_as,
            self.session.allow_search()
        )
    }

    fn draw(&self, f: &mut Frame) {
        let area = f.area();
        let input_paragraph = Paragraph::new(self.input.render())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(self.status())
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(input_paragraph, area);

        let x = (area.x + self.input.col as u16 + 1).min(area.x + area.width.saturating_sub(2));
        let y = (area.y + self.input.row as u16 + 1).min(area.y + area.height.saturating_sub(2));
        f.set_cursor_position((x, y));
    }

    fn print(&self, terminal: &mut TuiTerminal, entry: ChatLine) -> UiResult<()> {
        let width = terminal.size()?.width;
        let height = entry.rendered_height(width).saturating_add(1);
        let mut text = Text::from(entry.lines());
        text.extend(Text::raw("\n"));
        // Insert above the inline viewport so the log stays in scrollback.
        terminal.insert_before(height, |buf| {
            Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .render(buf.area, buf);
        })?;
        Ok(())
    }

    fn apply_reply(
        &mut self,
        terminal: &mut TuiTerminal,
        reply: Result<ChatResponse, ClientError>,
    ) -> UiResult<()> {
        self.is_loading = false;
        match reply {
            Ok(response) => match self.session.apply_response(response) {
                Applied::Reply(text) => self.print(terminal, ChatLine::Assistant(text)),
                Applied::Rejected(error) => self.print(terminal, ChatLine::Error(error)),
            },
            Err(err) => {
                log::warn!("session {}: {}", self.session.id(), err);
                self.print(terminal, ChatLine::Error(err.to_string()))
            }
        }
    }

    fn submit(&mut self, terminal: &mut TuiTerminal, text: String) -> UiResult<()> {
        self.print(terminal, ChatLine::User(text.clone()))?;
        self.session.append_user_turn(text);
        self.is_loading = true;

        let request = self.session.build_request();
        log::debug!(
            "session {}: submitting {} messages",
            self.session.id(),
            request.messages.len()
        );
        let client = Arc::clone(&self.client);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let reply = client.submit(&request).await;
            let _ = sender.send(UiEvent::Reply(reply)).await;
        });
        Ok(())
    }

    fn run_command(&mut self, terminal: &mut TuiTerminal, command: SlashCommand) -> UiResult<()> {
        let info = match command {
            SlashCommand::Act(text) => {
                self.session.set_act_as(text);
                format!("act as: {}", self.session.act_as())
            }
            SlashCommand::Clear => {
                self.session.clear();
                "Conversation cleared.".to_string()
            }
            SlashCommand::Config => self.settings_summary(),
            SlashCommand::Help => help_text(),
            SlashCommand::Model(None) | SlashCommand::Models => {
                self.session.provider().models().join("\n")
            }
            SlashCommand::Model(Some(name)) => match self.session.set_model(&name) {
                Ok(()) => format!("model: {}", self.session.model()),
                Err(err) => return self.print(terminal, ChatLine::Error(err)),
            },
            SlashCommand::Provider(None) => Provider::ALL
                .iter()
                .map(|provider| provider.name())
                .collect::<Vec<_>>()
                .join("\n"),
            SlashCommand::Provider(Some(name)) => match Provider::parse(&name) {
                Some(provider) => {
                    self.session.set_provider(provider);
                    format!("provider: {}, model: {}", provider, self.session.model())
                }
                None => {
                    return self.print(
                        terminal,
                        ChatLine::Error(format!("Unknown provider: {}", name)),
                    );
                }
            },
            SlashCommand::Quit => {
                self.should_quit = true;
                return Ok(());
            }
            SlashCommand::Search(value) => {
                let enabled = value.unwrap_or(!self.session.allow_search());
                self.session.set_allow_search(enabled);
                format!("web search: {}", if enabled { "on" } else { "off" })
            }
            SlashCommand::Unknown(cmd) => {
                return self.print(terminal, ChatLine::Error(format!("Unknown command: /{}", cmd)));
            }
        };
        self.print(terminal, ChatLine::Info(info))
    }

    fn handle_key(&mut self, terminal: &mut TuiTerminal, key: KeyEvent) -> UiResult<()> {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => self.input.new_line(),
            // One request in flight per session.
            KeyCode::Enter if self.is_loading => {}
            KeyCode::Enter => {
                let raw = self.input.text();
                match parse_input(&raw) {
                    Input::Empty => {}
                    Input::Text(text) => {
                        self.input.clear();
                        self.submit(terminal, text)?;
                    }
                    Input::Command(command) => {
                        self.input.clear();
                        self.run_command(terminal, command)?;
                    }
                }
            }
            KeyCode::Char(c) => self.input.insert_char(c),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Up => self.input.move_vertical(true),
            KeyCode::Down => self.input.move_vertical(false),
            KeyCode::Home => self.input.col = 0,
            KeyCode::End => self.input.col = self.input.line_len(self.input.row),
            _ => {}
        }
        Ok(())
    }

    fn handle_events(&mut self, terminal: &mut TuiTerminal) -> UiResult<()> {
        while let Ok(UiEvent::Reply(reply)) = self.receiver.try_recv() {
            self.apply_reply(terminal, reply)?;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                self.handle_key(terminal, key)?;
            }
        }

        Ok(())
    }
}

pub fn run_tui(session: Session, client: RelayClient) -> UiResult<()> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    let mut stdout = io::stdout();
    let (_, rows) = size()?;
    if rows > 0 {
        // Push existing screen content into scrollback without clearing it.
        for _ in 0..rows {
            writeln!(stdout)?;
        }
        stdout.flush()?;
    }
    execute!(stdout, MoveTo(0, 0))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(INPUT_HEIGHT),
        },
    )?;

    let mut app = App::new(session, client);
    let summary = app.settings_summary();
    app.print(&mut terminal, ChatLine::Info(summary))?;

    while !app.should_quit {
        terminal.draw(|f| app.draw(f))?;
        app.handle_events(&mut terminal)?;
    }

    terminal.clear()?;
    Ok(())
}
