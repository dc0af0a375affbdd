use color_eyre::eyre::Result;
use crossterm::event::{
    self,
    Event,
    KeyCode,
    KeyEvent,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use epic_game_client::{
    CharacterData,
    MintNotification,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;
use tokio::sync::mpsc;

const HEADER: &str = "Mint Your Hero. Choose wisely.";
const CARD_WIDTH: u16 = 28;

pub type InputEventReceiver = mpsc::UnboundedReceiver<Event>;

#[derive(Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Mint(u64),
    Redraw,
}

/// Everything the screen shows for one frame.
pub struct Snapshot<'a> {
    pub characters: &'a [CharacterData],
    pub minting: bool,
    pub owned: Option<&'a CharacterData>,
    pub status: &'a str,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    selected: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    Notification(MintNotification),
    QuitModal,
}

impl UiState {
    pub fn show_notification(&mut self, notification: MintNotification) {
        self.mode = Mode::Notification(notification);
    }

    pub fn selected(&self) -> usize {
        self.selected
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit(state: &mut UiState) -> Result<()> {
    state.terminal = None;
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

/// Reads terminal events on a dedicated thread so the async loop never blocks
/// on stdin.
pub fn spawn_input_reader() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "terminal input failed");
                    break;
                }
            }
        }
    });
    rx
}

pub fn draw(state: &mut UiState, snap: &Snapshot<'_>) -> Result<()> {
    state.selected = state.selected.min(snap.characters.len().saturating_sub(1));
    if let Some(mut term) = state.terminal.take() {
        let res = term.draw(|f| ui(f, state, snap)).map(|_| ());
        state.terminal = Some(term);
        res?;
    }
    Ok(())
}

pub fn handle_event(state: &mut UiState, ev: Event, character_count: usize) -> Option<UserEvent> {
    match ev {
        Event::Key(key) => handle_key(state, key, character_count),
        Event::Resize(..) => Some(UserEvent::Redraw),
        _ => None,
    }
}

pub fn handle_key(
    state: &mut UiState,
    key: KeyEvent,
    character_count: usize,
) -> Option<UserEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match state.mode {
        Mode::Notification(_) => match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if character_count > 0 {
                    state.selected = (state.selected + 1) % character_count;
                }
                Some(UserEvent::Redraw)
            }
            KeyCode::Left | KeyCode::Char('h') => {
                if character_count > 0 {
                    state.selected = (state.selected + character_count - 1) % character_count;
                }
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter if state.selected < character_count => {
                Some(UserEvent::Mint(state.selected as u64))
            }
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &Snapshot<'_>) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(9),    // character cards
            Constraint::Length(8), // owned NFT
            Constraint::Length(3), // status + help
        ])
        .split(f.area());

    draw_header(f, chunks[0]);
    if snap.minting {
        draw_minting(f, chunks[1]);
    } else {
        draw_grid(f, chunks[1], state, snap);
    }
    draw_owned(f, chunks[2], snap);
    draw_bottom(f, chunks[3], snap);
    draw_modals(f, state);
}

fn draw_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(HEADER)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("Epic Game"));
    f.render_widget(header, area);
}

fn card_lines(character: &CharacterData) -> Vec<Line<'static>> {
    vec![
        Line::styled(
            character.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::styled(
            character.image_uri.clone(),
            Style::default().fg(Color::DarkGray),
        ),
        Line::from(format!("HP: {}/{}", character.hp, character.max_hp)),
        Line::from(format!("Attack: {}", character.attack_damage)),
    ]
}

fn draw_grid(f: &mut Frame, area: Rect, state: &UiState, snap: &Snapshot<'_>) {
    // an empty catalog renders nothing
    if snap.characters.is_empty() {
        return;
    }
    let per_row = (area.width / CARD_WIDTH).max(1) as usize;
    let rows = snap.characters.len().div_ceil(per_row);
    let row_h = (area.height / rows as u16).max(1);
    for (i, character) in snap.characters.iter().enumerate() {
        let col = (i % per_row) as u16;
        let row = (i / per_row) as u16;
        let y = area.y + row * row_h;
        if y >= area.y + area.height {
            break;
        }
        let rect = Rect::new(
            area.x + col * CARD_WIDTH,
            y,
            CARD_WIDTH.min(area.width),
            row_h.min(area.y + area.height - y),
        );
        let selected = i == state.selected;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            })
            .title(Span::styled(
                format!("#{i}"),
                if selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                },
            ));
        let body = Paragraph::new(card_lines(character)).wrap(Wrap { trim: true });
        f.render_widget(&block, rect);
        f.render_widget(body, block.inner(rect));
    }
}

fn draw_minting(f: &mut Frame, area: Rect) {
    let panel = Paragraph::new("Minting In Progress...")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(panel, area);
}

fn draw_owned(f: &mut Frame, area: Rect, snap: &Snapshot<'_>) {
    let lines = match snap.owned {
        Some(nft) => card_lines(nft),
        None => vec![Line::styled("None", Style::default().fg(Color::DarkGray))],
    };
    let owned = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Your Character NFT"));
    f.render_widget(owned, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &Snapshot<'_>) {
    let help = Paragraph::new(format!(
        "{} | ←/→ select | Enter mint | q quit",
        snap.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::Notification(notification) => {
            let area = centered_rect(60, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title(format!(
                "Token #{} minted",
                notification.token_id
            ));
            let p = Paragraph::new(format!(
                "{}\n\nEnter/Esc to close",
                notification.message
            ))
            .wrap(Wrap { trim: false });
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit?");
            let p = Paragraph::new("Quit the game? y/n");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
