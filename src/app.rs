use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    self as term, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::config;
use crate::data::{self, CommentService, FeedService};
use crate::reddit;
use crate::state::{Command, Message, Settings, ViewState};
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Serve built-in sample data instead of calling reddit.
    pub offline: bool,
    /// Overrides `feed.default_source` for this run.
    pub source: Option<String>,
    /// Replaces the default `~/.config/rview/config.yaml`.
    pub config_file: Option<PathBuf>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let (feed_service, comment_service) = services(&cfg, options.offline)?;
    let source = options
        .source
        .as_deref()
        .map(config::normalize_source)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| cfg.feed.default_source.clone());
    tracing::info!(%source, offline = options.offline, "starting");

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (width, height) = term::size().unwrap_or((80, 24));
    let (state, initial) = ViewState::new(&source, Settings::from(&cfg), width, height);
    let mut runtime = Runtime::new(state, feed_service, comment_service);
    runtime.execute(initial);
    let result = runtime.event_loop(&mut terminal);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

type Services = (
    Arc<dyn FeedService + Send + Sync>,
    Arc<dyn CommentService + Send + Sync>,
);

fn services(cfg: &config::Config, offline: bool) -> Result<Services> {
    if offline {
        let feed: Arc<dyn FeedService + Send + Sync> = Arc::new(data::MockFeedService);
        let comments: Arc<dyn CommentService + Send + Sync> = Arc::new(data::MockCommentService);
        return Ok((feed, comments));
    }

    let client = reddit::Client::new(reddit::ClientConfig {
        user_agent: cfg.api.user_agent.clone(),
        base_url: Some(cfg.api.base_url.clone()),
        timeout: cfg.timeout(),
        limit: u32::try_from(cfg.feed.posts_per_page).unwrap_or(u32::MAX),
    })
    .context("create reddit client")?;
    let client = Arc::new(client);
    let feed: Arc<dyn FeedService + Send + Sync> =
        Arc::new(data::RedditFeedService::new(client.clone()));
    let comments: Arc<dyn CommentService + Send + Sync> =
        Arc::new(data::RedditCommentService::new(client));
    Ok((feed, comments))
}

struct Runtime {
    state: ViewState,
    feed_service: Arc<dyn FeedService + Send + Sync>,
    comment_service: Arc<dyn CommentService + Send + Sync>,
    response_tx: Sender<Message>,
    response_rx: Receiver<Message>,
    needs_redraw: bool,
    quit: bool,
}

impl Runtime {
    fn new(
        state: ViewState,
        feed_service: Arc<dyn FeedService + Send + Sync>,
        comment_service: Arc<dyn CommentService + Send + Sync>,
    ) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            state,
            feed_service,
            comment_service,
            response_tx,
            response_rx,
            needs_redraw: true,
            quit: false,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        while !self.quit {
            if self.poll_async() {
                self.needs_redraw = true;
            }

            if self.needs_redraw {
                terminal.draw(|frame| ui::draw(frame, &self.state))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        if let Some(command) = self.state.handle_key(key) {
                            self.execute(command);
                        }
                        self.needs_redraw = true;
                    }
                    Event::Resize(width, height) => {
                        self.state.resize(width, height);
                        self.needs_redraw = true;
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.state.tick() {
                    self.needs_redraw = true;
                }
            }
        }

        Ok(())
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.state.handle_message(message);
            changed = true;
        }
        changed
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Quit => self.quit = true,
            Command::FetchPosts(request) => {
                let service = self.feed_service.clone();
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let result = service.fetch_posts(&request.source);
                    let _ = tx.send(Message::PostsLoaded { request, result });
                });
            }
            Command::FetchComments(request) => {
                let service = self.comment_service.clone();
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let result = service.fetch_comments(&request.source, &request.post_id);
                    let _ = tx.send(Message::CommentsLoaded { request, result });
                });
            }
            Command::OpenUrl(url) => match webbrowser::open(&url) {
                Ok(()) => self.state.set_notice(format!("Opened {url}")),
                Err(err) => {
                    tracing::warn!(%url, error = %err, "failed to open browser");
                    self.state.set_notice(format!("Could not open browser: {err}"));
                }
            },
        }
    }
}
