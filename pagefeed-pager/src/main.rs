//! pagefeed entry point: page through a photo feed from the terminal.

use std::sync::Arc;

use pagefeed_cache::SystemClock;
use pagefeed_client::{ApiCredential, FeedConfig, RestFeedClient};
use pagefeed_core::{ObservableValue, PageRecord, Subscription};
use pagefeed_pager::controller::{ControllerOptions, PaginationController};
use pagefeed_pager::diagnostics::TracingSink;
use pagefeed_pager::error::PagerError;
use pagefeed_pager::foreground::{ForegroundHandle, ForegroundQueue};
use pagefeed_pager::summary::page_summary;
use pagefeed_pager::telemetry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;

const HELP: &str = "commands: n (next), p (previous), r (refresh), q (quit)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Next,
    Previous,
    Refresh,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "n" => Some(Command::Next),
        "p" => Some(Command::Previous),
        "r" => Some(Command::Refresh),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

/// Tracks the page on screen and keeps exactly one page subscription alive.
struct Viewer {
    controller: PaginationController,
    ui: ForegroundHandle,
    current: usize,
    subscription: Option<Subscription>,
}

impl Viewer {
    fn new(controller: PaginationController, ui: ForegroundHandle) -> Self {
        Self {
            controller,
            ui,
            current: 0,
            subscription: None,
        }
    }

    fn show(&mut self, index: usize, stream: ObservableValue<PageRecord>) {
        self.current = index;
        // replacing the old subscription drops it
        self.subscription = Some(stream.subscribe(self.ui.observer(render)));
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Next => match self.controller.page_after(self.current) {
                Some(stream) => self.show(self.current + 1, stream),
                None => println!("Already on the last page"),
            },
            Command::Previous => match self.controller.page_before(self.current) {
                Some(stream) => self.show(self.current - 1, stream),
                None => println!("Already on the first page"),
            },
            Command::Refresh => {
                let stream = self.controller.refresh(self.current);
                self.show(self.current, stream);
            }
            Command::Quit => {}
        }
    }
}

fn render(page: PageRecord) {
    for line in page_summary(&page) {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<(), PagerError> {
    telemetry::init_tracing(telemetry::DEFAULT_FILTER)?;

    let config = FeedConfig::load()?;
    let credential = ApiCredential::load(&config.credential_path)?;
    let client = RestFeedClient::new(&config, credential)?;

    let controller = PaginationController::new(
        Arc::new(client),
        Arc::new(SystemClock),
        Arc::new(TracingSink),
        Handle::current(),
        ControllerOptions::from(&config),
    );

    // learn the page count before the first page is shown
    controller.initialize(&config.feature);
    controller.wait_idle().await;

    let mut foreground = ForegroundQueue::new();
    let ui = foreground.handle();
    let _page_count = controller
        .page_count_stream()
        .subscribe(ui.observer(|count: usize| println!("({} pages)", count)));

    let mut viewer = Viewer::new(controller.clone(), ui);
    viewer.show(0, controller.first_page());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            ran = foreground.run_next() => {
                if !ran {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => viewer.apply(command),
                    None => println!("{}", HELP),
                }
            }
        }
    }

    foreground.run_pending();
    tracing::info!(stats = ?controller.cache_stats(), "Exiting");
    Ok(())
}
