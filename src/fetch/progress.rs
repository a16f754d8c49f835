//! Fetch event sink and begin/tick sequencing.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Observer of fetch progress. Fire-and-forget.
pub trait FetchEvents {
    fn on_fetch_begin(&mut self, url: &str);
    fn on_progress_tick(&mut self, downloaded: u64, total: u64);
}

/// Recorded event, see the `Vec<FetchEvent>` sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Begin(String),
    Tick { downloaded: u64, total: u64 },
}

impl FetchEvents for Vec<FetchEvent> {
    fn on_fetch_begin(&mut self, url: &str) {
        self.push(FetchEvent::Begin(url.to_string()));
    }

    fn on_progress_tick(&mut self, downloaded: u64, total: u64) {
        self.push(FetchEvent::Tick { downloaded, total });
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl FetchEvents for NoEvents {
    fn on_fetch_begin(&mut self, _url: &str) {}
    fn on_progress_tick(&mut self, _downloaded: u64, _total: u64) {}
}

const TICK_INTERVAL_MS: u64 = 100;

/// Terminal progress bar. Appears on begin, cleared when dropped.
#[derive(Default)]
pub struct ConsoleEvents {
    bar: Option<ProgressBar>,
}

impl ConsoleEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FetchEvents for ConsoleEvents {
    fn on_fetch_begin(&mut self, url: &str) {
        if let Some(old) = self.bar.take() {
            old.finish_and_clear();
        }
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("     {spinner:.cyan} {msg} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("━╸━"));
        }
        pb.set_message(file_name(url).to_string());
        pb.enable_steady_tick(Duration::from_millis(TICK_INTERVAL_MS));
        self.bar = Some(pb);
    }

    fn on_progress_tick(&mut self, downloaded: u64, total: u64) {
        if let Some(pb) = &self.bar {
            pb.set_length(total);
            pb.set_position(downloaded);
        }
    }
}

impl Drop for ConsoleEvents {
    fn drop(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

fn file_name(url: &str) -> &str {
    let clean = url.split(['?', '#']).next().unwrap_or(url);
    clean
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(clean)
}

/// Per-attempt sequencing in front of a [`FetchEvents`] sink.
///
/// `begin` goes out at most once and only after the response is confirmed
/// as 200. Ticks before that are dropped, and a tick never reports fewer
/// bytes than the previous one.
pub struct ProgressReporter<'a> {
    events: &'a mut dyn FetchEvents,
    url: &'a str,
    started: bool,
    last_downloaded: u64,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(events: &'a mut dyn FetchEvents, url: &'a str) -> Self {
        Self {
            events,
            url,
            started: false,
            last_downloaded: 0,
        }
    }

    /// Fire `begin` if not done yet for this attempt.
    pub fn begin(&mut self) {
        if !self.started {
            self.started = true;
            self.events.on_fetch_begin(self.url);
        }
    }

    pub fn tick(&mut self, downloaded: u64, total: u64) {
        if !self.started {
            return;
        }
        let downloaded = downloaded.max(self.last_downloaded);
        self.last_downloaded = downloaded;
        self.events.on_progress_tick(downloaded, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_fires_once() {
        let mut events: Vec<FetchEvent> = Vec::new();
        {
            let mut reporter = ProgressReporter::new(&mut events, "http://x/a.pkg");
            reporter.begin();
            reporter.begin();
        }
        assert_eq!(events, vec![FetchEvent::Begin("http://x/a.pkg".into())]);
    }

    #[test]
    fn test_ticks_before_begin_are_dropped() {
        let mut events: Vec<FetchEvent> = Vec::new();
        {
            let mut reporter = ProgressReporter::new(&mut events, "u");
            reporter.tick(10, 100);
            reporter.begin();
            reporter.tick(20, 100);
        }
        assert_eq!(
            events,
            vec![
                FetchEvent::Begin("u".into()),
                FetchEvent::Tick {
                    downloaded: 20,
                    total: 100
                }
            ]
        );
    }

    #[test]
    fn test_ticks_never_go_backwards() {
        let mut events: Vec<FetchEvent> = Vec::new();
        {
            let mut reporter = ProgressReporter::new(&mut events, "u");
            reporter.begin();
            reporter.tick(50, 100);
            reporter.tick(30, 100);
        }
        assert_eq!(
            events.last(),
            Some(&FetchEvent::Tick {
                downloaded: 50,
                total: 100
            })
        );
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("http://x/latest/All/zsh-5.9.pkg"), "zsh-5.9.pkg");
        assert_eq!(file_name("http://x/meta.conf?x=1"), "meta.conf");
        assert_eq!(file_name("http://x/dir/"), "dir");
    }

    #[test]
    fn test_console_events_bar_lifecycle() {
        let mut console = ConsoleEvents::new();
        console.on_progress_tick(1, 2);
        console.on_fetch_begin("http://x/a.pkg");
        console.on_progress_tick(500, 1000);
        let pb = console.bar.clone().unwrap();
        assert_eq!(pb.position(), 500);
        assert_eq!(pb.length(), Some(1000));
        drop(console);
        assert!(pb.is_finished());
    }
}
