#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use streamer_core::Event;
use streamer_engine::{EngineConfig, EventSink, JobRequest, ToolCommand};
use tempfile::TempDir;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// A stand-in for the extractor: a shell script that prints `listing` when
/// called in flat-playlist mode and runs `download` otherwise.
pub struct FakeExtractor {
    pub dir: TempDir,
    pub config: EngineConfig,
}

impl FakeExtractor {
    pub fn new(listing: &str, download: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-extractor.sh");
        let body = format!(
            "#!/bin/sh\ncase \" $* \" in\n  *\" --flat-playlist \"*)\n{listing}\n    ;;\n  *)\n{download}\n    ;;\nesac\n"
        );
        fs::write(&script, body).unwrap();

        let config = EngineConfig {
            extractor: ToolCommand::at("/bin/sh").with_args([script.to_string_lossy()]),
            ffmpeg: ToolCommand::at("/bin/sh"),
            fetch_timeout: Duration::from_secs(10),
            kill_grace: Duration::from_millis(200),
            exit_wait: Duration::from_secs(2),
            ..EngineConfig::default()
        };
        Self { dir, config }
    }

    pub fn target_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn request(&self) -> JobRequest {
        JobRequest {
            source: Some("https://www.youtube.com/playlist?list=PLtest".to_string()),
            target_dir: self.target_dir(),
        }
    }

    pub fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// `echo` lines for a flat listing of `count` entries.
pub fn listing_of(count: usize) -> String {
    (1..=count)
        .map(|n| format!("echo '{{\"id\": \"vid{n}\", \"title\": \"Song {n}\"}}'"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn last_message(events: &[Event], name: &str) -> Option<String> {
    events.iter().rev().find_map(|event| match event {
        Event::Error { message } if name == "error" => Some(message.clone()),
        Event::Status { message } if name == "status" => Some(message.clone()),
        Event::StreamEnd { message } if name == "stream_end" => Some(message.clone()),
        _ => None,
    })
}

/// Checks the pid with `kill -0`; a reaped or never-started pid is not alive.
pub fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Polls until `path` exists with content, for up to ten seconds.
pub async fn read_when_written(path: &std::path::Path) -> String {
    for _ in 0..100 {
        if let Ok(text) = fs::read_to_string(path) {
            if !text.trim().is_empty() {
                return text;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{} was never written", path.display());
}
