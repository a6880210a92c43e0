//! Event producers: newline-delimited input and a local demo generator.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};

use crate::event::SaltEvent;

/// Capacity of the producer channel. A full channel makes the producer wait.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open event input {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read event input: {0}")]
    Read(#[from] io::Error),
}

/// Where events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
    Demo { seed: u64 },
}

impl Source {
    pub fn label(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Demo { .. } => "demo".to_string(),
        }
    }
}

/// Runs `source` until it is exhausted or the receiving side goes away.
pub async fn run_source(source: Source, tx: mpsc::Sender<SaltEvent>) -> Result<(), SourceError> {
    info!(source = %source.label(), "event producer started");
    match source {
        Source::Stdin => {
            let count = read_events(BufReader::new(tokio::io::stdin()), &tx).await?;
            info!(count, "stdin closed");
        }
        Source::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|source| SourceError::Open { path: path.clone(), source })?;
            let count = read_events(BufReader::new(file), &tx).await?;
            info!(path = %path.display(), count, "event file exhausted");
        }
        Source::Demo { seed } => run_demo(seed, tx).await,
    }
    Ok(())
}

/// Parses newline-delimited events from `reader` and forwards them in order.
///
/// Blank lines are skipped and malformed lines are logged and skipped. Returns the number
/// of events forwarded.
pub async fn read_events<R>(mut reader: R, tx: &mpsc::Sender<SaltEvent>) -> Result<usize, SourceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    let mut sent = 0usize;

    loop {
        buf.clear();
        let bytes = reader.read_until(b'\n', &mut buf).await?;
        if bytes == 0 {
            break;
        }
        line_no += 1;

        let mut line_bytes = buf.as_slice();
        if line_bytes.ends_with(b"\n") {
            line_bytes = &line_bytes[..line_bytes.len() - 1];
        }
        if line_bytes.ends_with(b"\r") {
            line_bytes = &line_bytes[..line_bytes.len() - 1];
        }
        let line = match std::str::from_utf8(line_bytes) {
            Ok(line) => line,
            Err(error) => {
                warn!(line = line_no, %error, "skipping event line that is not utf-8");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match SaltEvent::parse_line(line) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    debug!("event receiver dropped; stopping producer");
                    break;
                }
                sent += 1;
            }
            Err(error) => warn!(line = line_no, %error, "skipping malformed event"),
        }
    }

    Ok(sent)
}

pub fn demo_seed() -> u64 {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    millis ^ u64::from(std::process::id()).wrapping_mul(0x9E3779B97F4A7C15)
}

pub(crate) struct DemoRng {
    state: u64,
}

impl DemoRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // splitmix64
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn gen_range_u32(&mut self, range: std::ops::Range<u32>) -> u32 {
        let width = range.end.saturating_sub(range.start);
        if width == 0 {
            return range.start;
        }
        range.start + (self.next_u64() % u64::from(width)) as u32
    }

    fn chance(&mut self, numerator: u32, denominator: u32) -> bool {
        if denominator == 0 {
            return false;
        }
        self.gen_range_u32(0..denominator) < numerator.min(denominator)
    }

    fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = self.gen_range_u32(0..items.len().max(1) as u32) as usize % items.len();
        &items[idx]
    }
}

const MINIONS: &[&str] = &["web01", "web02", "db01", "cache01", "minion07", "build-agent"];

#[derive(Debug, Clone, Copy)]
enum DemoJob {
    Ping,
    StateApply,
    Highstate,
    CmdRun,
    Grains,
}

#[derive(Debug, Clone, Copy)]
enum DemoEventKind {
    Job(DemoJob),
    Auth,
    MinionStart,
    Key,
}

fn demo_kind(rng: &mut DemoRng) -> DemoEventKind {
    match rng.gen_range_u32(0..100) {
        0..=24 => DemoEventKind::Job(DemoJob::Ping),
        25..=49 => DemoEventKind::Job(DemoJob::StateApply),
        50..=59 => DemoEventKind::Job(DemoJob::Highstate),
        60..=79 => DemoEventKind::Job(DemoJob::CmdRun),
        80..=87 => DemoEventKind::Job(DemoJob::Grains),
        88..=93 => DemoEventKind::Auth,
        94..=97 => DemoEventKind::MinionStart,
        _ => DemoEventKind::Key,
    }
}

fn stamp() -> String {
    Utc::now().format(STAMP_FORMAT).to_string()
}

fn jid(seq: u64) -> String {
    format!("{}{:06}", Utc::now().format("%Y%m%d%H%M%S"), seq % 1_000_000)
}

fn job_call(rng: &mut DemoRng, job: DemoJob) -> (&'static str, Vec<Value>) {
    const STATES: &[&str] = &["nginx", "postgres", "users", "ssh.hardening", "monitoring"];
    const COMMANDS: &[&str] = &["uptime", "df -h /", "systemctl status nginx", "tail -n 3 /var/log/syslog"];
    match job {
        DemoJob::Ping => ("test.ping", Vec::new()),
        DemoJob::StateApply => ("state.apply", vec![json!(*rng.choose(STATES)), json!("test=False")]),
        DemoJob::Highstate => ("state.highstate", Vec::new()),
        DemoJob::CmdRun => ("cmd.run", vec![json!(*rng.choose(COMMANDS))]),
        DemoJob::Grains => ("grains.item", vec![json!("os"), json!("osrelease")]),
    }
}

fn job_return(rng: &mut DemoRng, job: DemoJob, minion: &str, success: bool) -> Value {
    match job {
        DemoJob::Ping => json!(true),
        DemoJob::StateApply | DemoJob::Highstate => {
            let comment = if success {
                "All specified packages are already installed"
            } else {
                "Package nginx failed to install"
            };
            let changes = if rng.chance(1, 3) {
                json!({ "nginx": { "old": "", "new": "1.24.0" } })
            } else {
                json!({})
            };
            json!({
                "pkg_|-nginx_|-nginx_|-installed": {
                    "comment": comment,
                    "name": "nginx",
                    "result": success,
                    "changes": changes,
                    "duration": f64::from(rng.gen_range_u32(5..900)) + 0.25,
                    "__run_num__": 0,
                },
                "service_|-nginx_|-nginx_|-running": {
                    "comment": "The service nginx is already running",
                    "name": "nginx",
                    "result": success,
                    "changes": {},
                    "__run_num__": 1,
                }
            })
        }
        DemoJob::CmdRun if success => json!(format!(
            " 10:{:02}:{:02} up {} days,  2 users,  load average: 0.{:02}, 0.{:02}, 0.{:02}\n{minion}: ok",
            rng.gen_range_u32(0..60),
            rng.gen_range_u32(0..60),
            rng.gen_range_u32(1..400),
            rng.gen_range_u32(0..100),
            rng.gen_range_u32(0..100),
            rng.gen_range_u32(0..100),
        )),
        DemoJob::CmdRun => json!("/bin/sh: 1: command failed\nexit status 1"),
        DemoJob::Grains => json!({ "os": "Debian", "osrelease": "12" }),
    }
}

/// One burst of related demo events, in emission order.
pub(crate) fn demo_batch(rng: &mut DemoRng, seq: u64) -> Vec<SaltEvent> {
    match demo_kind(rng) {
        DemoEventKind::Job(job) => {
            let jid = jid(seq);
            let (fun, args) = job_call(rng, job);
            let count = 1 + rng.gen_range_u32(0..3) as usize;
            let first = rng.gen_range_u32(0..MINIONS.len() as u32) as usize;
            let targets: Vec<&str> =
                (0..count).map(|offset| MINIONS[(first + offset) % MINIONS.len()]).collect();

            let tgt = if count == 1 { targets[0] } else { "*" };

            let mut events = vec![SaltEvent::new(
                format!("salt/job/{jid}/new"),
                json!({
                    "jid": jid,
                    "fun": fun,
                    "arg": args,
                    "tgt": tgt,
                    "tgt_type": "glob",
                    "user": "root",
                    "minions": targets,
                    "_stamp": stamp(),
                }),
            )];
            for minion in targets {
                let success = !rng.chance(1, 8);
                let retcode = i32::from(!success);
                events.push(SaltEvent::new(
                    format!("salt/job/{jid}/ret/{minion}"),
                    json!({
                        "id": minion,
                        "jid": jid,
                        "fun": fun,
                        "fun_args": args,
                        "return": job_return(rng, job, minion, success),
                        "retcode": retcode,
                        "success": success,
                        "cmd": "_return",
                        "_stamp": stamp(),
                    }),
                ));
            }
            events
        }
        DemoEventKind::Auth => {
            let minion = *rng.choose(MINIONS);
            vec![SaltEvent::new(
                "salt/auth",
                json!({
                    "id": minion,
                    "act": "accept",
                    "result": true,
                    "pub": "-----BEGIN PUBLIC KEY-----\nMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA\n-----END PUBLIC KEY-----",
                    "_stamp": stamp(),
                }),
            )]
        }
        DemoEventKind::MinionStart => {
            let minion = *rng.choose(MINIONS);
            vec![SaltEvent::new(
                format!("salt/minion/{minion}/start"),
                json!({
                    "id": minion,
                    "cmd": "_minion_event",
                    "data": format!("Minion {minion} started at {}", Utc::now().to_rfc2822()),
                    "_stamp": stamp(),
                }),
            )]
        }
        DemoEventKind::Key => {
            let minion = *rng.choose(MINIONS);
            vec![SaltEvent::new(
                "salt/key",
                json!({ "id": minion, "act": "accept", "result": true, "_stamp": stamp() }),
            )]
        }
    }
}

/// Emits plausible Salt traffic until the receiver is dropped.
pub async fn run_demo(seed: u64, tx: mpsc::Sender<SaltEvent>) {
    let mut rng = DemoRng::new(seed);
    let mut pending: VecDeque<SaltEvent> = VecDeque::new();
    let mut seq = 0u64;

    // Small delay so the TUI is already up.
    time::sleep(Duration::from_millis(250)).await;

    loop {
        if pending.is_empty() {
            seq = seq.wrapping_add(1);
            pending.extend(demo_batch(&mut rng, seq));
        }
        let Some(event) = pending.pop_front() else {
            continue;
        };

        let delay_ms = 120 + u64::from(rng.gen_range_u32(0..600));
        time::sleep(Duration::from_millis(delay_ms)).await;
        if tx.send(event).await.is_err() {
            debug!("demo receiver dropped; stopping");
            break;
        }
    }
}
