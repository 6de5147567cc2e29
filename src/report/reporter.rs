use crate::error::ConfigError;
use crate::radar::{DiagnosticKind, MatchEvent, RadarEvent};
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::path::Path;
use tokio::sync::mpsc;

/// Counters kept over the lifetime of one capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub matches: u64,
    pub fragments: u64,
    pub last_fragments: u64,
    pub non_matching: u64,
    pub failed_writes: u64,
}

/// Consumes classifier events: matches go to the console and result file,
/// everything else to the debug log.
pub struct Reporter<W: Write = io::Stdout> {
    rx: mpsc::Receiver<RadarEvent>,
    console: W,
    results: Option<File>,
    summary: ReportSummary,
}

impl Reporter<io::Stdout> {
    pub fn new(rx: mpsc::Receiver<RadarEvent>, output: Option<&Path>) -> Result<Self, ConfigError> {
        Self::with_console(rx, io::stdout(), output)
    }
}

impl<W: Write> Reporter<W> {
    pub fn with_console(
        rx: mpsc::Receiver<RadarEvent>,
        console: W,
        output: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let results = output
            .map(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| ConfigError::OutputFile {
                        path: path.to_path_buf(),
                        source,
                    })
            })
            .transpose()?;

        if let Some(path) = output {
            info!("Appending matches to {}", path.display());
        }

        Ok(Self {
            rx,
            console,
            results,
            summary: ReportSummary::default(),
        })
    }

    /// Blocks until every sender is gone. Console and file writes are
    /// synchronous, so this belongs on a blocking worker thread.
    pub fn run(mut self) -> ReportSummary {
        while let Some(event) = self.rx.blocking_recv() {
            self.handle(event);
        }

        let s = self.summary;
        info!(
            "Session summary: {} matches, {} fragments, {} last fragments, {} non-matching",
            s.matches, s.fragments, s.last_fragments, s.non_matching
        );
        if s.failed_writes > 0 {
            warn!("{} result lines could not be written", s.failed_writes);
        }
        s
    }

    pub fn handle(&mut self, event: RadarEvent) {
        match event {
            RadarEvent::Match(m) => self.report_match(&m),
            RadarEvent::Diagnostic { kind, source } => self.report_diagnostic(kind, source),
        }
    }

    /// Write failures are counted and logged; they never stop reporting.
    pub fn report_match(&mut self, event: &MatchEvent) {
        self.summary.matches += 1;

        // Clear whatever partial line is on the terminal before printing.
        let line = format!(
            "\x1b[2K\r[{}] Response from {}, amp ratio: {:.2}",
            event.observed_at.format("%H:%M:%S"),
            event.source,
            event.ratio
        );
        if let Err(e) = writeln!(self.console, "{line}").and_then(|()| self.console.flush()) {
            self.summary.failed_writes += 1;
            warn!("Failed to print match from {}: {e}", event.source);
        }

        if let Some(file) = self.results.as_mut()
            && let Err(e) = writeln!(file, "{}", event.source).and_then(|()| file.flush())
        {
            self.summary.failed_writes += 1;
            warn!("Failed to append {} to result file: {e}", event.source);
        }
    }

    pub fn report_diagnostic(&mut self, kind: DiagnosticKind, source: Ipv4Addr) {
        match kind {
            DiagnosticKind::Fragment => self.summary.fragments += 1,
            DiagnosticKind::LastFragment => self.summary.last_fragments += 1,
            DiagnosticKind::NonMatching(_) => self.summary.non_matching += 1,
        }
        debug!("{kind} from {source}");
    }

    pub fn summary(&self) -> ReportSummary {
        self.summary
    }

    pub fn console(&self) -> &W {
        &self.console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radar::Miss;
    use chrono::Local;
    use std::fs;

    fn match_event(source: Ipv4Addr, ratio: f64) -> MatchEvent {
        MatchEvent {
            source,
            ratio,
            observed_at: Local::now(),
        }
    }

    #[test]
    fn match_is_printed_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amplifiers.txt");
        fs::write(&path, "192.0.2.1\n").unwrap();

        let (_tx, rx) = mpsc::channel(4);
        let mut reporter = Reporter::with_console(rx, Vec::new(), Some(&path)).unwrap();
        reporter.report_match(&match_event(Ipv4Addr::new(198, 51, 100, 7), 20.0));
        reporter.report_match(&match_event(Ipv4Addr::new(203, 0, 113, 9), 37.5));

        let console = String::from_utf8(reporter.console().clone()).unwrap();
        assert!(console.contains("Response from 198.51.100.7, amp ratio: 20.00\n"));
        assert!(console.contains("Response from 203.0.113.9, amp ratio: 37.50\n"));
        assert!(console.starts_with("\x1b[2K\r"));

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "192.0.2.1\n198.51.100.7\n203.0.113.9\n"
        );
        assert_eq!(reporter.summary().matches, 2);
    }

    #[test]
    fn diagnostics_do_not_touch_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amplifiers.txt");

        let (_tx, rx) = mpsc::channel(4);
        let mut reporter = Reporter::with_console(rx, Vec::new(), Some(&path)).unwrap();
        let source = Ipv4Addr::new(198, 51, 100, 7);
        reporter.report_diagnostic(DiagnosticKind::Fragment, source);
        reporter.report_diagnostic(DiagnosticKind::LastFragment, source);
        reporter.report_diagnostic(DiagnosticKind::NonMatching(Miss::BelowThreshold), source);
        reporter.report_diagnostic(DiagnosticKind::NonMatching(Miss::UnknownProbe), source);

        assert!(reporter.console().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert_eq!(
            reporter.summary(),
            ReportSummary {
                fragments: 1,
                last_fragments: 1,
                non_matching: 2,
                ..ReportSummary::default()
            }
        );
    }

    #[test]
    fn unopenable_result_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let (_tx, rx) = mpsc::channel(4);
        let err = Reporter::with_console(rx, Vec::new(), Some(&path))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::OutputFile { .. }));
    }

    #[test]
    fn console_failure_does_not_stop_file_append() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amplifiers.txt");

        let (_tx, rx) = mpsc::channel(4);
        let mut reporter = Reporter::with_console(rx, Broken, Some(&path)).unwrap();
        reporter.report_match(&match_event(Ipv4Addr::new(198, 51, 100, 7), 12.0));

        assert_eq!(fs::read_to_string(&path).unwrap(), "198.51.100.7\n");
        assert_eq!(reporter.summary().failed_writes, 1);
    }

    #[test]
    fn run_drains_channel_in_order() {
        let (tx, rx) = mpsc::channel(8);
        let reporter = Reporter::with_console(rx, Vec::new(), None).unwrap();

        let source = Ipv4Addr::new(198, 51, 100, 7);
        tx.try_send(RadarEvent::Diagnostic {
            kind: DiagnosticKind::Fragment,
            source,
        })
        .unwrap();
        tx.try_send(RadarEvent::Match(match_event(source, 20.0)))
            .unwrap();
        drop(tx);

        let summary = reporter.run();
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.fragments, 1);
    }

    #[tokio::test]
    async fn run_on_blocking_worker_leaves_runtime_free() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amplifiers.txt");
        let (tx, rx) = mpsc::channel(8);
        let reporter = Reporter::with_console(rx, Vec::new(), Some(&path)).unwrap();
        let handle = tokio::task::spawn_blocking(move || reporter.run());

        let source = Ipv4Addr::new(198, 51, 100, 7);
        for _ in 0..3 {
            tx.send(RadarEvent::Match(match_event(source, 20.0)))
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.matches, 3);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "198.51.100.7\n".repeat(3)
        );
    }
}
