//! Reporting the progress of multi-step workflows

use colored::Colorize;
use tracing::debug;

/// Observer notified as a workflow moves through its steps
pub trait Progress {
    /// A step has started
    fn start(&mut self, message: &str);

    /// The running step has something to report
    fn update(&mut self, message: &str);

    /// The running step succeeded
    fn succeed(&mut self, message: &str);

    /// The running step failed
    fn fail(&mut self, message: &str);
}

/// Prints step markers to the terminal
#[derive(Debug, Default)]
pub struct TerminalProgress;

impl Progress for TerminalProgress {
    fn start(&mut self, message: &str) {
        debug!("step started: {}", message);
        eprintln!("{} {}", "…".cyan(), message);
    }

    fn update(&mut self, message: &str) {
        eprintln!("  {}", message.dimmed());
    }

    fn succeed(&mut self, message: &str) {
        eprintln!("{} {}", "✔".green(), message);
    }

    fn fail(&mut self, message: &str) {
        eprintln!("{} {}", "✖".red(), message.red());
    }
}
