//! Unified UI output interface.
//!
//! Commands and the core [`Reporter`] hooks print through [`Output`], so
//! every status line shares one look. Warnings and errors go to stderr.

use crossterm::style::{Color, Stylize};
use yapl_core::Reporter;

use super::theme::Theme;

/// A cloneable handle for printing styled status lines.
#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints a visual section header for an operation phase.
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.with(self.theme.colors.header).bold());
    }

    /// Prints an informational message to the console.
    pub fn info(&self, msg: &str) {
        println!(
            "{} {msg}",
            self.theme.icons.info.with(self.theme.colors.secondary)
        );
    }

    /// Prints a success message to the console.
    pub fn success(&self, msg: &str) {
        println!(
            "{} {msg}",
            self.theme.icons.success.with(self.theme.colors.success)
        );
    }

    /// Prints a warning message to stderr.
    pub fn warning(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    /// Prints an error message to stderr.
    pub fn error(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }

    fn component_line(
        &self,
        icon: &str,
        color: Color,
        component: &str,
        version: &str,
        detail: &str,
    ) {
        let component = format!("{component: <14}");
        let version = format!("{version: <24}");
        println!(
            "  {} {} {} {}",
            icon.with(color),
            component.with(self.theme.colors.component),
            version.with(self.theme.colors.version),
            detail.with(self.theme.colors.secondary)
        );
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        Output::section(self, title);
    }

    fn fetching(&self, component: &str, version: &str) {
        self.component_line(
            self.theme.icons.active,
            self.theme.colors.active,
            component,
            version,
            "fetching",
        );
    }

    fn done(&self, component: &str, version: &str, detail: &str) {
        self.component_line(
            self.theme.icons.success,
            self.theme.colors.success,
            component,
            version,
            detail,
        );
    }

    fn warning(&self, msg: &str) {
        Output::warning(self, msg);
    }
}
