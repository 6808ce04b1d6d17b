#![allow(dead_code)]

use std::fmt::Display;

/// Re-exports of useful things, imported with `use crate::utils::prelude::*;`
/// throughout the crate.
pub mod prelude {
    pub use anyhow::{Context as _, Result as AnyResult};
    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, trace, warn};

    pub use super::ErrorExt;
}

pub trait ErrorExt {
    /// Flatten an error chain into a single `": "`-joined line, useful for
    /// logging without losing the `source()` chain.
    fn oneliner(&self) -> String;
}

impl ErrorExt for anyhow::Error {
    fn oneliner(&self) -> String {
        self.chain()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ")
    }
}

/// Create a slightly nicer, comma separated, backtick-quoted list from a slice.
pub fn nice_list<T: Display>(list: &[T]) -> String {
    let mut iter = list.iter();
    let mut out = iter.next().map(|s| format!("`{s}`")).unwrap_or_default();

    for item in iter {
        out.push_str(&format!(", `{item}`"));
    }

    out
}

/// The current local wall-clock time of day, as `(hour, minute)`.
///
/// Centralized here so time-restriction checks don't sprinkle `chrono::Local`
/// calls across the policy module.
pub fn local_hm_now() -> (u32, u32) {
    use chrono::Timelike;
    let now = chrono::Local::now();
    (now.hour(), now.minute())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_list_formats() {
        assert_eq!(nice_list::<&str>(&[]), "");
        assert_eq!(nice_list(&["a"]), "`a`");
        assert_eq!(nice_list(&["a", "b", "c"]), "`a`, `b`, `c`");
    }
}
