use std::io::Write;
use std::process::{ Command, Stdio };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard command `{0}` failed")]
    Failed(&'static str),
    #[error("no clipboard command found (install wl-copy, xclip, or xsel)")]
    Unavailable,
}

#[cfg(target_os = "macos")]
const HELPERS: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const HELPERS: &[(&str, &[&str])] = &[("cmd", &["/C", "clip"])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const HELPERS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Copies `text` through the first platform clipboard helper that works.
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    let mut last_failure = None;
    for &(program, args) in HELPERS {
        match pipe_into(program, args, text) {
            Ok(()) => return Ok(()),
            Err(e @ ClipboardError::Failed(_)) => last_failure = Some(e),
            Err(ClipboardError::Unavailable) => {}
        }
    }
    Err(last_failure.unwrap_or(ClipboardError::Unavailable))
}

fn pipe_into(program: &'static str, args: &[&str], input: &str) -> Result<(), ClipboardError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| ClipboardError::Unavailable)?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).map_err(|_| ClipboardError::Failed(program))?;
    }

    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(ClipboardError::Failed(program)),
    }
}
