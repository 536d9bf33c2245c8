//! Output framing: raw capture in, clean command output out.
//!
//! The device echoes keystrokes, redraws its prompt, and may leave debris
//! from the paging-disable commands sent at session start. Framing strips
//! all of that, in a fixed order, and is idempotent: framing an already
//! framed output with the same command yields it unchanged.

use crate::session::PAGING_DISABLE_COMMANDS;

/// Turn a decoded raw capture plus the originating command into clean output.
///
/// Steps, order-sensitive:
/// 1. remove the first occurrence of the echoed command (CRLF or LF form);
/// 2. drop lines containing paging-disable debris, including truncated
///    partial echoes from slow terminal redraws;
/// 3. drop one trailing line that is blank or prompt-like (`#`, `>`, `]`);
/// 4. re-join and trim.
///
/// Stripping everything is fine: empty output is valid for commands like
/// mode toggles.
pub fn frame_output(raw: &str, command: &str) -> String {
    let echoed = strip_echo(raw, command);

    let mut lines: Vec<&str> = echoed.lines().filter(|l| !is_paging_debris(l)).collect();

    if let Some(last) = lines.last() {
        let tail = last.trim();
        if tail.is_empty() || tail.ends_with(['#', '>', ']']) {
            lines.pop();
        }
    }

    lines.join("\n").trim().to_string()
}

/// Remove the first occurrence of the echoed command text.
fn strip_echo(raw: &str, command: &str) -> String {
    let crlf = format!("{command}\r\n");
    if raw.contains(&crlf) {
        return raw.replacen(&crlf, "", 1);
    }
    let lf = format!("{command}\n");
    if raw.contains(&lf) {
        return raw.replacen(&lf, "", 1);
    }
    raw.to_string()
}

/// Lines that carry paging-disable residue, including partial echoes.
fn is_paging_debris(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    PAGING_DISABLE_COMMANDS.iter().any(|cmd| {
        // Full command anywhere in the line (often glued to a prompt), or
        // the line is a truncated fragment of the command itself.
        trimmed.contains(cmd) || (trimmed.len() >= 5 && cmd.contains(trimmed))
    })
}
