//! Driver for the reference cut-and-paste protocol
//!
//! Reads the initial text on the first line, an operation count on the second, then that many
//! `i j k` triples, one per line. Each triple cuts the characters at positions `i..=j` and
//! reinserts them after the `k`-th character of the remaining text. The final text is printed
//! once all operations have been applied.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};

use braid::Rope;

fn main() -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let text = read_line(&mut lines).context("expected the initial text on the first line")?;
    let mut rope: Rope = text.trim().parse()?;

    let ops: usize = read_line(&mut lines)
        .context("expected an operation count on the second line")?
        .trim()
        .parse()
        .context("operation count is not a number")?;

    for op in 1..=ops {
        let line = read_line(&mut lines).with_context(|| format!("expected operation {op}"))?;
        let (i, j, k) =
            parse_triple(&line).with_context(|| format!("operation {op} is malformed"))?;
        rope.move_range(i, j, k)
            .with_context(|| format!("operation {op} failed"))?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", rope.render())?;

    Ok(())
}

// Pull the next line of input, treating end-of-stream as an error
fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<String> {
    match lines.next() {
        Some(line) => Ok(line?),
        None => bail!("unexpected end of input"),
    }
}

// Parse a whitespace-separated `i j k` triple
fn parse_triple(line: &str) -> Result<(usize, usize, usize)> {
    let mut fields = line.split_whitespace().map(str::parse::<usize>);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(Ok(i)), Some(Ok(j)), Some(Ok(k))) => Ok((i, j, k)),
        _ => bail!("expected three non-negative integers, got {line:?}"),
    }
}
