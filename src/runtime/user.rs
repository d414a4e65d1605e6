//! User interaction operations (confirmation prompts).

use anyhow::Result;

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Ask `prompt` on `output` and read a yes/no answer from `input`.
pub(crate) fn confirm_with_io<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

impl RealRuntime {
    pub(crate) fn confirm_impl(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        confirm_with_io(prompt, &mut stdin_lock, &mut stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::confirm_with_io;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn accepts_yes_answers() -> Result<()> {
        for case in ["y\n", "Y\n", "yes\n", " YES \n"] {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            assert!(
                confirm_with_io("Install module foo.zip?", &mut input, &mut output)?,
                "expected '{}' to be accepted",
                case
            );
            assert!(String::from_utf8(output)?.contains("Install module foo.zip? [y/N]"));
        }
        Ok(())
    }

    #[test]
    fn rejects_everything_else() -> Result<()> {
        for case in ["n\n", "no\n", "\n", "", "maybe\n"] {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            assert!(
                !confirm_with_io("Uninstall module foo?", &mut input, &mut output)?,
                "expected '{}' to be rejected",
                case
            );
        }
        Ok(())
    }
}
