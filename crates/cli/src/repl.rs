//! Line-oriented interactive session.

use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use triage_core::{Classifier, EmailInput};

/// Typed at the subject prompt to end the session, in any letter case.
pub const QUIT: &str = "quit";

const BANNER: &str = "Email Classification System\nEnter email details (type 'quit' to exit):\n";

/// Reads one email: a subject line, then body lines until a blank line that
/// follows at least one non-blank line. Blank lines before the body are
/// skipped. Returns `None` on `quit` or end of input at the subject prompt.
pub async fn read_email<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
) -> std::io::Result<Option<EmailInput>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    out.write_all(b"\nSubject: ").await?;
    out.flush().await?;
    let Some(subject) = lines.next_line().await? else {
        return Ok(None);
    };
    if subject.eq_ignore_ascii_case(QUIT) {
        return Ok(None);
    }

    out.write_all(b"\nBody (press enter twice to finish):\n").await?;
    let mut body: Vec<String> = Vec::new();
    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;
        match lines.next_line().await? {
            None => break,
            Some(line) if line.trim().is_empty() => {
                if !body.is_empty() {
                    break;
                }
            }
            Some(line) => body.push(line),
        }
    }
    Ok(Some(EmailInput::new(subject, body.join("\n"))))
}

/// Pretty JSON printed when something escapes the classifier boundary.
pub fn error_envelope(err: &anyhow::Error) -> String {
    format!(
        "{:#}",
        json!({
            "error": "Processing failed",
            "details": format!("{err:#}"),
        })
    )
}

async fn respond(classifier: &Classifier, email: &EmailInput) -> anyhow::Result<String> {
    let result = classifier.classify(email).await;
    Ok(format!(
        "\nJSON RESPONSE:\n{}\n",
        serde_json::to_string_pretty(&result)?
    ))
}

/// Runs the prompt loop until `quit` or end of input. Returns how many
/// emails were handled.
///
/// An unreadable line (e.g. invalid UTF-8) is reported with the error
/// envelope and the loop prompts for the next email. Any other input error
/// is reported the same way and ends the session, since the stream will not
/// recover.
pub async fn run_session<R, W>(
    classifier: &Classifier,
    input: R,
    out: &mut W,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    out.write_all(BANNER.as_bytes()).await?;

    let mut handled = 0;
    loop {
        let email = match read_email(&mut lines, out).await {
            Ok(Some(email)) => email,
            Ok(None) => break,
            Err(e) => {
                let fatal = e.kind() != std::io::ErrorKind::InvalidData;
                tracing::warn!(error = %e, fatal, "failed to read email");
                let err = anyhow::Error::new(e).context("reading email");
                out.write_all(format!("{}\n", error_envelope(&err)).as_bytes())
                    .await?;
                out.flush().await?;
                if fatal {
                    break;
                }
                continue;
            }
        };
        out.write_all(b"\nAnalyzing email...\n").await?;
        out.flush().await?;
        let text = match respond(classifier, &email).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to render classification");
                format!("{}\n", error_envelope(&e))
            }
        };
        out.write_all(text.as_bytes()).await?;
        out.flush().await?;
        handled += 1;
    }
    tracing::info!(handled, "interactive session ended");
    Ok(handled)
}
