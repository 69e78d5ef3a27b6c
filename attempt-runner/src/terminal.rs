//! Line based front end for an attempt.
use attempt_engine::driver::{QuestionView, Update, UserAction};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Action(UserAction),
    Quit,
    Unknown,
}

/// Options are numbered from 1 in the order they are shown
pub fn parse_command(line: &str, question: Option<&QuestionView>) -> Command {
    let line = line.trim().to_lowercase();
    match line.as_str() {
        "n" | "next" => Command::Action(UserAction::Next),
        "y" | "ok" => Command::Action(UserAction::Acknowledge),
        "q" | "quit" => Command::Quit,
        other => {
            let Ok(choice) = other.parse::<usize>() else {
                return Command::Unknown;
            };
            let option = question
                .and_then(|q| choice.checked_sub(1).and_then(|i| q.options.get(i)));
            match option {
                Some(option) => Command::Action(UserAction::Select {
                    option_id: option.id.clone(),
                }),
                None => Command::Unknown,
            }
        }
    }
}

fn render(update: &Update, question: Option<&QuestionView>) -> Option<String> {
    let text = match update {
        Update::Question {
            index,
            count,
            question,
            budget,
            selected,
        } => {
            let mut text = format!(
                "\nQuestion {} of {} ({} pts, {}s)\n{}\n",
                index + 1,
                count,
                question.points,
                budget.as_secs(),
                question.text
            );
            for (i, option) in question.options.iter().enumerate() {
                let marker = if selected.as_ref() == Some(&option.id) {
                    "*"
                } else {
                    " "
                };
                text.push_str(&format!("{marker} {}) {}\n", i + 1, option.text));
            }
            text.push_str(
                "Choose an option number, then 'n' to continue. \
                 Questions cannot be revisited.\n",
            );
            text
        }
        Update::Tick { remaining, .. } => {
            let seconds = remaining.as_secs();
            if seconds > 5 && seconds % 10 != 0 {
                return None;
            }
            format!("  {seconds}s left\n")
        }
        Update::AnswerRecorded { option_id, .. } => {
            let label = question
                .and_then(|q| q.options.iter().find(|o| &o.id == option_id))
                .map_or(option_id.as_str(), |o| o.text.as_str());
            format!("Selected: {label}\n")
        }
        Update::Rejected { reason } => format!("! {reason}\n"),
        Update::Submitting => "Submitting answers...\n".to_string(),
        Update::SubmissionFailed { message } => {
            format!("! {message} Press 'n' to submit again.\n")
        }
        Update::Completed { result, stats } => {
            let outcome = if result.passed { "PASSED" } else { "FAILED" };
            let mut text = format!(
                "\n{outcome}\nScore: {:.1}% (passing {:.1}%)\n",
                result.score, result.passing_criteria,
            );
            text.push_str(&format!(
                "Correct: {}  Incorrect: {}  Total: {}\n",
                result.correct_answers, result.wrong_answers, result.total_questions,
            ));
            text.push_str(&format!(
                "Time: {:.0}s\nPress 'y' to finish.\n",
                stats.time_to_complete
            ));
            text
        }
    };
    Some(text)
}

/// Renders engine updates to `output` and turns lines read from `input` into
/// actions, until the engine stops sending updates.
pub async fn run_terminal<R, W>(
    input: R,
    mut output: W,
    actions: mpsc::Sender<UserAction>,
    mut updates: mpsc::UnboundedReceiver<Update>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut actions = Some(actions);
    let mut question: Option<QuestionView> = None;
    let mut completed = false;

    loop {
        tokio::select! {
            // Apply pending updates before parsing input against the shown question
            biased;

            update = updates.recv() => {
                let Some(update) = update else {
                    break;
                };
                if let Some(text) = render(&update, question.as_ref()) {
                    output.write_all(text.as_bytes()).await?;
                    output.flush().await?;
                }
                match update {
                    Update::Question { question: shown, .. } => question = Some(shown),
                    Update::Completed { .. } => completed = true,
                    _ => {}
                }
            }
            line = lines.next_line(), if actions.is_some() => {
                let Some(line) = line? else {
                    debug!("input closed");
                    actions = None;
                    continue;
                };
                match parse_command(&line, question.as_ref()) {
                    Command::Action(action) => {
                        let done = completed && action == UserAction::Acknowledge;
                        let sent = match &actions {
                            Some(sender) => sender.send(action).await.is_ok(),
                            None => false,
                        };
                        // Stop reading after the result is dismissed, so no read
                        // is left pending once the attempt ends
                        if !sent || done {
                            actions = None;
                        }
                    }
                    Command::Quit => {
                        actions = None;
                    }
                    Command::Unknown => {
                        output.write_all(b"? Unrecognised input\n").await?;
                        output.flush().await?;
                    }
                }
            }
        }
    }

    Ok(())
}
