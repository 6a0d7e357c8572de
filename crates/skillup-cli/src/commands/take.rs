//! The `skillup take` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use comfy_table::Table;
use tokio::sync::mpsc;

use skillup_client::{load_config_from, ApiClient};
use skillup_core::driver::{ExamDriver, ExamObserver, ExamOutcome};
use skillup_core::exam::{ExamPhase, Selection};
use skillup_core::model::{OptionId, Question};
use skillup_core::session::{ExamCommand, ExamSession};

use crate::TestArgs;

const HELP: &str = "Commands: a-d to select, `confirm` to lock in, `next`, `prev`, `quit`";

pub async fn execute(
    test: TestArgs,
    duration: Option<u32>,
    no_submit: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let request = super::build_request(&test, &config)?;
    let client = Arc::new(ApiClient::from_config(&config)?);

    let mut exam_config = config.exam;
    if let Some(secs) = duration {
        exam_config.duration_secs = secs;
    }

    let mut driver = ExamDriver::new(client.clone(), exam_config);
    if no_submit {
        tracing::info!("result submission disabled");
    } else if config.uid.is_some() {
        driver = driver.with_submitter(client);
    } else {
        tracing::warn!("no uid configured, results will not be submitted");
    }

    let (tx, rx) = mpsc::channel(16);
    spawn_input(tx);

    println!(
        "Test {} ({} / {} / {}), {} to answer.",
        request.meta.key(),
        request.meta.position,
        request.meta.subposition,
        request.meta.level,
        format_clock(exam_config.duration_secs),
    );
    println!("{HELP}\n");

    let mut view = TerminalView::default();
    match driver.run(request, rx, &mut view).await? {
        ExamOutcome::Failed(message) => anyhow::bail!("failed to generate the test: {message}"),
        _ => Ok(()),
    }
}

/// Read commands from stdin on a dedicated thread.
///
/// Closing stdin stops input; the exam then runs until the timer ends it.
fn spawn_input(tx: mpsc::Sender<ExamCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Some(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("{HELP}"),
            }
        }
    });
}

fn parse_command(line: &str) -> Option<ExamCommand> {
    let word = line.trim().to_ascii_lowercase();
    match word.as_str() {
        "confirm" | "ok" => Some(ExamCommand::Confirm),
        "next" | "n" => Some(ExamCommand::Next),
        "prev" | "previous" | "p" => Some(ExamCommand::Previous),
        "quit" | "exit" | "q" => Some(ExamCommand::Quit),
        _ => word.parse::<OptionId>().ok().map(ExamCommand::Select),
    }
}

/// `Question 3/10`, plus arrival progress while the test is still streaming.
fn question_header(index: usize, arrived: usize, expected: usize, streaming: bool) -> String {
    let total = expected.max(arrived);
    let mut header = format!("Question {}/{total}", index + 1);
    if streaming && arrived < total {
        header.push_str(&format!(" ({arrived}/{total} generated)"));
    }
    header
}

fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Line-oriented rendering of the exam.
#[derive(Default)]
struct TerminalView {
    shown: Option<(String, Selection)>,
    announced_loading: bool,
}

impl TerminalView {
    fn print_question(index: usize, session: &ExamSession, question: &Question) {
        println!(
            "\n{}",
            question_header(
                index,
                session.questions().len(),
                session.exam().config().expected_questions,
                session.state().is_streaming,
            )
        );
        println!("{}", question.question);
        if let Some(code) = &question.code {
            println!();
            for line in code.lines() {
                println!("    {line}");
            }
            println!();
        }
        for option in &question.options {
            println!("  {}) {}", option.id, option.text);
        }
    }

    fn print_selection(question: &Question, selection: Selection, last: bool) {
        match selection {
            Selection::Unselected => {}
            Selection::Selected(chosen) => {
                println!("Selected {chosen}. Type `confirm` to lock it in.");
            }
            Selection::Revealed { correct: true, .. } => {
                println!("Correct!");
                Self::print_explanation(question, last);
            }
            Selection::Revealed { chosen, .. } => {
                println!(
                    "Wrong: you chose {chosen}, the answer is {}.",
                    question.correct_answer
                );
                Self::print_explanation(question, last);
            }
        }
    }

    fn print_explanation(question: &Question, last: bool) {
        if let Some(explanation) = &question.explanation {
            println!("{explanation}");
        }
        if last {
            println!("Type `next` to finish.");
        } else {
            println!("Type `next` to continue.");
        }
    }
}

impl ExamObserver for TerminalView {
    fn on_update(&mut self, session: &ExamSession) {
        match session.phase() {
            ExamPhase::Loading if !self.announced_loading => {
                println!("Generating your test...");
                self.announced_loading = true;
            }
            ExamPhase::Answering { index, selection } => {
                let Some(question) = session.current_question() else {
                    return;
                };
                let shown = (question.id.clone(), selection);
                if self.shown.as_ref() == Some(&shown) {
                    return;
                }
                let new_question = self
                    .shown
                    .as_ref()
                    .map_or(true, |(id, _)| id != &question.id);
                self.shown = Some(shown);

                if new_question {
                    Self::print_question(index, session, question);
                }
                let last = !session.state().is_streaming
                    && index + 1 == session.questions().len();
                Self::print_selection(question, selection, last);
            }
            _ => {}
        }
    }

    fn on_tick(&mut self, _session: &ExamSession, time_left: u32) {
        if time_left > 0 && (time_left % 60 == 0 || time_left == 30 || time_left == 10) {
            println!("[{} left]", format_clock(time_left));
        }
    }

    fn on_finished(&mut self, outcome: &ExamOutcome) {
        match outcome {
            ExamOutcome::Completed { card, submitted } => {
                let grade = card.grade();
                if card.time_up {
                    println!("\nTime's up!");
                }
                let mut table = Table::new();
                table.set_header(vec!["Correct", "Total", "Score", "Grade"]);
                table.add_row(vec![
                    card.correct.to_string(),
                    card.total.to_string(),
                    format!("{}%", card.percentage),
                    grade.to_string(),
                ]);
                println!("\n{table}");
                println!("{}", grade.message());
                if *submitted {
                    println!("Result submitted.");
                }
            }
            ExamOutcome::Quit => println!("Left the test."),
            ExamOutcome::Failed(_) => {
                eprintln!("Failed to generate the test. Please try again.");
            }
        }
    }
}
