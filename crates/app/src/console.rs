//! Interactive terminal front-end for a running exam.

use std::fmt;
use std::time::Duration;

use exam_core::QuizResult;
use exam_core::model::Question;
use services::{ExamLoopService, ExamSession, SubmitOutcome, TimerTick};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Remaining-time marks at which the learner is warned, in seconds.
const WARN_AT: [i64; 2] = [300, 60];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    /// 1-based question number.
    Jump(usize),
    Answer(Vec<char>),
    Clear,
    Time,
    Show,
    Submit,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingNumber,
    InvalidNumber(String),
    MissingLetters,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command, `h` for help"),
            CommandError::Unknown(raw) => write!(f, "unknown command: {raw}"),
            CommandError::MissingNumber => write!(f, "`j` needs a question number"),
            CommandError::InvalidNumber(raw) => write!(f, "not a question number: {raw}"),
            CommandError::MissingLetters => write!(f, "`a` needs option letters, e.g. `a BD`"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(CommandError::Empty);
    };
    let rest: Vec<&str> = parts.collect();

    match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Ok(Command::Next),
        "p" | "prev" => Ok(Command::Prev),
        "j" | "jump" => {
            let raw = rest.first().ok_or(CommandError::MissingNumber)?;
            let number: usize = raw
                .parse()
                .map_err(|_| CommandError::InvalidNumber((*raw).to_owned()))?;
            if number == 0 {
                return Err(CommandError::InvalidNumber((*raw).to_owned()));
            }
            Ok(Command::Jump(number))
        }
        "a" | "answer" => {
            let letters: Vec<char> = rest
                .iter()
                .flat_map(|chunk| chunk.chars())
                .filter(char::is_ascii_alphabetic)
                .map(|c| c.to_ascii_uppercase())
                .collect();
            if letters.is_empty() {
                return Err(CommandError::MissingLetters);
            }
            Ok(Command::Answer(letters))
        }
        "c" | "clear" => Ok(Command::Clear),
        "t" | "time" => Ok(Command::Time),
        "v" | "show" => Ok(Command::Show),
        "s" | "submit" => Ok(Command::Submit),
        "q" | "quit" => Ok(Command::Quit),
        "h" | "help" | "?" => Ok(Command::Help),
        other => Err(CommandError::Unknown(other.to_owned())),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  n | p        next / previous question (wraps around)");
    println!("  j <number>   jump to question <number>");
    println!("  a <letters>  answer the current question, e.g. `a B` or `a A C`");
    println!("  c            clear the current answer");
    println!("  v            show the current question again");
    println!("  t            show the remaining time");
    println!("  s            submit the exam");
    println!("  q            save and quit (resume later with the printed token)");
}

fn render(session: &ExamSession, tick: &TimerTick) {
    let current = session.current();
    let progress = session.progress();
    println!();
    println!(
        "Question {}/{}  [{} left]  answered {}/{} ({:.0}%)",
        current.number, current.total, tick.display, progress.answered, progress.total, progress.percent
    );
    println!("{}", current.question.text());
    if let Some(image) = current.question.image_url() {
        println!("  (image: {image})");
    }
    for (i, option) in current.question.options().iter().enumerate() {
        let letter = Question::letter_for(i).unwrap_or('?');
        let mark = if current.selected.contains(&letter) { '*' } else { ' ' };
        let kind = if option.is_image() { "image: " } else { "" };
        println!(" {mark}{letter}. {kind}{}", option.content());
    }
    if current.required_selections > 1 {
        println!("  (choose {})", current.required_selections);
    }
}

fn print_result(result: &QuizResult) {
    println!();
    println!(
        "Score: {:.2}%  ({}/{} correct, {} unanswered, {}s)",
        result.score,
        result.correct_count,
        result.total_questions,
        result.unanswered_count(),
        result.time_taken_secs
    );
    for (i, r) in result.question_results.iter().enumerate() {
        let mark = if r.is_correct { "ok " } else { "XX " };
        println!("{mark}{:>3}. {}", i + 1, r.question);
        if !r.is_correct {
            println!("       yours:   {}", r.submitted.join(", "));
            println!("       correct: {}", r.correct.join(", "));
        }
    }
}

fn print_outcome(outcome: &SubmitOutcome) {
    if outcome.expired {
        println!("Time is up. The exam was submitted automatically.");
    }
    print_result(&outcome.result);
    println!("Saved as attempt #{}.", outcome.attempt_id);
}

/// Drive `session` from stdin until it is submitted, expires, or the learner quits.
///
/// # Errors
///
/// Returns an error if stdin fails or a storage write fails.
pub async fn run_exam(
    svc: &ExamLoopService,
    mut session: ExamSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    println!("Exam token: {}", session.token());
    println!("Type `h` for help.");
    render(&session, &svc.tick(&session));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let tick = svc.tick(&session);
                if tick.expired {
                    let outcome = svc.submit(session).await?;
                    print_outcome(&outcome);
                    return Ok(());
                }
                if WARN_AT.contains(&tick.remaining_secs) {
                    println!("-- {} left --", tick.display);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    svc.persist(&session).await?;
                    println!("Input closed. Resume with token {}", session.token());
                    return Ok(());
                };
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                debug!(?command, "console command");

                match command {
                    Command::Next => {
                        session.next();
                    }
                    Command::Prev => {
                        session.prev();
                    }
                    Command::Jump(number) => {
                        if number > session.total_questions() {
                            println!("there are only {} questions", session.total_questions());
                            continue;
                        }
                        session.jump_to(number - 1);
                    }
                    Command::Answer(letters) => {
                        if let Err(err) = session.select_letters(&letters) {
                            println!("{err}");
                            continue;
                        }
                    }
                    Command::Clear => session.clear_current()?,
                    Command::Time => {
                        println!("{} left", svc.tick(&session).display);
                        continue;
                    }
                    Command::Show => {}
                    Command::Help => {
                        print_help();
                        continue;
                    }
                    Command::Submit => {
                        let outcome = svc.submit(session).await?;
                        print_outcome(&outcome);
                        return Ok(());
                    }
                    Command::Quit => {
                        svc.persist(&session).await?;
                        println!("Saved. Resume with token {}", session.token());
                        return Ok(());
                    }
                }

                svc.persist(&session).await?;
                render(&session, &svc.tick(&session));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation() {
        assert_eq!(parse_command("n"), Ok(Command::Next));
        assert_eq!(parse_command("  PREV "), Ok(Command::Prev));
        assert_eq!(parse_command("j 12"), Ok(Command::Jump(12)));
    }

    #[test]
    fn jump_needs_positive_number() {
        assert_eq!(parse_command("j"), Err(CommandError::MissingNumber));
        assert_eq!(
            parse_command("j 0"),
            Err(CommandError::InvalidNumber("0".into()))
        );
        assert_eq!(
            parse_command("j x"),
            Err(CommandError::InvalidNumber("x".into()))
        );
    }

    #[test]
    fn answer_letters_are_uppercased_and_split() {
        assert_eq!(
            parse_command("a b, d"),
            Ok(Command::Answer(vec!['B', 'D']))
        );
        assert_eq!(parse_command("a AC"), Ok(Command::Answer(vec!['A', 'C'])));
        assert_eq!(parse_command("a"), Err(CommandError::MissingLetters));
    }

    #[test]
    fn rejects_blank_and_unknown_input() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("dance"),
            Err(CommandError::Unknown("dance".into()))
        );
    }
}
