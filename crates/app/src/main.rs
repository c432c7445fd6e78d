use std::fmt;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use exam_core::model::{QuizToken, Subject};
use services::{AppServices, Clock, ExamConfig, QuestionBank};
use tracing::info;

mod console;

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
    InvalidToken { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidToken { raw } => write!(f, "invalid exam token: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Parser)]
#[command(name = "exam", version, about = "Timed multiple-choice exam practice")]
struct Cli {
    /// SQLite database URL or path
    #[arg(long, global = true, env = "EXAM_DB_URL", default_value = "sqlite://exam.sqlite3")]
    db: String,

    /// Learner the exams and progress belong to
    #[arg(long, global = true, env = "EXAM_LEARNER", default_value = "anonymous")]
    learner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge scraped question files into a question bank
    Import {
        /// Question bank file to create or extend
        #[arg(long)]
        bank: PathBuf,

        /// Scraped JSON files to merge
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Start a new timed exam
    Start {
        /// Question bank file
        #[arg(long)]
        bank: PathBuf,

        /// Subject code, e.g. AIL303m
        #[arg(long)]
        subject: String,

        /// Subject display name
        #[arg(long)]
        subject_name: Option<String>,

        /// Number of questions
        #[arg(long, default_value_t = services::exam::DEFAULT_QUESTION_COUNT)]
        count: usize,

        /// Time limit in minutes
        #[arg(long, default_value_t = services::exam::DEFAULT_TIME_LIMIT_MINUTES)]
        minutes: u32,

        /// Shuffle the option order of every question
        #[arg(long)]
        shuffle: bool,
    },

    /// Resume an unfinished exam
    Resume {
        /// Token printed when the exam was started
        #[arg(long)]
        token: String,
    },

    /// List submitted exams
    History {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn open_services(db: &str) -> Result<AppServices, Box<dyn std::error::Error>> {
    let db_url = normalize_sqlite_url(db.to_owned());
    // Open + migrate SQLite here so core/services stay free of filesystem setup.
    prepare_sqlite_file(&db_url)?;
    Ok(AppServices::new_sqlite(&db_url, Clock::system()).await?)
}

fn import(bank_path: &Path, files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let mut bank = if bank_path.exists() {
        QuestionBank::load(bank_path)?
    } else {
        QuestionBank::new()
    };

    for file in files {
        let incoming = QuestionBank::load(file)?;
        let added = bank.merge(incoming.into_questions());
        println!("{}: {added} new question(s)", file.display());
    }

    bank.save(bank_path)?;
    info!(bank = %bank_path.display(), total = bank.len(), "question bank saved");
    println!("{} now holds {} question(s).", bank_path.display(), bank.len());
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { bank, files } => import(&bank, &files),
        Commands::Start {
            bank,
            subject,
            subject_name,
            count,
            minutes,
            shuffle,
        } => {
            let bank = QuestionBank::load(&bank)?;
            let subject = match subject_name {
                Some(name) => Subject::new(subject, name),
                None => Subject::from_code(subject),
            };
            let config = ExamConfig::new(cli.learner, subject)
                .with_question_count(count)
                .with_time_limit_minutes(minutes)
                .with_shuffle_options(shuffle);

            let services = open_services(&cli.db).await?;
            let exam_loop = services.exam_loop();
            let session = exam_loop.start_exam(&bank, &config).await?;
            console::run_exam(&exam_loop, session).await
        }
        Commands::Resume { token } => {
            let token: QuizToken = token
                .parse()
                .map_err(|_| ArgsError::InvalidToken { raw: token.clone() })?;
            let services = open_services(&cli.db).await?;
            let exam_loop = services.exam_loop();
            let session = exam_loop.resume_exam(&cli.learner, token).await?;
            console::run_exam(&exam_loop, session).await
        }
        Commands::History { limit } => {
            let services = open_services(&cli.db).await?;
            let items = services.exam_loop().history(&cli.learner, limit).await?;
            if items.is_empty() {
                println!("No submitted exams for {}.", cli.learner);
            }
            for item in items {
                println!(
                    "#{:<4} {}  {:<10} {:>6.2}%  {}/{}  {}s",
                    item.id.unwrap_or_default(),
                    item.completed_at.format("%Y-%m-%d %H:%M"),
                    item.subject_code,
                    item.score,
                    item.correct_count,
                    item.total_questions,
                    item.time_taken_secs
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/exam.db".into()),
            "sqlite:///tmp/exam.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/exam.db".into()),
            "sqlite:///tmp/exam.db"
        );
        assert!(normalize_sqlite_url("exam.db".into()).ends_with("/exam.db"));
    }

    #[test]
    fn cli_reads_start_options() {
        let cli = Cli::try_parse_from([
            "exam", "--learner", "ana", "start", "--bank", "bank.json", "--subject", "AIL303m",
            "--count", "20", "--shuffle",
        ])
        .unwrap();
        assert_eq!(cli.learner, "ana");
        match cli.command {
            Commands::Start {
                subject,
                count,
                minutes,
                shuffle,
                ..
            } => {
                assert_eq!(subject, "AIL303m");
                assert_eq!(count, 20);
                assert_eq!(minutes, 30);
                assert!(shuffle);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn import_requires_files() {
        assert!(Cli::try_parse_from(["exam", "import", "--bank", "bank.json"]).is_err());
    }

    #[test]
    fn import_merges_scraped_files_into_the_bank() {
        let dir = tempfile::tempdir().unwrap();
        let scraped = dir.path().join("scraped.json");
        std::fs::write(
            &scraped,
            r#"[{"question":"2+2?","options":["3","4"],"correct_answer":["4"]}]"#,
        )
        .unwrap();
        let bank_path = dir.path().join("bank.json");

        import(&bank_path, &[scraped.clone()]).unwrap();
        import(&bank_path, &[scraped]).unwrap();

        let bank = QuestionBank::load(&bank_path).unwrap();
        assert_eq!(bank.len(), 1);
    }
}
