use chrono::Duration;
use exam_core::model::{AnswerOption, AnswerSheet, LearnerProgress, Question, QuizToken, Subject};
use exam_core::time::fixed_now;
use storage::repository::{
    ActiveQuizRecord, ActiveQuizRepository, AttemptRecord, AttemptRepository, ProgressRepository,
    SnapshotRepository, StorageError, SubmissionCommit,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn questions() -> Vec<Question> {
    vec![
        Question::new(
            "Which is a prime?",
            None,
            vec![AnswerOption::text("4"), AnswerOption::text("7")],
            vec!["7".into()],
        )
        .unwrap(),
        Question::new(
            "Pick the chart",
            Some("/static/img/q.png".into()),
            vec![
                AnswerOption::image("/static/img/a.png"),
                AnswerOption::image("/static/img/b.png"),
            ],
            vec!["static/img/b.png".into()],
        )
        .unwrap(),
    ]
}

#[tokio::test]
async fn active_quiz_roundtrip_keeps_question_order() {
    let repo = connect("memdb_active").await;
    let token = QuizToken::generate();
    let record = ActiveQuizRecord {
        learner: "ana".into(),
        token,
        subject: Subject::new("AIL303m", "Artificial Intelligence"),
        questions: questions(),
        time_limit_secs: 1800,
        started_at: fixed_now(),
    };
    assert_eq!(repo.save_active(&record).await.unwrap(), None);

    let fetched = repo.get_active("ana", token).await.unwrap().expect("active");
    assert_eq!(fetched, record);

    let replacement = ActiveQuizRecord {
        token: QuizToken::generate(),
        ..record.clone()
    };
    assert_eq!(repo.save_active(&replacement).await.unwrap(), Some(token));
    assert!(repo.get_active("ana", token).await.unwrap().is_none());

    assert_eq!(
        repo.get_active("ana", replacement.token).await.unwrap(),
        Some(replacement)
    );
}

#[tokio::test]
async fn snapshot_upsert_and_clear() {
    let repo = connect("memdb_snapshot").await;
    let token = QuizToken::generate();
    assert!(repo.load_snapshot(token).await.unwrap().is_none());

    repo.save_snapshot(token, r#"{"a":1}"#).await.unwrap();
    repo.save_snapshot(token, r#"{"a":2}"#).await.unwrap();
    assert_eq!(
        repo.load_snapshot(token).await.unwrap().as_deref(),
        Some(r#"{"a":2}"#)
    );

    repo.clear_snapshot(token).await.unwrap();
    assert!(repo.load_snapshot(token).await.unwrap().is_none());
}

#[tokio::test]
async fn progress_is_scoped_by_subject() {
    let repo = connect("memdb_progress").await;
    let mut progress = LearnerProgress::new();
    progress.penalties.insert("Which is a prime?".into(), 2);
    progress.question_bag = vec!["Pick the chart".into()];

    repo.save_progress("ana", "AIL303m", &progress).await.unwrap();

    assert_eq!(
        repo.get_progress("ana", "AIL303m").await.unwrap(),
        Some(progress)
    );
    assert!(repo.get_progress("ana", "SWE201c").await.unwrap().is_none());
}

#[tokio::test]
async fn attempts_are_listed_newest_first() {
    let repo = connect("memdb_attempts").await;
    let subject = Subject::from_code("AIL303m");
    let qs = questions();

    let mut sheet = AnswerSheet::new(2);
    sheet.set(0, vec![AnswerOption::text("7")]).unwrap();
    let first = exam_core::grade(&qs, &sheet, &subject, 120);
    let second = exam_core::grade(&qs, &AnswerSheet::new(2), &subject, 30);

    let first_id = repo
        .append_attempt(&AttemptRecord::new(
            "ana",
            QuizToken::generate(),
            fixed_now(),
            first.clone(),
        ))
        .await
        .unwrap();
    let second_id = repo
        .append_attempt(&AttemptRecord::new(
            "ana",
            QuizToken::generate(),
            fixed_now() + Duration::minutes(5),
            second,
        ))
        .await
        .unwrap();

    let listed = repo.list_attempts("ana", 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, Some(second_id));
    assert_eq!(listed[1].id, Some(first_id));
    assert_eq!(listed[1].result, first);
    assert!((listed[1].result.score - 50.0).abs() < f64::EPSILON);

    assert!(repo.list_attempts("bo", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn submission_commit_is_all_or_nothing() {
    let repo = connect("memdb_commit").await;
    let token = QuizToken::generate();
    let subject = Subject::from_code("AIL303m");
    let record = ActiveQuizRecord {
        learner: "ana".into(),
        token,
        subject: subject.clone(),
        questions: questions(),
        time_limit_secs: 600,
        started_at: fixed_now(),
    };
    repo.save_active(&record).await.unwrap();
    repo.save_snapshot(token, "{}").await.unwrap();

    let result = exam_core::grade(&record.questions, &AnswerSheet::new(2), &subject, 60);
    let mut progress = LearnerProgress::new();
    progress.apply_result(&result);
    let commit = SubmissionCommit {
        attempt: AttemptRecord::new("ana", token, fixed_now(), result),
        subject_code: "AIL303m".into(),
        progress: progress.clone(),
    };

    let id = repo.commit_submission(&commit).await.unwrap();
    assert!(repo.get_active("ana", token).await.unwrap().is_none());
    assert!(repo.load_snapshot(token).await.unwrap().is_none());
    assert_eq!(
        repo.get_progress("ana", "AIL303m").await.unwrap(),
        Some(progress)
    );
    assert_eq!(repo.list_attempts("ana", 10).await.unwrap()[0].id, Some(id));

    let mut doubled = commit.clone();
    doubled.progress.penalties.insert("Which is a prime?".into(), 9);
    let err = repo.commit_submission(&doubled).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert_eq!(repo.list_attempts("ana", 10).await.unwrap().len(), 1);
    assert_eq!(
        repo.get_progress("ana", "AIL303m")
            .await
            .unwrap()
            .and_then(|p| p.penalties.get("Which is a prime?").copied()),
        Some(1)
    );
}
