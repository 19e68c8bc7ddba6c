use super::*;
use crate::interpreter::Value;
use pretty_assertions::assert_eq;
use std::sync::{Mutex, MutexGuard, OnceLock};

// direct-mode runs switch the process-global working directory
fn cwd_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn direct_session() -> Session {
    Session::new(SessionConfig {
        mode: ExecutionMode::Direct,
        ..SessionConfig::default()
    })
}

fn dirs() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let base = tempfile::tempdir().unwrap();
    let solution = base.path().join("solution");
    let student = base.path().join("student");
    fs::create_dir_all(&student).unwrap();
    (base, solution, student)
}

#[test]
fn config_defaults_to_isolated_mode() {
    let config = SessionConfig::default();
    assert_eq!(config.mode, ExecutionMode::Isolated);
    assert_eq!(config.kill_timeout(), Duration::from_millis(2_000));
}

#[test]
fn config_loads_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("examiner.toml");
    fs::write(&path, "mode = \"direct\"\nkill_timeout_ms = 500\n").unwrap();
    let config = SessionConfig::load(&path).unwrap();
    assert_eq!(config.mode, ExecutionMode::Direct);
    assert_eq!(config.kill_timeout(), Duration::from_millis(500));
}

#[test]
fn run_exercise_produces_a_root_state() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();

    let outcome = session
        .run_exercise("a = 1\n", "b = a + 1\n", "b = a + 1\n", &solution_dir, &student_dir)
        .unwrap();

    let root = match outcome {
        ExerciseOutcome::Checked(root) => root,
        ExerciseOutcome::ParseFeedback(_) => panic!("expected a checked outcome"),
    };
    assert!(root.is_root());
    assert!(root.student_error.is_none());

    let student_host = root.student_host.as_ref().unwrap();
    assert!(tasks::is_defined(student_host, "b").unwrap());
    assert!(matches!(
        tasks::get_option(student_host, "b").unwrap(),
        Some(Value::Int(2))
    ));
}

#[test]
fn solution_directory_is_created_if_absent() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    assert!(!solution_dir.exists());
    session
        .run_exercise("", "a = 1\n", "a = 1\n", &solution_dir, &student_dir)
        .unwrap();
    assert!(solution_dir.exists());
}

#[test]
fn working_directory_is_restored_after_a_run() {
    let _cwd = cwd_lock();
    let before = std::env::current_dir().unwrap();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    session
        .run_exercise("", "a = 1\n", "a = 1 / 0\n", &solution_dir, &student_dir)
        .unwrap();
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[test]
fn student_failure_is_captured_as_data() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    let outcome = session
        .run_exercise("", "a = 1\n", "a = 1 / 0\n", &solution_dir, &student_dir)
        .unwrap();
    match outcome {
        ExerciseOutcome::Checked(root) => {
            assert!(root.student_error.as_ref().unwrap().contains("division by zero"));
        }
        ExerciseOutcome::ParseFeedback(_) => panic!("expected a checked outcome"),
    }
}

#[test]
fn solution_failure_is_an_instructor_error() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    match session.run_exercise("", "a = 1 / 0\n", "a = 1\n", &solution_dir, &student_dir) {
        Err(CheckError::Instructor(_)) => {}
        Err(other) => panic!("expected an instructor error, got {}", other),
        Ok(_) => panic!("expected an instructor error"),
    }
}

#[test]
fn student_parse_failure_is_graceful_feedback() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    let outcome = session
        .run_exercise("", "a = 1\n", "a = = 1\n", &solution_dir, &student_dir)
        .unwrap();
    match outcome {
        ExerciseOutcome::ParseFeedback(feedback) => {
            assert!(feedback.message.contains("syntax problem"));
        }
        ExerciseOutcome::Checked(_) => panic!("expected parse feedback"),
    }
}

#[test]
fn solution_parse_failure_is_an_instructor_error() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    match session.run_exercise("", "a = = 1\n", "a = 1\n", &solution_dir, &student_dir) {
        Err(CheckError::Instructor(_)) => {}
        Err(other) => panic!("expected an instructor error, got {}", other),
        Ok(_) => panic!("expected an instructor error"),
    }
}

#[test]
fn hosts_are_isolated_from_each_other() {
    let _cwd = cwd_lock();
    let session = direct_session();
    let (_base, solution_dir, student_dir) = dirs();
    let outcome = session
        .run_exercise("", "only_solution = 1\n", "only_student = 2\n", &solution_dir, &student_dir)
        .unwrap();
    let root = match outcome {
        ExerciseOutcome::Checked(root) => root,
        ExerciseOutcome::ParseFeedback(_) => panic!("expected a checked outcome"),
    };
    let student = root.student_host.as_ref().unwrap();
    let solution = root.solution_host.as_ref().unwrap();
    assert!(tasks::is_defined(student, "only_student").unwrap());
    assert!(!tasks::is_defined(student, "only_solution").unwrap());
    assert!(tasks::is_defined(solution, "only_solution").unwrap());
    assert!(!tasks::is_defined(solution, "only_student").unwrap());
    assert!(root.has_different_processes());
}

#[test]
fn kill_all_empties_the_registry() {
    let session = direct_session();
    let dir = tempfile::tempdir().unwrap();
    let a = session.spawn_host(dir.path()).unwrap();
    let b = session.spawn_host(dir.path()).unwrap();
    let c = session.spawn_host(dir.path()).unwrap();
    assert_eq!(session.live_hosts(), 3);

    session.kill_all();
    assert_eq!(session.live_hosts(), 0);
    assert!(!a.borrow().is_alive());
    assert!(!b.borrow().is_alive());
    assert!(!c.borrow().is_alive());
}

#[test]
fn kill_all_is_idempotent() {
    let session = direct_session();
    let dir = tempfile::tempdir().unwrap();
    session.spawn_host(dir.path()).unwrap();
    session.kill_all();
    session.kill_all();
    assert_eq!(session.live_hosts(), 0);
}
