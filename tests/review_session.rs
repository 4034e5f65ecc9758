#[cfg(test)]
use vannolib::{
    control::{AbortReason, Control, Nav},
    defer_folder_removal,
    file_util,
    result::ErrorKind,
    session::{stats_log, Checklist, JobAssignment, KvStore},
    test_helpers::{make_test_dataset, ScriptedPrompt},
    tracing_setup::init_tracing_for_tests,
};

#[cfg(test)]
const JOBS: &str = r#"{
    "anna": [["1", "2", "3", "4", "5"], ["6", "7"], ["8"]],
    "ben": [["3"]]
}"#;

#[test]
fn test_session_bounds() {
    init_tracing_for_tests();
    let ds = make_test_dataset("review", JOBS, &[], 0).unwrap();
    defer_folder_removal!(&ds.folder);
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::new();
    for session in [0, 4] {
        let e = ctrl.open_session("anna", session, &mut prompt).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::OutOfRange);
    }
    assert!(ctrl.checklist().is_none());
    assert_eq!(
        ctrl.open_session("anna", 1, &mut prompt).unwrap(),
        Nav::Opened("anna_01".to_string())
    );
    let e = ctrl.open_session("carl", 1, &mut prompt).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
    let e = ctrl.open_session("../x", 1, &mut prompt).unwrap_err();
    assert_ne!(e.kind(), ErrorKind::OutOfRange);
}

#[test]
fn test_checklist_persistence() {
    init_tracing_for_tests();
    let ds = make_test_dataset("review", JOBS, &[], 0).unwrap();
    defer_folder_removal!(&ds.folder);
    let env = ds.cfg.env_paths();
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_session("anna", 1, &mut prompt).unwrap();
    for folder in ["5", "1", "3"] {
        assert!(ctrl.toggle_folder(1, folder).unwrap());
    }
    // toggling twice leaves the set as it was
    ctrl.toggle_folder(1, "2").unwrap();
    ctrl.toggle_folder(1, "2").unwrap();
    assert_eq!(
        ctrl.toggle_folder(2, "6").unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    assert_eq!(
        ctrl.toggle_folder(1, "6").unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    assert_eq!(ctrl.checklist().unwrap().done(), [1, 3, 5]);

    let line = ctrl.persist_checklist().unwrap();
    assert_eq!(
        file_util::read_to_string(env.checklist("anna", 1)).unwrap(),
        "1\n3\n5\n"
    );
    let stats = file_util::read_to_string(env.statistics()).unwrap();
    assert_eq!(stats.lines().count(), 1);
    let stat = stats.lines().next().unwrap();
    assert!(stat.starts_with("anna_01, "));
    assert!(stat.ends_with(" - 3/5"));
    assert_eq!(stat, line.to_string());
    assert_eq!(stats_log::read_all(env.statistics()).unwrap(), vec![line]);

    let jobs = JobAssignment::load(env.job_assign()).unwrap();
    let reloaded = Checklist::open(&env, &jobs, "anna", 1).unwrap();
    assert_eq!(reloaded.done(), [1, 3, 5]);
    assert_eq!(
        ctrl.kv().unwrap().get::<Vec<u64>>("checklist/01").unwrap(),
        Some(vec![1, 3, 5])
    );
    drop(ctrl);
    let kv = KvStore::open(&env, "anna").unwrap();
    assert_eq!(kv.keys().collect::<Vec<_>>(), vec!["checklist/01"]);
}

#[test]
fn test_unsaved_checklist_blocks() {
    init_tracing_for_tests();
    let ds = make_test_dataset("review", JOBS, &[], 0).unwrap();
    defer_folder_removal!(&ds.folder);
    let env = ds.cfg.env_paths();
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_session("anna", 1, &mut prompt).unwrap();
    ctrl.toggle_folder(1, "4").unwrap();

    let nav = ctrl.next_session(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::ChecklistUnsaved));
    let nav = ctrl.open_session("anna", 2, &mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::ChecklistUnsaved));
    let nav = ctrl.close_file(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::ChecklistUnsaved));
    assert_eq!(prompt.warnings.len(), 3);
    assert_eq!(ctrl.checklist().unwrap().session(), 1);
    assert!(!env.statistics().exists());

    // quitting only warns
    assert_eq!(ctrl.request_quit(&mut prompt).unwrap(), Nav::Closed);
    assert_eq!(prompt.warnings.len(), 4);

    ctrl.persist_checklist().unwrap();
    assert_eq!(
        ctrl.next_session(&mut prompt).unwrap(),
        Nav::Opened("anna_02".to_string())
    );
    assert_eq!(
        ctrl.next_session(&mut prompt).unwrap(),
        Nav::Opened("anna_03".to_string())
    );
    assert_eq!(ctrl.next_session(&mut prompt).unwrap(), Nav::NoOp);
    assert_eq!(ctrl.checklist().unwrap().session(), 3);
    assert_eq!(
        ctrl.prev_session(&mut prompt).unwrap(),
        Nav::Opened("anna_02".to_string())
    );
    ctrl.prev_session(&mut prompt).unwrap();
    assert_eq!(ctrl.prev_session(&mut prompt).unwrap(), Nav::NoOp);
    assert_eq!(ctrl.checklist().unwrap().done(), [4]);
}

#[test]
fn test_missing_checklist_is_empty() {
    init_tracing_for_tests();
    let ds = make_test_dataset("review", JOBS, &[], 0).unwrap();
    defer_folder_removal!(&ds.folder);
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_session("ben", 1, &mut prompt).unwrap();
    let checklist = ctrl.checklist().unwrap();
    assert_eq!(checklist.n_done(), 0);
    assert_eq!(checklist.n_total(), 1);
    assert!(!checklist.is_dirty());
    assert_eq!(ctrl.identity(), Some("ben"));
}

#[test]
fn test_path_like_identity_is_rejected_first() {
    init_tracing_for_tests();
    let jobs = r#"{"../anna": [["1", "2"]], "anna": [["1"]]}"#;
    let ds = make_test_dataset("review", jobs, &[], 0).unwrap();
    defer_folder_removal!(&ds.folder);
    let env = ds.cfg.env_paths();
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::new();
    let e = ctrl.open_session("../anna", 1, &mut prompt).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
    assert!(ctrl.checklist().is_none());
    assert!(ctrl.identity().is_none());
    assert!(!env.kv_namespace("../anna").exists());
    // out of range sessions of such an identity are not looked up either
    let e = ctrl.open_session("../anna", 7, &mut prompt).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
}
