#[cfg(test)]
use vannolib::{
    annotations::{self, annotation_path},
    control::{AbortReason, Control, DocState, Nav},
    defer_folder_removal,
    domain::{PtF, Shape},
    result::ErrorKind,
    test_helpers::{make_test_dataset, ScriptedPrompt},
    tracing_setup::init_tracing_for_tests,
};

#[cfg(test)]
const JOBS: &str = r#"{"anna": [["10", "2"]]}"#;

#[test]
fn test_review_folder() {
    init_tracing_for_tests();
    let ds = make_test_dataset("nav", JOBS, &["10", "2", "99"], 2).unwrap();
    defer_folder_removal!(&ds.folder);
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::discarding(&[false]);

    ctrl.open_session("anna", 1, &mut prompt).unwrap();
    let e = ctrl.open_folder("10", &mut prompt).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);

    let nav = ctrl.open_dir(&ds.image_root, &mut prompt).unwrap();
    assert!(matches!(nav, Nav::Opened(_)));
    assert_eq!(ctrl.navigator().len(), 6);
    let e = ctrl.open_folder("99", &mut prompt).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::OutOfRange);

    let first = ds.image_root.join("10").join("img_0.png");
    let nav = ctrl.open_folder("10", &mut prompt).unwrap();
    assert_eq!(nav, Nav::Opened(first.to_str().unwrap().to_string()));
    assert_eq!(ctrl.navigator().len(), 2);
    assert_eq!(ctrl.active_folder(), Some("10"));

    ctrl.add_shape(Shape::new_box("cat", PtF::new(0.0, 0.0), PtF::new(3.0, 3.0)))
        .unwrap();
    let nav = ctrl.open_folder("2", &mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::DiscardDeclined));
    assert_eq!(ctrl.doc().state(), DocState::Dirty);

    let saved = ctrl.save(&mut prompt).unwrap().unwrap();
    let save_dir = ds.cfg.save_dir().join("10");
    assert_eq!(
        saved,
        annotation_path(&first, Some(save_dir.as_path()), ds.cfg.anno_format).unwrap()
    );
    let record = annotations::load(&saved, ds.cfg.anno_format).unwrap();
    assert_eq!(record.shapes[0].label, "cat");
    assert!(!record.verified);

    assert!(matches!(
        ctrl.open_folder("2", &mut prompt).unwrap(),
        Nav::Opened(_)
    ));
    assert_eq!(ctrl.active_folder(), Some("2"));
    assert!(ctrl.doc().table().is_empty());
}

#[test]
fn test_open_session_resets_cursor() {
    init_tracing_for_tests();
    let ds = make_test_dataset("nav", JOBS, &["10", "2"], 1).unwrap();
    defer_folder_removal!(&ds.folder);
    let mut ctrl = Control::new(ds.cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::discarding(&[false, true]);
    ctrl.open_dir(&ds.image_root, &mut prompt).unwrap();
    ctrl.open_session("anna", 1, &mut prompt).unwrap();
    ctrl.open_folder("2", &mut prompt).unwrap();
    ctrl.add_shape(Shape::new("dog", vec![PtF::new(1.0, 1.0)]))
        .unwrap();

    let nav = ctrl.open_session("anna", 1, &mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::DiscardDeclined));
    assert_eq!(ctrl.active_folder(), Some("2"));

    ctrl.open_session("anna", 1, &mut prompt).unwrap();
    assert_eq!(ctrl.doc().state(), DocState::NoImageOpen);
    assert!(ctrl.navigator().is_empty());
    assert_eq!(ctrl.active_folder(), None);
    assert_eq!(ctrl.open_next(&mut prompt).unwrap(), Nav::NoOp);
}
