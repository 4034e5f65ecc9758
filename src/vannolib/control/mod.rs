mod document;
mod paths_navigator;

pub use document::{AnnoEntry, AnnotationTable, DocState, Document};
pub use paths_navigator::PathsNavigator;

use image::GenericImageView;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    annotations::{self, AnnoLookup, LookupOutcome},
    cfg::Cfg,
    domain::{ImageShape, PtF, Shape},
    file_util,
    label_hist::LabelHist,
    result::{io_to_vn, ErrorKind, VnResult},
    session::{
        is_valid_identity, load_identities, session_label, Checklist, EnvPaths, FolderMarkers,
        JobAssignment, KvStore, StatLine,
    },
    vnerr,
};

/// Blocking questions and messages to the operator. A GUI shows dialogs, the command line
/// answers from its arguments, tests answer from a script.
pub trait Prompt {
    /// Asked before unsaved edits of the open image are dropped. `true` discards them.
    fn discard_changes(&mut self, image_path: &str) -> bool;
    fn warn(&mut self, title: &str, msg: &str);
    fn error(&mut self, title: &str, msg: &str);
    fn pick_save_dir(&mut self) -> Option<PathBuf>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// The open image has unsaved edits and the operator kept them.
    DiscardDeclined,
    /// The checklist of the open session has not been persisted.
    ChecklistUnsaved,
    /// Auto-save is on but there is no save folder.
    SaveDirMissing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Nav {
    /// Path of the opened image or label of the opened session.
    Opened(String),
    Closed,
    /// Nothing to move to, e.g., at the last image.
    NoOp,
    Aborted(AbortReason),
}

fn read_image_shape(path: &str) -> VnResult<ImageShape> {
    let im = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(e) => io_to_vn(path, e),
        e => vnerr!(ErrorKind::InvalidFormat; "could not decode {} due to {:?}", path, e),
    })?;
    let (w, h) = im.dimensions();
    Ok(ImageShape::new(w, h, im.color().channel_count()))
}

/// Owns the open image, the image list, and the review session of the logged in annotator.
pub struct Control {
    pub cfg: Cfg,
    env: EnvPaths,
    jobs: Option<JobAssignment>,
    identity: Option<String>,
    kv: Option<KvStore>,
    checklist: Option<Checklist>,
    image_root: Option<PathBuf>,
    active_folder: Option<String>,
    navigator: PathsNavigator,
    doc: Document,
    label_hist: LabelHist,
}

impl Control {
    pub fn new(cfg: Cfg) -> VnResult<Self> {
        let label_hist = match &cfg.predefined_classes_file {
            Some(p) => LabelHist::from_predefined_classes(p, cfg.single_class)?,
            None => LabelHist::new(cfg.single_class),
        };
        Ok(Control {
            env: cfg.env_paths(),
            cfg,
            jobs: None,
            identity: None,
            kv: None,
            checklist: None,
            image_root: None,
            active_folder: None,
            navigator: PathsNavigator::default(),
            doc: Document::default(),
            label_hist,
        })
    }

    pub fn env(&self) -> &EnvPaths {
        &self.env
    }
    pub fn doc(&self) -> &Document {
        &self.doc
    }
    /// Edits made through the document are tracked by its state.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
    pub fn navigator(&self) -> &PathsNavigator {
        &self.navigator
    }
    pub fn checklist(&self) -> Option<&Checklist> {
        self.checklist.as_ref()
    }
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
    pub fn kv(&self) -> Option<&KvStore> {
        self.kv.as_ref()
    }
    pub fn active_folder(&self) -> Option<&str> {
        self.active_folder.as_deref()
    }
    pub fn label_hist(&self) -> &LabelHist {
        &self.label_hist
    }

    /// Loaded on first use and kept for the lifetime of the control.
    pub fn jobs(&mut self) -> VnResult<&JobAssignment> {
        if self.jobs.is_none() {
            self.jobs = Some(JobAssignment::load(self.env.job_assign())?);
        }
        self.jobs
            .as_ref()
            .ok_or_else(|| vnerr!("job assignment not loaded"))
    }

    /// Where annotations of the open image go. Inside a session folder this is the folder's
    /// sub directory of the save dir.
    pub fn active_save_dir(&self) -> Option<PathBuf> {
        let save_dir = self.cfg.save_dir.as_ref().map(PathBuf::from);
        match &self.active_folder {
            Some(folder) => Some(save_dir.unwrap_or_else(|| self.cfg.save_dir()).join(folder)),
            None => save_dir,
        }
    }

    pub fn set_save_dir(&mut self, save_dir: &Path) -> VnResult<()> {
        self.cfg.save_dir = Some(file_util::path_to_str(save_dir)?.to_string());
        info!("save dir set to {save_dir:?}");
        Ok(())
    }

    fn may_continue(&mut self, prompt: &mut dyn Prompt) -> Option<AbortReason> {
        if !self.doc.is_dirty() {
            return None;
        }
        let image_path = self.doc.image_path().unwrap_or_default().to_string();
        if prompt.discard_changes(&image_path) {
            info!("discarding changes of {image_path}");
            None
        } else {
            info!("keeping changes of {image_path}");
            Some(AbortReason::DiscardDeclined)
        }
    }

    fn checklist_gate(&self, prompt: &mut dyn Prompt) -> Option<AbortReason> {
        match &self.checklist {
            Some(cl) if cl.is_dirty() => {
                let label = session_label(cl.identity(), cl.session());
                warn!("checklist {label} has not been persisted");
                prompt.warn(
                    "Unsaved checklist",
                    &format!("Persist the checklist of {label} first."),
                );
                Some(AbortReason::ChecklistUnsaved)
            }
            _ => None,
        }
    }

    fn lookup_strategies(&self, prev_image: Option<&str>) -> Vec<AnnoLookup> {
        let save_dir = self.active_save_dir();
        let mut strategies = vec![];
        if let Some(sd) = &save_dir {
            strategies.push(AnnoLookup::SaveDir(sd.clone()));
        }
        strategies.push(AnnoLookup::BesideImage);
        if self.cfg.fallback_to_previous_annotation {
            if let Some(prev) = prev_image {
                strategies.push(AnnoLookup::PreviousImage {
                    image_path: prev.to_string(),
                    save_dir,
                });
            }
        }
        strategies
    }

    /// Opens without asking. On failure no image is open afterwards.
    fn load_file(&mut self, path: &str, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        let prev_image = self
            .doc
            .image_path()
            .filter(|p| *p != path)
            .map(|p| p.to_string());
        self.doc.close();
        if annotations::is_label_file(path) {
            let label_file = annotations::load_label_file(path)?;
            if let Some(colors) = label_file.colors {
                self.cfg.set_doc_colors(colors);
            }
            let record = label_file.record;
            let image_path = record.image_path.clone();
            self.doc = Document::open(&image_path, record.image_shape, Some(record));
            self.cfg.add_recent_file(path);
            info!("opened label file {path}");
            return Ok(Nav::Opened(image_path));
        }
        let image_shape = read_image_shape(path)?;
        let strategies = self.lookup_strategies(prev_image.as_deref());
        let record = match annotations::lookup(path, &strategies, self.cfg.anno_format) {
            LookupOutcome::Found { record, source, .. } => {
                info!("annotation of {path} read from {source:?}");
                Some(record)
            }
            LookupOutcome::Absent => None,
            LookupOutcome::Invalid { error, source } => {
                warn!("ignoring invalid annotation {source:?}");
                prompt.error(
                    "Invalid annotation",
                    &format!("Could not read {source:?}. {}", error.msg()),
                );
                None
            }
        };
        self.doc = Document::open(path, image_shape, record);
        self.cfg.add_recent_file(path);
        info!("opened {path}");
        Ok(Nav::Opened(path.to_string()))
    }

    fn open_first(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        match self.navigator.file_path(0).map(|p| p.to_string()) {
            Some(path) => self.load_file(&path, prompt),
            None => Ok(Nav::NoOp),
        }
    }

    /// Scans the folder recursively and opens its first image.
    pub fn open_dir<P: AsRef<Path>>(&mut self, dir: P, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        let dir = file_util::absolute(dir)?;
        self.navigator = PathsNavigator::from_dir(&dir)?;
        self.doc.close();
        self.active_folder = None;
        self.cfg.last_open_dir = Some(file_util::path_to_str(&dir)?.to_string());
        self.image_root = Some(dir);
        info!("opened dir with {} images", self.navigator.len());
        self.open_first(prompt)
    }

    pub fn open_file(&mut self, path: &str, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        self.load_file(path, prompt)
    }

    fn open_adjacent(&mut self, forward: bool, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        let current = self.doc.image_path();
        let idx = if forward {
            self.navigator.next_idx(current)
        } else {
            self.navigator.prev_idx(current)
        };
        let Some(target) = idx.and_then(|idx| self.navigator.file_path(idx)) else {
            return Ok(Nav::NoOp);
        };
        let target = target.to_string();
        if self.cfg.auto_save {
            match self.active_save_dir() {
                Some(save_dir) => {
                    if self.doc.is_dirty() {
                        self.save_to(Some(save_dir.as_path()))?;
                    }
                }
                None => {
                    warn!("auto-save needs a save dir");
                    if let Some(save_dir) = prompt.pick_save_dir() {
                        self.set_save_dir(&save_dir)?;
                    }
                    return Ok(Nav::Aborted(AbortReason::SaveDirMissing));
                }
            }
        }
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        self.load_file(&target, prompt)
    }

    pub fn open_next(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        self.open_adjacent(true, prompt)
    }

    pub fn open_prev(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        self.open_adjacent(false, prompt)
    }

    fn save_to(&mut self, save_dir: Option<&Path>) -> VnResult<PathBuf> {
        let record = self.doc.to_record()?;
        let path = annotations::annotation_path(&record.image_path, save_dir, self.cfg.anno_format)?;
        let colors = self.cfg.doc_colors();
        annotations::save_with_colors(&path, &record, self.cfg.anno_format, colors)?;
        self.doc.mark_saved();
        Ok(path)
    }

    /// Saves into the active save dir. Without one, the operator is asked for a folder. Returns
    /// `None` if the operator did not pick any.
    pub fn save(&mut self, prompt: &mut dyn Prompt) -> VnResult<Option<PathBuf>> {
        if self.doc.state() == DocState::NoImageOpen {
            return Err(vnerr!("no image open"));
        }
        let save_dir = match self.active_save_dir() {
            Some(sd) => sd,
            None => match prompt.pick_save_dir() {
                Some(sd) => {
                    self.set_save_dir(&sd)?;
                    sd
                }
                None => return Ok(None),
            },
        };
        self.save_to(Some(save_dir.as_path())).map(Some)
    }

    /// Adds a shape to the open image and remembers its label.
    pub fn add_shape(&mut self, shape: Shape) -> VnResult<Uuid> {
        let label = shape.label.clone();
        let id = self.doc.add_shape(shape)?;
        self.label_hist.record(&label);
        Ok(id)
    }

    /// Adds a freshly drawn shape in the document colors.
    pub fn draw_shape(&mut self, label: &str, points: Vec<PtF>) -> VnResult<Uuid> {
        let colors = self.cfg.doc_colors();
        let shape = Shape {
            line_color: colors.line_color,
            fill_color: colors.fill_color,
            ..Shape::new(label, points)
        };
        self.add_shape(shape)
    }

    /// In single class mode the shape gets the last used label. Otherwise, or if no label has
    /// been used yet, nothing is added and `None` is returned, i.e., the operator needs to be asked
    /// for a label.
    pub fn draw_shape_with_default_label(&mut self, points: Vec<PtF>) -> VnResult<Option<Uuid>> {
        let label = self.label_hist.label_for_new_shape().map(|l| l.to_string());
        match label {
            Some(label) => self.draw_shape(&label, points).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_single_class(&mut self, single_class: bool) {
        self.cfg.single_class = single_class;
        self.label_hist.set_single_class(single_class);
    }

    pub fn close_file(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        if let Some(reason) = self.checklist_gate(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        self.doc.close();
        Ok(Nav::Closed)
    }

    /// An unpersisted checklist only produces a warning here, unsaved edits still need the
    /// operator's consent.
    pub fn request_quit(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        if self.checklist_gate(prompt).is_some() {
            warn!("quitting with unpersisted checklist");
        }
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        self.doc.close();
        info!("quit");
        Ok(Nav::Closed)
    }

    fn login(&mut self, identity: &str) -> VnResult<()> {
        if self.identity.as_deref() == Some(identity) {
            return Ok(());
        }
        let known = load_identities(self.env.identities_file())?;
        if !known.is_empty() && !known.iter().any(|id| id == identity) {
            return Err(vnerr!(ErrorKind::NotFound; "unknown identity '{}'", identity));
        }
        self.kv = Some(KvStore::open(&self.env, identity)?);
        self.identity = Some(identity.to_string());
        info!("logged in as {identity}");
        Ok(())
    }

    /// Loads the checklist of the session. The image list is reset.
    pub fn open_session(
        &mut self,
        identity: &str,
        session: usize,
        prompt: &mut dyn Prompt,
    ) -> VnResult<Nav> {
        if let Some(reason) = self.checklist_gate(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        // identities become file names
        if !is_valid_identity(identity) {
            return Err(vnerr!(ErrorKind::InvalidFormat; "invalid identity '{}'", identity));
        }
        self.jobs()?;
        let checklist = match &self.jobs {
            Some(jobs) => Checklist::open(&self.env, jobs, identity, session)?,
            None => return Err(vnerr!("job assignment not loaded")),
        };
        self.login(identity)?;
        self.checklist = Some(checklist);
        self.active_folder = None;
        self.navigator = PathsNavigator::default();
        self.doc.close();
        let label = session_label(identity, session);
        info!("opened session {label}");
        Ok(Nav::Opened(label))
    }

    fn open_adjacent_session(&mut self, forward: bool, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        let (identity, session) = match &self.checklist {
            Some(cl) => (cl.identity().to_string(), cl.session()),
            None => return Ok(Nav::NoOp),
        };
        let n_sessions = self.jobs()?.session_count(&identity)?;
        let target = if forward {
            (session < n_sessions).then_some(session + 1)
        } else {
            (session > 1).then_some(session - 1)
        };
        match target {
            Some(target) => self.open_session(&identity, target, prompt),
            None => {
                let msg = if forward {
                    "This is the last session."
                } else {
                    "This is the first session."
                };
                prompt.warn("No more sessions", msg);
                Ok(Nav::NoOp)
            }
        }
    }

    pub fn next_session(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        self.open_adjacent_session(true, prompt)
    }

    pub fn prev_session(&mut self, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        self.open_adjacent_session(false, prompt)
    }

    /// Opens the images of a folder of the open session below the opened dir.
    pub fn open_folder(&mut self, folder_name: &str, prompt: &mut dyn Prompt) -> VnResult<Nav> {
        let checklist = self
            .checklist
            .as_ref()
            .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no session open"))?;
        if !checklist.folders().iter().any(|f| f == folder_name) {
            return Err(vnerr!(
                ErrorKind::OutOfRange;
                "folder {} is not part of session {}",
                folder_name,
                session_label(checklist.identity(), checklist.session())
            ));
        }
        let folder = self
            .image_root
            .as_ref()
            .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no image dir opened"))?
            .join(folder_name);
        if let Some(reason) = self.may_continue(prompt) {
            return Ok(Nav::Aborted(reason));
        }
        self.navigator = PathsNavigator::from_dir(&folder)?;
        self.doc.close();
        self.active_folder = Some(folder_name.to_string());
        info!("opened folder {folder_name} with {} images", self.navigator.len());
        self.open_first(prompt)
    }

    /// Flips the done state of a folder of the open session.
    pub fn toggle_folder(&mut self, session: usize, folder_name: &str) -> VnResult<bool> {
        let checklist = self
            .checklist
            .as_mut()
            .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no session open"))?;
        if checklist.session() != session {
            return Err(vnerr!(
                ErrorKind::OutOfRange;
                "session {} is not open, open is {}",
                session,
                checklist.session()
            ));
        }
        checklist.toggle_folder(folder_name)
    }

    pub fn persist_checklist(&mut self) -> VnResult<StatLine> {
        let checklist = self
            .checklist
            .as_mut()
            .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no session open"))?;
        checklist.persist(&self.env, self.kv.as_mut())
    }

    fn toggle_marker(&mut self, start: bool) -> VnResult<FolderMarkers> {
        let image_path = self
            .doc
            .image_path()
            .ok_or_else(|| vnerr!("no image open"))?;
        let folder = file_util::parent_folder_name(Path::new(image_path))?;
        let path = self.env.markers(folder);
        let mut markers = FolderMarkers::load(&path)?;
        if start {
            markers.toggle_start(image_path);
        } else {
            markers.toggle_end(image_path);
        }
        markers.save(&path)?;
        Ok(markers)
    }

    /// Marks the open image as first relevant image of its folder or clears the mark.
    pub fn set_start(&mut self) -> VnResult<FolderMarkers> {
        self.toggle_marker(true)
    }

    pub fn set_end(&mut self) -> VnResult<FolderMarkers> {
        self.toggle_marker(false)
    }
}

#[cfg(test)]
use crate::{
    annotations::{annotation_path, AnnotationFormat},
    defer_folder_removal,
    test_helpers::{make_test_cfg, make_test_folder, write_test_image, ScriptedPrompt},
    tracing_setup::init_tracing_for_tests,
};

#[cfg(test)]
fn make_images(folder: &Path, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let p = folder.join("imgs").join(format!("{i}.png"));
            write_test_image(&p, 10, 20).unwrap();
            p.to_str().unwrap().to_string()
        })
        .collect()
}

#[cfg(test)]
fn a_box() -> Shape {
    Shape::new_box("car", PtF::new(1.0, 1.0), PtF::new(5.0, 7.0))
}

#[test]
fn test_open_dir_and_boundaries() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 3);
    let mut ctrl = Control::new(make_test_cfg(&folder)).unwrap();
    let mut prompt = ScriptedPrompt::new();
    assert_eq!(ctrl.open_prev(&mut prompt).unwrap(), Nav::NoOp);
    let nav = ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    assert_eq!(nav, Nav::Opened(images[0].clone()));
    assert_eq!(ctrl.doc().state(), DocState::Clean);
    assert_eq!(ctrl.doc().image_shape(), ImageShape::new(10, 20, 3));
    assert_eq!(ctrl.open_prev(&mut prompt).unwrap(), Nav::NoOp);
    assert_eq!(
        ctrl.open_next(&mut prompt).unwrap(),
        Nav::Opened(images[1].clone())
    );
    assert_eq!(
        ctrl.open_next(&mut prompt).unwrap(),
        Nav::Opened(images[2].clone())
    );
    assert_eq!(ctrl.open_next(&mut prompt).unwrap(), Nav::NoOp);
    assert_eq!(ctrl.doc().image_path(), Some(images[2].as_str()));
    assert_eq!(ctrl.cfg.recent_files[0], images[2]);
    assert!(ctrl.open_dir(folder.join("missing"), &mut prompt).is_err());
}

#[test]
fn test_dirty_gate() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 2);
    let mut ctrl = Control::new(make_test_cfg(&folder)).unwrap();
    let mut prompt = ScriptedPrompt::discarding(&[false, true]);
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.add_shape(a_box()).unwrap();
    assert_eq!(ctrl.doc().state(), DocState::Dirty);

    let nav = ctrl.open_next(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::DiscardDeclined));
    assert_eq!(ctrl.doc().image_path(), Some(images[0].as_str()));
    assert_eq!(ctrl.doc().table().len(), 1);
    assert!(ctrl.doc().is_dirty());

    let nav = ctrl.open_next(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Opened(images[1].clone()));
    assert!(ctrl.doc().table().is_empty());
    assert_eq!(ctrl.doc().state(), DocState::Clean);
    assert_eq!(prompt.n_discard_questions, 2);
    assert_eq!(ctrl.label_hist().labels(), ["car"]);
}

#[test]
fn test_declined_discard_keeps_document() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 2);
    write_test_image(&folder.join("other").join("x.png"), 4, 4).unwrap();
    let mut ctrl = Control::new(make_test_cfg(&folder)).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    let last_open_dir = ctrl.cfg.last_open_dir.clone();
    let id = ctrl.add_shape(a_box()).unwrap();
    let assert_unchanged = |ctrl: &Control| {
        assert_eq!(ctrl.doc().image_path(), Some(images[0].as_str()));
        assert_eq!(ctrl.doc().table().len(), 1);
        assert!(ctrl.doc().table().get(id).is_some());
        assert_eq!(ctrl.doc().state(), DocState::Dirty);
    };

    let nav = ctrl.open_dir(folder.join("other"), &mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::DiscardDeclined));
    assert_unchanged(&ctrl);
    assert_eq!(ctrl.cfg.last_open_dir, last_open_dir);
    assert_eq!(ctrl.navigator().len(), 2);

    let nav = ctrl.close_file(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::DiscardDeclined));
    assert_unchanged(&ctrl);

    let nav = ctrl.request_quit(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::DiscardDeclined));
    assert_unchanged(&ctrl);
    assert_eq!(prompt.n_discard_questions, 3);

    let mut prompt = ScriptedPrompt::discarding(&[true]);
    assert_eq!(ctrl.close_file(&mut prompt).unwrap(), Nav::Closed);
    assert_eq!(ctrl.doc().state(), DocState::NoImageOpen);
}

#[test]
fn test_draw_shape_colors_and_single_class() {
    use crate::domain::{color_from_label, DocColors, Rgba};
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    make_images(&folder, 1);
    let mut cfg = make_test_cfg(&folder);
    let colors = DocColors {
        line_color: Rgba::new(10, 20, 30, 40),
        fill_color: Rgba::new(50, 60, 70, 80),
    };
    cfg.set_doc_colors(colors);
    let mut ctrl = Control::new(cfg).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    let points = || vec![PtF::new(1.0, 1.0), PtF::new(3.0, 2.0)];

    // without single class mode the label must be asked for
    assert_eq!(ctrl.draw_shape_with_default_label(points()).unwrap(), None);
    let id = ctrl.draw_shape(" dog ", points()).unwrap();
    let entry = ctrl.doc().table().get(id).unwrap();
    assert_eq!(entry.shape.label, "dog");
    assert_eq!(entry.shape.line_color, colors.line_color);
    assert_eq!(entry.shape.fill_color, colors.fill_color);
    assert_eq!(ctrl.draw_shape_with_default_label(points()).unwrap(), None);
    assert_eq!(ctrl.doc().table().len(), 1);

    ctrl.set_single_class(true);
    assert!(ctrl.cfg.single_class);
    let id = ctrl
        .draw_shape_with_default_label(points())
        .unwrap()
        .unwrap();
    assert_eq!(ctrl.doc().table().get(id).unwrap().shape.label, "dog");
    ctrl.draw_shape("cat", points()).unwrap();
    let id = ctrl
        .draw_shape_with_default_label(points())
        .unwrap()
        .unwrap();
    assert_eq!(ctrl.doc().table().get(id).unwrap().shape.label, "cat");
    assert_eq!(ctrl.label_hist().labels(), ["dog", "cat"]);

    // relabeling recolors the outline only
    ctrl.doc_mut().set_label(id, "bird").unwrap();
    let shape = &ctrl.doc().table().get(id).unwrap().shape;
    assert_eq!(shape.line_color, color_from_label("bird"));
    assert_eq!(shape.fill_color, colors.fill_color);
}

#[test]
fn test_single_class_from_cfg() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    make_images(&folder, 1);
    let classes = folder.join("classes.txt");
    file_util::write_atomic(&classes, "tree\nhouse\n").unwrap();
    let mut cfg = make_test_cfg(&folder);
    cfg.single_class = true;
    cfg.predefined_classes_file = Some(classes.to_str().unwrap().to_string());
    let mut ctrl = Control::new(cfg).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    assert_eq!(ctrl.label_hist().labels(), ["tree", "house"]);
    // predefined classes are offered but the first label is still asked for
    assert_eq!(
        ctrl.draw_shape_with_default_label(vec![PtF::new(0.0, 0.0)]).unwrap(),
        None
    );
    ctrl.draw_shape("house", vec![PtF::new(0.0, 0.0)]).unwrap();
    assert!(ctrl
        .draw_shape_with_default_label(vec![PtF::new(1.0, 1.0)])
        .unwrap()
        .is_some());
    assert_eq!(ctrl.doc().table().len(), 2);
}

#[test]
fn test_save_and_reopen() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 2);
    let mut cfg = make_test_cfg(&folder);
    let save_dir = folder.join("annos");
    cfg.save_dir = Some(save_dir.to_str().unwrap().to_string());
    let mut ctrl = Control::new(cfg).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.add_shape(a_box()).unwrap();
    ctrl.doc_mut().set_verified(true).unwrap();
    let path = ctrl.save(&mut prompt).unwrap().unwrap();
    assert_eq!(
        path,
        annotation_path(&images[0], Some(save_dir.as_path()), AnnotationFormat::PascalVoc).unwrap()
    );
    assert_eq!(ctrl.doc().state(), DocState::Clean);
    ctrl.open_next(&mut prompt).unwrap();
    ctrl.open_prev(&mut prompt).unwrap();
    assert_eq!(ctrl.doc().table().len(), 1);
    assert!(ctrl.doc().verified());
    assert_eq!(prompt.n_discard_questions, 0);
}

#[test]
fn test_auto_save() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 2);
    let mut cfg = make_test_cfg(&folder);
    cfg.auto_save = true;
    let mut ctrl = Control::new(cfg).unwrap();
    let save_dir = folder.join("picked");
    let mut prompt = ScriptedPrompt {
        save_dir: Some(save_dir.clone()),
        ..Default::default()
    };
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.add_shape(a_box()).unwrap();
    let nav = ctrl.open_next(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Aborted(AbortReason::SaveDirMissing));
    assert_eq!(ctrl.doc().image_path(), Some(images[0].as_str()));
    assert_eq!(ctrl.active_save_dir(), Some(save_dir.clone()));

    let nav = ctrl.open_next(&mut prompt).unwrap();
    assert_eq!(nav, Nav::Opened(images[1].clone()));
    let saved = annotation_path(&images[0], Some(save_dir.as_path()), AnnotationFormat::PascalVoc).unwrap();
    assert!(saved.exists());
    assert_eq!(prompt.n_discard_questions, 0);
}

#[test]
fn test_invalid_annotation_and_fallback() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 3);
    let mut cfg = make_test_cfg(&folder);
    cfg.fallback_to_previous_annotation = true;
    let save_dir = folder.join("annos");
    cfg.save_dir = Some(save_dir.to_str().unwrap().to_string());
    let format = cfg.anno_format;
    file_util::write_atomic(
        annotation_path(&images[1], Some(save_dir.as_path()), format).unwrap(),
        "<annotation>",
    )
    .unwrap();
    let mut ctrl = Control::new(cfg).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.add_shape(a_box()).unwrap();
    ctrl.doc_mut().set_verified(true).unwrap();
    ctrl.save(&mut prompt).unwrap();

    // the broken file is reported and not shadowed by the previous image's annotation
    ctrl.open_next(&mut prompt).unwrap();
    assert_eq!(prompt.errors.len(), 1);
    assert_eq!(ctrl.doc().state(), DocState::Clean);
    assert!(ctrl.doc().table().is_empty());

    // the fallback hits the broken file of image 1 which is reported again
    ctrl.open_next(&mut prompt).unwrap();
    assert!(ctrl.doc().table().is_empty());
    assert_eq!(prompt.errors.len(), 2);

    ctrl.open_file(&images[0], &mut prompt).unwrap();
    let nav = ctrl.open_file(&images[2], &mut prompt).unwrap();
    assert_eq!(nav, Nav::Opened(images[2].clone()));
    assert_eq!(ctrl.doc().table().len(), 1);
    assert!(!ctrl.doc().verified());
}

#[test]
fn test_label_file_format() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 1);
    let mut cfg = make_test_cfg(&folder);
    cfg.anno_format = AnnotationFormat::LabelFile;
    let save_dir = folder.join("annos");
    cfg.save_dir = Some(save_dir.to_str().unwrap().to_string());
    let mut ctrl = Control::new(cfg).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.add_shape(a_box()).unwrap();
    let lif = ctrl.save(&mut prompt).unwrap().unwrap();
    assert!(annotations::is_label_file(&lif));
    ctrl.close_file(&mut prompt).unwrap();
    assert_eq!(ctrl.doc().state(), DocState::NoImageOpen);

    let nav = ctrl.open_file(lif.to_str().unwrap(), &mut prompt).unwrap();
    assert_eq!(nav, Nav::Opened(images[0].clone()));
    assert_eq!(ctrl.doc().table().len(), 1);
    assert_eq!(ctrl.doc().image_shape(), ImageShape::new(10, 20, 3));
}

#[test]
fn test_label_file_doc_colors() {
    use crate::domain::{DocColors, Rgba};
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    make_images(&folder, 1);
    let mut cfg = make_test_cfg(&folder);
    cfg.anno_format = AnnotationFormat::LabelFile;
    cfg.save_dir = Some(folder.join("annos").to_str().unwrap().to_string());
    let colors = DocColors {
        line_color: Rgba::new(1, 1, 1, 1),
        fill_color: Rgba::new(2, 2, 2, 2),
    };
    cfg.set_doc_colors(colors);
    let mut ctrl = Control::new(cfg.clone()).unwrap();
    let mut prompt = ScriptedPrompt::new();
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.draw_shape("car", vec![PtF::new(1.0, 1.0)]).unwrap();
    let lif = ctrl.save(&mut prompt).unwrap().unwrap();
    assert_eq!(annotations::load_label_file(&lif).unwrap().colors, Some(colors));

    cfg.set_doc_colors(DocColors::default());
    let mut ctrl = Control::new(cfg).unwrap();
    ctrl.open_file(lif.to_str().unwrap(), &mut prompt).unwrap();
    assert_eq!(ctrl.cfg.doc_colors(), colors);
}

#[test]
fn test_save_without_save_dir() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    make_images(&folder, 1);
    let mut ctrl = Control::new(make_test_cfg(&folder)).unwrap();
    let mut prompt = ScriptedPrompt::new();
    assert!(ctrl.save(&mut prompt).is_err());
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    ctrl.add_shape(a_box()).unwrap();
    assert_eq!(ctrl.save(&mut prompt).unwrap(), None);
    assert!(ctrl.doc().is_dirty());
    prompt.save_dir = Some(folder.join("picked"));
    let path = ctrl.save(&mut prompt).unwrap().unwrap();
    assert!(path.starts_with(folder.join("picked")));
    assert!(!ctrl.doc().is_dirty());
}

#[test]
fn test_markers() {
    init_tracing_for_tests();
    let folder = make_test_folder("ctrl");
    defer_folder_removal!(&folder);
    let images = make_images(&folder, 2);
    let mut ctrl = Control::new(make_test_cfg(&folder)).unwrap();
    let mut prompt = ScriptedPrompt::new();
    assert!(ctrl.set_start().is_err());
    ctrl.open_dir(folder.join("imgs"), &mut prompt).unwrap();
    let markers = ctrl.set_start().unwrap();
    assert_eq!(markers.start.as_deref(), Some(images[0].as_str()));
    ctrl.open_next(&mut prompt).unwrap();
    ctrl.set_end().unwrap();
    let markers = FolderMarkers::load(ctrl.env().markers("imgs")).unwrap();
    assert_eq!(markers.start.as_deref(), Some(images[0].as_str()));
    assert_eq!(markers.end.as_deref(), Some(images[1].as_str()));
    let markers = ctrl.set_end().unwrap();
    assert_eq!(markers.end, None);
}
