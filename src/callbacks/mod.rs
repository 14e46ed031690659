//! Callback handlers for the inspection window.
//!
//! Organized by functionality:
//! - `view` - pushing session state into the window properties
//! - `viewport` - pointer routing, zoom and pan
//! - `editing` - edit mode, contour creation, delete/restore, confirm/cancel
//! - `inspection` - loading images and annotations, re-analysis, uploads
//! - `settings` - confidence settings and exports
//!
//! All UI state lives on the UI thread behind `Rc<RefCell<..>>`. Network work
//! runs on the tokio runtime and hands its result back through [`spawn_task`].

pub mod editing;
pub mod inspection;
pub mod settings;
pub mod view;
pub mod viewport;

use crate::AppWindow;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use thermal_inspector::cache::FileCache;
use thermal_inspector::config::AppConfig;
use thermal_inspector::gateway::ApiClient;
use thermal_inspector::repository::AnnotationRepository;
use thermal_inspector::state::{InspectionSession, TaskSlot};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type Repo = AnnotationRepository<ApiClient, FileCache>;

pub type SharedSession = Rc<RefCell<InspectionSession>>;

/// Background work owned by the window. Replacing a slot aborts the task
/// it held.
#[derive(Debug, Default)]
pub struct Tasks {
    pub metadata: TaskSlot,
    pub baseline: TaskSlot,
    pub current: TaskSlot,
    pub annotations: TaskSlot,
    pub analysis: TaskSlot,
    pub upload: TaskSlot,
    pub export: TaskSlot,
}

/// What every callback needs besides the window and the session.
pub struct AppContext {
    pub runtime: Handle,
    pub repo: Arc<Repo>,
    pub config: RefCell<AppConfig>,
    pub tasks: RefCell<Tasks>,
    /// Repeating timers that live as long as the window.
    pub timers: RefCell<Vec<slint::Timer>>,
}

impl AppContext {
    pub fn new(runtime: Handle, repo: Repo, config: AppConfig) -> Self {
        Self {
            runtime,
            repo: Arc::new(repo),
            config: RefCell::new(config),
            tasks: RefCell::new(Tasks::default()),
            timers: RefCell::new(Vec::new()),
        }
    }

    pub fn api(&self) -> ApiClient {
        self.repo.gateway().clone()
    }

    pub fn user(&self) -> String {
        self.repo.user().to_string()
    }
}

/// Run `fut` on the tokio runtime and `then` with its output on the UI
/// thread. Aborting the returned handle drops the result unseen.
pub fn spawn_task<T, F, R>(runtime: &Handle, fut: F, then: R) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
    R: FnOnce(T) + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = runtime.spawn(async move {
        let _ = tx.send(fut.await);
    });
    let continuation = slint::spawn_local(async move {
        if let Ok(value) = rx.await {
            then(value);
        }
    });
    if let Err(e) = continuation {
        log::error!("could not schedule UI continuation: {e}");
        handle.abort();
    }
    handle
}

/// Sets up every callback of the window.
pub fn setup_callbacks(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    view::setup_view(ui, session.clone());
    ctx.timers.borrow_mut().push(view::watch_pane_size(ui, session.clone()));
    viewport::setup_viewport_callbacks(ui, ctx.clone(), session.clone());
    editing::setup_editing_callbacks(ui, ctx.clone(), session.clone());
    inspection::setup_inspection_callbacks(ui, ctx.clone(), session.clone());
    settings::setup_settings_callbacks(ui, ctx, session);
}
