//! The view controller: owns the render cycle and brokers every exchange
//! between the document host and the rendering surface.

use std::time::Duration;

use braid_delta::{Content, Delta};
use tracing::{debug, warn};
use web_time::Instant;

use crate::decorations::Decorations;
use crate::events::{ControllerEvent, EventBus, SubscriptionId};
use crate::host::DocumentHost;
use crate::reconcile::{reconcile, ReconcileContext, Reconciled};
use crate::schema::{Permissive, Schema};
use crate::selection;
use crate::surface::Surface;
use crate::types::{Origin, Selection, UpdateInfo};

/// How long a selection push in one direction suppresses the echo
/// notification coming back from the other side, in milliseconds.
///
/// The surface reports selection changes asynchronously, so the echo of a
/// push arrives a tick later; within this window it is swallowed. A
/// genuine user selection change inside the window is swallowed too, once.
/// That race is inherent to the debounce and kept deliberately short.
pub const SELECTION_ECHO_WINDOW_MS: u64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerOptions {
    /// After each update, recompute what the surface should show and log a
    /// warning if it drifted. Development aid, off by default.
    pub check_consistency: bool,
    pub selection_echo_window_ms: u64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            check_consistency: false,
            selection_echo_window_ms: SELECTION_ECHO_WINDOW_MS,
        }
    }
}

/// Orchestrates one editing surface against one document host.
///
/// Owns both collaborators, the per-cycle decoration state, and the
/// re-entrancy flags that keep model-to-view and view-to-model updates
/// from feeding back into each other. Single-threaded by design; every
/// entry point runs to completion before the next notification arrives.
///
/// The embedding wires notifications in: host change and selection events
/// go to [`document_changed`] and [`document_selection_changed`], surface
/// observation and selection callbacks go to [`surface_mutations`] and
/// [`surface_selection_changed`].
///
/// [`document_changed`]: ViewController::document_changed
/// [`document_selection_changed`]: ViewController::document_selection_changed
/// [`surface_mutations`]: ViewController::surface_mutations
/// [`surface_selection_changed`]: ViewController::surface_selection_changed
pub struct ViewController<S, H, P = Permissive> {
    surface: S,
    host: H,
    schema: P,
    options: ControllerOptions,
    decorations: Decorations,
    /// Canonical content as of the last render; what reconciliation diffs
    /// against.
    canonical: Content,
    events: EventBus<ControllerEvent>,
    started: bool,
    enabled: bool,
    force_full: bool,
    suppress_surface_echo: Option<Instant>,
    suppress_host_echo: Option<Instant>,
}

impl<S: Surface, H: DocumentHost> ViewController<S, H> {
    pub fn new(surface: S, host: H) -> Self {
        Self::with_schema(surface, host, Permissive)
    }
}

impl<S: Surface, H: DocumentHost, P: Schema> ViewController<S, H, P> {
    pub fn with_schema(surface: S, host: H, schema: P) -> Self {
        let canonical = host.content();
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        Self {
            surface,
            host,
            schema,
            options: ControllerOptions::default(),
            decorations,
            canonical,
            events: EventBus::new(),
            started: false,
            enabled: true,
            force_full: false,
            suppress_surface_echo: None,
            suppress_host_echo: None,
        }
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    // === Lifecycle ===

    /// Render the document and begin observing the surface. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.update();
    }

    /// Stop observing the surface. Idempotent; rendered content stays.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.surface.stop_observing();
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Mark the surface editable or read-only without touching content.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if self.started {
            self.update();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // === The update cycle ===

    /// Run one full update: fetch canonical content, recompute decorations,
    /// render with observation suspended, push the logical selection out,
    /// announce.
    pub fn update(&mut self) {
        let canonical = self.host.content();
        self.decorations = Decorations::compute(&self.host, &canonical);
        self.canonical = canonical;

        // Self-authored writes must never reach reconciliation.
        self.surface.stop_observing();
        self.surface.render(self.decorations.composed(), self.enabled);
        if self.started {
            self.surface.start_observing();
        }

        self.push_selection_to_surface();

        let info = UpdateInfo {
            content_len: self.canonical.len(),
            decorated: !self.decorations.is_identity(),
        };
        debug!(
            target: "braid::controller",
            content_len = info.content_len,
            decorated = info.decorated,
            "surface updated"
        );
        self.events.emit(&ControllerEvent::Updated(info));

        if self.options.check_consistency {
            self.check_consistency();
        }
    }

    // === Host-side notifications (wired by the embedding) ===

    /// Canonical content changed under the controller.
    pub fn document_changed(&mut self) {
        if !self.started {
            return;
        }
        self.update();
    }

    /// The logical selection changed under the controller.
    pub fn document_selection_changed(&mut self) {
        if !self.started {
            return;
        }
        if Self::consume_suppression(
            &mut self.suppress_host_echo,
            self.options.selection_echo_window_ms,
        ) {
            return;
        }
        self.push_selection_to_surface();
    }

    // === Surface-side notifications (wired by the embedding) ===

    /// A batch of surface mutations is ready.
    ///
    /// This is the observation-callback boundary: reconciliation failures
    /// are absorbed here, logged, and answered with a forced full diff on
    /// the next batch. Letting them escape would tear down the observer
    /// and silently eat every later notification.
    pub fn surface_mutations(&mut self) {
        if !self.started {
            return;
        }
        let batch = self.surface.take_mutations();
        if batch.is_empty() && !self.force_full {
            return;
        }

        let prior_selection = self.host.selection();
        let result = {
            let active = self.host.active_attributes();
            let ctx = ReconcileContext {
                surface: &self.surface,
                decorations: &self.decorations,
                canonical: &self.canonical,
                active_attributes: active.as_ref(),
                force_full: self.force_full,
            };
            reconcile(batch, &ctx)
        };

        match result {
            Ok(Reconciled::Clean) => {
                self.force_full = false;
                self.pull_selection_from_surface();
            }
            Ok(Reconciled::Change(change)) => {
                self.force_full = false;
                self.submit_user_change(change, prior_selection);
            }
            Err(error) => {
                warn!(
                    target: "braid::reconcile",
                    %error,
                    "reconciliation failed; next batch takes the full path"
                );
                self.force_full = true;
            }
        }
    }

    /// The surface's selection changed.
    pub fn surface_selection_changed(&mut self) {
        if !self.started {
            return;
        }
        if Self::consume_suppression(
            &mut self.suppress_surface_echo,
            self.options.selection_echo_window_ms,
        ) {
            return;
        }
        self.pull_selection_from_surface();
    }

    // === Events ===

    pub fn on_event(&mut self, handler: impl Fn(&ControllerEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // === Diagnostics ===

    /// Compare what the surface actually holds against the expected
    /// canonical-plus-decorations composition. Returns the drift, if any.
    /// Reported, never thrown; renderer infidelity is a bug to surface in
    /// development, not an error to recover from here.
    pub fn check_consistency(&self) -> Option<Delta> {
        let observed = self.surface.read_content();
        let drift = self.decorations.composed().diff(&observed);
        if drift.is_empty() {
            None
        } else {
            warn!(
                target: "braid::controller",
                ops = drift.ops().len(),
                "surface content drifted from the expected composition"
            );
            Some(drift)
        }
    }

    // === Accessors ===

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The current cycle's decoration state.
    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    // === Internals ===

    fn push_selection_to_surface(&mut self) {
        let Some(logical) = self.host.selection() else {
            return;
        };
        let mapped = selection::to_surface(logical, &self.decorations);
        if self.surface.selection() == Some(mapped) {
            return;
        }
        self.suppress_surface_echo = Some(Instant::now());
        self.surface.set_selection(Some(mapped));
    }

    fn pull_selection_from_surface(&mut self) {
        let Some(shown) = self.surface.selection() else {
            return;
        };
        let logical = selection::to_logical(shown, &self.decorations);
        if self.host.selection() == Some(logical) {
            return;
        }
        self.suppress_host_echo = Some(Instant::now());
        self.host.set_selection(Some(logical), Origin::User);
    }

    fn submit_user_change(&mut self, change: Delta, prior_selection: Option<Selection>) {
        if !self.schema.validate(&change) {
            warn!(
                target: "braid::controller",
                ops = change.ops().len(),
                "change rejected by schema; re-rendering canonical content"
            );
            self.events.emit(&ControllerEvent::ChangeRejected { change });
            self.update();
            return;
        }
        debug!(
            target: "braid::controller",
            ops = change.ops().len(),
            "submitting user change"
        );
        self.host.submit(change, Origin::User, prior_selection);
    }

    /// One-shot: the flag clears on first inspection. The window keeps a
    /// flag armed long ago from eating a genuine change.
    fn consume_suppression(flag: &mut Option<Instant>, window_ms: u64) -> bool {
        match flag.take() {
            Some(armed_at) => armed_at.elapsed() <= Duration::from_millis(window_ms),
            None => false,
        }
    }
}
