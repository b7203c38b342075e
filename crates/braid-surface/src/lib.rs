//! braid-surface: Keeps a delta document and a live editing surface
//! synchronized, both ways.
//!
//! This crate provides:
//! - `ViewController` - the render cycle, observation gating, echo control
//! - `Decorations` - ephemeral formatting overlay plus its reverse map
//! - `reconcile` - observed surface mutations back into canonical deltas
//! - `Surface` / `DocumentHost` / `Schema` - the collaborator seams
//! - `MemorySurface` / `PlainHost` - in-memory implementations for tests

pub mod controller;
pub mod decorations;
pub mod error;
pub mod events;
pub mod host;
pub mod plain;
pub mod reconcile;
pub mod schema;
pub mod selection;
pub mod surface;
pub mod types;

pub use braid_delta::{Affinity, Attributes, Content, Delta, Embed, Op};
pub use controller::{ControllerOptions, ViewController, SELECTION_ECHO_WINDOW_MS};
pub use decorations::Decorations;
pub use error::ReconcileError;
pub use events::{ControllerEvent, EventBus, SubscriptionId};
pub use host::{Decorate, DocumentHost};
pub use plain::{MemorySurface, PlainHost, Submission};
pub use reconcile::{reconcile, Reconciled, ReconcileContext};
pub use schema::{Permissive, Schema};
pub use surface::{MutationKind, NodeId, Surface, SurfaceMutation};
pub use types::{Origin, Selection, UpdateInfo};
