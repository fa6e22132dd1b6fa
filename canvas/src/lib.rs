//! Document model and interaction engine for the floating note overlay.
//!
//! The crate holds everything the overlay does that is not platform glue:
//! the notebook of notes, stroke grouping into objects, shape synthesis,
//! hit-testing, selection, undo history, the view transform, clipboard
//! semantics, and the persisted JSON format. The shell (window, tray,
//! clipboard access, file dialogs) feeds input events to
//! [`engine::EngineCore`] and carries out the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Interaction state machine: [`engine::EngineCore`] and [`engine::Action`] |
//! | [`doc`] | Notes, strokes, text, images, attachments |
//! | [`notes`] | The ordered notebook and note switching |
//! | [`camera`] | View transform and coordinate conversions |
//! | [`geometry`] | Bounding boxes, containment, shape vertex synthesis |
//! | [`hit`] | Hit-testing strokes and overlay items |
//! | [`input`] | Tools, modifiers, selection, and gesture state |
//! | [`ids`] | Id minting and the stroke grouping window |
//! | [`history`] | Per-note snapshot undo/redo |
//! | [`clipboard`] | Internal clipboard entries and system clipboard content |
//! | [`persist`] | Stored payload encoding, legacy migration, settings |
//! | [`render`] | Display list for the shell to paint |
//! | [`consts`] | Shared constants (zoom limits, hit radii, minimum sizes) |

pub mod camera;
pub mod clipboard;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod hit;
pub mod history;
pub mod ids;
pub mod input;
pub mod notes;
pub mod persist;
pub mod render;
