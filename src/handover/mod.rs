//! Charge handover approval workflow
//!
//! A handover passes a department-head stage and then a receiver stage.
//! `workflow` decides transitions, `visibility` decides who sees what, and
//! `service` ties both to the store and the employee directory.

pub mod service;
pub mod visibility;
pub mod workflow;

pub use service::{HandoverEvent, HandoverService};
pub use visibility::{HandoverView, ReceivedHandover};
pub use workflow::{ReceiverMatch, Stage, Transition, WorkflowError};
