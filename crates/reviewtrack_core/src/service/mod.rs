//! Core use-case services.
//!
//! # Responsibility
//! - Compose repositories and external stores into lifecycle operations.
//! - Keep callers (HTTP layers, CLI) decoupled from storage details.

pub mod code_allocator;
pub mod context;
pub mod phase_engine;
pub mod phase_template;
pub mod project_lifecycle;
pub mod role_provisioner;
