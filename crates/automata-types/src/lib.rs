//! Shared type definitions for the 3D cellular automaton service.
//!
//! This crate is the single source of truth for the types exchanged
//! between the engine, the service layer, and remote clients. Types
//! defined here flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for session identifiers
//! - [`enums`] -- Boundary modes, neighborhoods, session status, stream formats, error kinds
//! - [`structs`] -- Cell states, dimensions, session metadata, export document
//! - [`rules`] -- Rule specification shapes
//! - [`messages`] -- Request, response, and stream message shapes

pub mod enums;
pub mod ids;
pub mod messages;
pub mod rules;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BoundaryMode, DefaultTransition, ErrorKind, Neighborhood, SessionStatus, StreamFormat,
};
pub use ids::SessionId;
pub use messages::{
    Ack, CloseRequest, CreateRequest, InitialStateSource, SessionCreated, StateDiff, StateSnapshot,
    StepRequest, StepResponse, StreamUpdate,
};
pub use rules::{RuleSpecification, TransitionEntry};
pub use structs::{
    CellAssignment, CellState, ChangedCell, Dimensions, EXPORT_FORMAT_VERSION, ExportPayload,
    LatticeExport, MAX_STATES, SessionInfo, SessionStats,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings for every #[ts(export)] type into the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::SessionId::export_all();

        // Enums
        let _ = crate::enums::BoundaryMode::export_all();
        let _ = crate::enums::Neighborhood::export_all();
        let _ = crate::enums::DefaultTransition::export_all();
        let _ = crate::enums::SessionStatus::export_all();
        let _ = crate::enums::ErrorKind::export_all();
        let _ = crate::enums::StreamFormat::export_all();

        // Structs
        let _ = crate::structs::CellState::export_all();
        let _ = crate::structs::Dimensions::export_all();
        let _ = crate::structs::CellAssignment::export_all();
        let _ = crate::structs::ChangedCell::export_all();
        let _ = crate::structs::SessionInfo::export_all();
        let _ = crate::structs::SessionStats::export_all();
        let _ = crate::structs::ExportPayload::export_all();
        let _ = crate::structs::LatticeExport::export_all();

        // Rules
        let _ = crate::rules::TransitionEntry::export_all();
        let _ = crate::rules::RuleSpecification::export_all();

        // Messages
        let _ = crate::messages::InitialStateSource::export_all();
        let _ = crate::messages::CreateRequest::export_all();
        let _ = crate::messages::StepRequest::export_all();
        let _ = crate::messages::CloseRequest::export_all();
        let _ = crate::messages::SessionCreated::export_all();
        let _ = crate::messages::StepResponse::export_all();
        let _ = crate::messages::StateSnapshot::export_all();
        let _ = crate::messages::StateDiff::export_all();
        let _ = crate::messages::Ack::export_all();
        let _ = crate::messages::StreamUpdate::export_all();
    }
}
