pub mod admission_gate;

pub use admission_gate::{AdmissionDecision, AdmissionGate, AdmissionPermit, AdmissionSnapshot};
