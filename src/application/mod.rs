// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - File output goes through the infra layer
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Run configuration and its option enums
pub mod config;

// Typed failures reported by the orchestrator
pub mod error;

// Seeded random number generators
pub mod seed;

// The train → eval → predict workflow
pub mod run_use_case;
