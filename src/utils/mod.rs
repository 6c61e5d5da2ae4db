//! Utility functions shared by the pipeline and the section collectors.
//!
//! ## Components
//!
//! - **Files**: lossy reads of tool output and cleanup of intermediates
//! - **Hashing**: SHA-256 of the finished report
//! - **Summary**: machine-readable run summary
//!
//! ## Common Use Cases
//!
//! ### Hashing a Finished Report
//!
//! ```no_run
//! use triage_report::utils::hash::sha256_file;
//! use std::path::Path;
//!
//! # fn example() -> std::io::Result<()> {
//! let report = Path::new("/cases/HOST1/TriageReport/HOST1.htm");
//! if let Some(digest) = sha256_file(report)? {
//!     println!("SHA-256: {}", digest);
//! }
//! # Ok(())
//! # }
//! ```

/// Reading tool output and removing intermediate files
pub mod files;

/// Cryptographic hash calculation utilities
pub mod hash;

/// Run summary generation
pub mod summary;
