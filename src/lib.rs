// created = "2026-10-16"
// modified = "2026-10-16"

//! Concur - operational transformation for real-time collaborative editing.
//!
//! Every participating site runs one `OperationEngine`. Local edits are
//! stamped with the site's vector clock; remote edits are transformed
//! through whatever concurrent operations the site has already applied,
//! so that all replicas converge no matter the delivery order.
//!
//! # Quick Start
//!
//! ```
//! use concur::ot::{Edit, OperationEngine, Origin};
//! use concur::ot::primitives::{Order, VectorClock};
//! use serde_json::json;
//!
//! // Two sites start from the same empty list
//! let mut a = OperationEngine::new(0);
//! let mut b = OperationEngine::new(1);
//!
//! // Both insert at position 0 concurrently
//! let ins = |v: &str| Edit::Insert { key: "list".into(), value: json!(v), position: 0 };
//! let from_a = a.push(ins("a"), Origin::Local).unwrap().unwrap();
//! let from_b = b.push(ins("b"), Origin::Local).unwrap().unwrap();
//!
//! // The server ranked a's insert first
//! let at_b = b
//!     .push(ins("a"), Origin::Remote { site: 0, clock: from_a.clock().clone(), order: Order::new(1) })
//!     .unwrap()
//!     .unwrap();
//! let at_a = a
//!     .push(ins("b"), Origin::Remote { site: 1, clock: from_b.clock().clone(), order: Order::new(2) })
//!     .unwrap()
//!     .unwrap();
//!
//! // Both replicas end up as ["b", "a"]
//! assert_eq!(at_b.position(), 1);
//! assert_eq!(at_a.position(), 0);
//! assert_eq!(a.clock(), &VectorClock::from_sites(vec![1, 1]));
//! ```
//!
//! For a site wired to a transport, see `session::Session`.

pub mod config;
pub mod error;
pub mod message;
pub mod ot;
pub mod session;

pub use config::SessionConfig;
pub use error::EngineError;
pub use session::Session;
pub use session::SharedSession;

pub type Result<T> = std::result::Result<T, EngineError>;
