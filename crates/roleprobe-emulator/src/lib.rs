//! Firebase emulator backends for roleprobe.
//!
//! REST clients for the Auth emulator ([`EmulatorAuth`]) and the Firestore
//! emulator ([`EmulatorFirestore`]) implementing the `roleprobe-core`
//! backend traits. The emulators evaluate the security rules; these clients
//! only carry requests and map error responses.

mod auth;
mod firestore;
mod wire;

use std::sync::Arc;

use roleprobe_core::{Backends, ProbeSettings};

pub use auth::{EmulatorAuth, OWNER_TOKEN};
pub use firestore::EmulatorFirestore;

/// Builds the backends for a run against the emulators named in `settings`.
pub fn backends(settings: &ProbeSettings) -> Backends {
    let auth = Arc::new(EmulatorAuth::from_settings(settings));
    Backends {
        admin: auth.clone(),
        identity: auth,
        store: Arc::new(EmulatorFirestore::from_settings(settings)),
    }
}
