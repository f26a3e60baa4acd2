//! Public types for the threads API
use serde::{Deserialize, Serialize};

use crate::threads::ThreadState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub thread_key: String,
    #[serde(flatten)]
    pub state: ThreadState,
}
