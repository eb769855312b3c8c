//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                   |
//! |---------------|--------------|-------------------------------|
//! | `config_file` | ConfigPort   | JSON file on disk             |
//! | `json_api`    | (transport)  | JSON request / response body  |
//! | `log_sink`    | EventSink    | `log` facade                  |
//! | `time`        | Clock        | host local time, manual clock |

pub mod config_file;
pub mod json_api;
pub mod log_sink;
pub mod time;
