//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements   | Connects to                        |
//! |------------------|--------------|------------------------------------|
//! | `command_camera` | CameraPort   | Capture command writing a PPM      |
//! | `config_file`    | ConfigPort   | JSON config document               |
//! | `json_lines`     | (inbound)    | Readings and commands on a stream  |
//! | `log_sink`       | EventSink    | `log` facade                       |
//! | `memory`         | StoragePort  | In-process vectors (tests, dry run)|
//! | `notifier`       | NotifierPort | Operator console, retry wrapper    |
//! | `record_log`     | StoragePort  | Append-only postcard log + photos  |
//! | `time`           | Clock        | Host wall clock                    |

pub mod command_camera;
pub mod config_file;
pub mod json_lines;
pub mod log_sink;
pub mod memory;
pub mod notifier;
pub mod record_log;
pub mod time;
